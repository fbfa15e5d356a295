//! Logical operators over `boolean` (§4.4).

use crate::context::ExecutionContext;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::Value;
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let boolean = arena.boolean();
    registry.register(OpEntry::native("and", vec![Some(boolean), Some(boolean)], Some(boolean), and));
    registry.register(OpEntry::native("or", vec![Some(boolean), Some(boolean)], Some(boolean), or));
    registry.register(OpEntry::native("xor", vec![Some(boolean), Some(boolean)], Some(boolean), xor));
    registry.register(OpEntry::native("not", vec![Some(boolean)], Some(boolean), not));
}

fn and(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_bool()? && args[1].as_bool()?))
}

fn or(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_bool()? || args[1].as_bool()?))
}

fn xor(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_bool()? != args[1].as_bool()?))
}

fn not(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(!args[0].as_bool()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_is_conjunction() {
        let mut ctx = ExecutionContext::new();
        assert!(!and(&[Value::from_bool(true), Value::from_bool(false)], &mut ctx).unwrap().as_bool().unwrap());
        assert!(and(&[Value::from_bool(true), Value::from_bool(true)], &mut ctx).unwrap().as_bool().unwrap());
    }

    #[test]
    fn not_negates() {
        let mut ctx = ExecutionContext::new();
        assert!(not(&[Value::from_bool(false)], &mut ctx).unwrap().as_bool().unwrap());
    }
}
