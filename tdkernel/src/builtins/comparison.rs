//! Comparison operators (§4.4). Ordering operators are defined for
//! `integer`, `float`, `string`, and `datetime`; `boolean` only supports
//! equality (Tutorial D gives booleans no ordering).

use crate::context::ExecutionContext;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::Value;
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let boolean = arena.boolean();
    let int = arena.integer();
    let float = arena.float();
    let string = arena.string();
    let datetime = arena.datetime();

    registry.register(OpEntry::native("=", vec![Some(boolean), Some(boolean)], Some(boolean), bool_eq));
    registry.register(OpEntry::native("<>", vec![Some(boolean), Some(boolean)], Some(boolean), bool_ne));

    registry.register(OpEntry::native("=", vec![Some(int), Some(int)], Some(boolean), int_eq));
    registry.register(OpEntry::native("<>", vec![Some(int), Some(int)], Some(boolean), int_ne));
    registry.register(OpEntry::native("<", vec![Some(int), Some(int)], Some(boolean), int_lt));
    registry.register(OpEntry::native("<=", vec![Some(int), Some(int)], Some(boolean), int_le));
    registry.register(OpEntry::native(">", vec![Some(int), Some(int)], Some(boolean), int_gt));
    registry.register(OpEntry::native(">=", vec![Some(int), Some(int)], Some(boolean), int_ge));

    registry.register(OpEntry::native("=", vec![Some(float), Some(float)], Some(boolean), float_eq));
    registry.register(OpEntry::native("<>", vec![Some(float), Some(float)], Some(boolean), float_ne));
    registry.register(OpEntry::native("<", vec![Some(float), Some(float)], Some(boolean), float_lt));
    registry.register(OpEntry::native("<=", vec![Some(float), Some(float)], Some(boolean), float_le));
    registry.register(OpEntry::native(">", vec![Some(float), Some(float)], Some(boolean), float_gt));
    registry.register(OpEntry::native(">=", vec![Some(float), Some(float)], Some(boolean), float_ge));

    registry.register(OpEntry::native("=", vec![Some(string), Some(string)], Some(boolean), str_eq));
    registry.register(OpEntry::native("<>", vec![Some(string), Some(string)], Some(boolean), str_ne));
    registry.register(OpEntry::native("<", vec![Some(string), Some(string)], Some(boolean), str_lt));
    registry.register(OpEntry::native("<=", vec![Some(string), Some(string)], Some(boolean), str_le));
    registry.register(OpEntry::native(">", vec![Some(string), Some(string)], Some(boolean), str_gt));
    registry.register(OpEntry::native(">=", vec![Some(string), Some(string)], Some(boolean), str_ge));

    registry.register(OpEntry::native("=", vec![Some(datetime), Some(datetime)], Some(boolean), dt_eq));
    registry.register(OpEntry::native("<>", vec![Some(datetime), Some(datetime)], Some(boolean), dt_ne));
    registry.register(OpEntry::native("<", vec![Some(datetime), Some(datetime)], Some(boolean), dt_lt));
    registry.register(OpEntry::native("<=", vec![Some(datetime), Some(datetime)], Some(boolean), dt_le));
    registry.register(OpEntry::native(">", vec![Some(datetime), Some(datetime)], Some(boolean), dt_gt));
    registry.register(OpEntry::native(">=", vec![Some(datetime), Some(datetime)], Some(boolean), dt_ge));
}

fn bool_eq(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_bool()? == args[1].as_bool()?))
}
fn bool_ne(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_bool()? != args[1].as_bool()?))
}

fn int_eq(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_int()? == args[1].as_int()?))
}
fn int_ne(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_int()? != args[1].as_int()?))
}
fn int_lt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_int()? < args[1].as_int()?))
}
fn int_le(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_int()? <= args[1].as_int()?))
}
fn int_gt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_int()? > args[1].as_int()?))
}
fn int_ge(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_int()? >= args[1].as_int()?))
}

fn float_eq(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_float()? == args[1].as_float()?))
}
fn float_ne(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_float()? != args[1].as_float()?))
}
fn float_lt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_float()? < args[1].as_float()?))
}
fn float_le(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_float()? <= args[1].as_float()?))
}
fn float_gt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_float()? > args[1].as_float()?))
}
fn float_ge(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_float()? >= args[1].as_float()?))
}

fn str_eq(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()? == args[1].as_str()?))
}
fn str_ne(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()? != args[1].as_str()?))
}
fn str_lt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()? < args[1].as_str()?))
}
fn str_le(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()? <= args[1].as_str()?))
}
fn str_gt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()? > args[1].as_str()?))
}
fn str_ge(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()? >= args[1].as_str()?))
}

fn dt_eq(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_datetime()? == args[1].as_datetime()?))
}
fn dt_ne(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_datetime()? != args[1].as_datetime()?))
}
fn dt_lt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_datetime()? < args[1].as_datetime()?))
}
fn dt_le(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_datetime()? <= args[1].as_datetime()?))
}
fn dt_gt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_datetime()? > args[1].as_datetime()?))
}
fn dt_ge(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_datetime()? >= args[1].as_datetime()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_compare_by_value() {
        let mut ctx = ExecutionContext::new();
        assert!(int_lt(&[Value::from_int(1), Value::from_int(2)], &mut ctx).unwrap().as_bool().unwrap());
        assert!(!int_lt(&[Value::from_int(2), Value::from_int(2)], &mut ctx).unwrap().as_bool().unwrap());
        assert!(int_ge(&[Value::from_int(2), Value::from_int(2)], &mut ctx).unwrap().as_bool().unwrap());
    }

    #[test]
    fn strings_compare_lexicographically() {
        let mut ctx = ExecutionContext::new();
        let v = str_lt(&[Value::from_string("abc"), Value::from_string("abd")], &mut ctx).unwrap();
        assert!(v.as_bool().unwrap());
    }

    #[test]
    fn boolean_equality_has_no_ordering_overload() {
        let mut ctx = ExecutionContext::new();
        let v = bool_eq(&[Value::from_bool(true), Value::from_bool(true)], &mut ctx).unwrap();
        assert!(v.as_bool().unwrap());
    }
}
