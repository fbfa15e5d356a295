//! Transcendental and power functions over `float` (§4.4).

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::Value;
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let float = arena.float();

    registry.register(OpEntry::native("sqrt", vec![Some(float)], Some(float), sqrt));
    registry.register(OpEntry::native("sin", vec![Some(float)], Some(float), sin));
    registry.register(OpEntry::native("cos", vec![Some(float)], Some(float), cos));
    registry.register(OpEntry::native("atan", vec![Some(float)], Some(float), atan));
    registry.register(OpEntry::native("atan2", vec![Some(float), Some(float)], Some(float), atan2));
    registry.register(OpEntry::native("power", vec![Some(float), Some(float)], Some(float), power));
    registry.register(OpEntry::native("exp", vec![Some(float)], Some(float), exp));
    registry.register(OpEntry::native("ln", vec![Some(float)], Some(float), ln));
    registry.register(OpEntry::native("log", vec![Some(float), Some(float)], Some(float), log));
    registry.register(OpEntry::native("abs", vec![Some(float)], Some(float), abs));
}

fn checked(f: f64, what: &str) -> Result<Value> {
    if !f.is_finite() {
        return Err(Error::type_constraint_violation(format!("{} produced a non-finite result", what)));
    }
    Ok(Value::from_float(f))
}

fn sqrt(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    checked(args[0].as_float()?.sqrt(), "sqrt")
}

fn sin(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_float()?.sin()))
}

fn cos(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_float()?.cos()))
}

fn atan(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_float()?.atan()))
}

fn atan2(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_float()?.atan2(args[1].as_float()?)))
}

fn power(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    checked(args[0].as_float()?.powf(args[1].as_float()?), "power")
}

fn exp(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    checked(args[0].as_float()?.exp(), "exp")
}

fn ln(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    checked(args[0].as_float()?.ln(), "ln")
}

fn log(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    checked(args[0].as_float()?.log(args[1].as_float()?), "log")
}

fn abs(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_float()?.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_of_negative_is_rejected() {
        let mut ctx = ExecutionContext::new();
        assert!(sqrt(&[Value::from_float(-1.0)], &mut ctx).is_err());
    }

    #[test]
    fn sqrt_of_perfect_square() {
        let mut ctx = ExecutionContext::new();
        let v = sqrt(&[Value::from_float(9.0)], &mut ctx).unwrap();
        assert_eq!(v.as_float().unwrap(), 3.0);
    }

    #[test]
    fn ln_of_negative_is_rejected() {
        let mut ctx = ExecutionContext::new();
        let err = ln(&[Value::from_float(-1.0)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TypeConstraintViolation(_)));
    }

    #[test]
    fn ln_of_zero_is_rejected_as_non_finite() {
        let mut ctx = ExecutionContext::new();
        let err = ln(&[Value::from_float(0.0)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TypeConstraintViolation(_)));
    }

    #[test]
    fn exp_overflow_is_rejected() {
        let mut ctx = ExecutionContext::new();
        let err = exp(&[Value::from_float(f64::MAX)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TypeConstraintViolation(_)));
    }
}
