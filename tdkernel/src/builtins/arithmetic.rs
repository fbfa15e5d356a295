//! Arithmetic operators over `integer` and `float` (§4.4).

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::Value;
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let int = arena.integer();
    let float = arena.float();

    registry.register(OpEntry::native("+", vec![Some(int), Some(int)], Some(int), int_add));
    registry.register(OpEntry::native("-", vec![Some(int), Some(int)], Some(int), int_sub));
    registry.register(OpEntry::native("*", vec![Some(int), Some(int)], Some(int), int_mul));
    registry.register(OpEntry::native("/", vec![Some(int), Some(int)], Some(int), int_div));
    registry.register(OpEntry::native("-", vec![Some(int)], Some(int), int_neg));

    registry.register(OpEntry::native("+", vec![Some(float), Some(float)], Some(float), float_add));
    registry.register(OpEntry::native("-", vec![Some(float), Some(float)], Some(float), float_sub));
    registry.register(OpEntry::native("*", vec![Some(float), Some(float)], Some(float), float_mul));
    registry.register(OpEntry::native("/", vec![Some(float), Some(float)], Some(float), float_div));
    registry.register(OpEntry::native("-", vec![Some(float)], Some(float), float_neg));
}

fn overflow(op: &str, a: i64, b: i64) -> Error {
    Error::type_constraint_violation(format!("integer overflow computing {} {} {}", a, op, b))
}

fn non_finite(op: &str, result: f64) -> Error {
    Error::type_constraint_violation(format!("{} produced a non-finite result: {}", op, result))
}

fn int_add(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let (a, b) = (args[0].as_int()?, args[1].as_int()?);
    a.checked_add(b).map(Value::from_int).ok_or_else(|| overflow("+", a, b))
}

fn int_sub(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let (a, b) = (args[0].as_int()?, args[1].as_int()?);
    a.checked_sub(b).map(Value::from_int).ok_or_else(|| overflow("-", a, b))
}

fn int_mul(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let (a, b) = (args[0].as_int()?, args[1].as_int()?);
    a.checked_mul(b).map(Value::from_int).ok_or_else(|| overflow("*", a, b))
}

fn int_div(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let (a, b) = (args[0].as_int()?, args[1].as_int()?);
    if b == 0 {
        return Err(Error::invalid_argument("division by zero"));
    }
    a.checked_div(b).map(Value::from_int).ok_or_else(|| overflow("/", a, b))
}

fn int_neg(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let a = args[0].as_int()?;
    a.checked_neg().map(Value::from_int).ok_or_else(|| overflow("-", a, 0))
}

fn float_add(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let r = args[0].as_float()? + args[1].as_float()?;
    if !r.is_finite() {
        return Err(non_finite("+", r));
    }
    Ok(Value::from_float(r))
}

fn float_sub(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let r = args[0].as_float()? - args[1].as_float()?;
    if !r.is_finite() {
        return Err(non_finite("-", r));
    }
    Ok(Value::from_float(r))
}

fn float_mul(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let r = args[0].as_float()? * args[1].as_float()?;
    if !r.is_finite() {
        return Err(non_finite("*", r));
    }
    Ok(Value::from_float(r))
}

fn float_div(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let r = args[0].as_float()? / args[1].as_float()?;
    if !r.is_finite() {
        return Err(non_finite("/", r));
    }
    Ok(Value::from_float(r))
}

fn float_neg(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let r = -args[0].as_float()?;
    if !r.is_finite() {
        return Err(non_finite("-", r));
    }
    Ok(Value::from_float(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_by_zero_is_an_invalid_argument() {
        let mut ctx = ExecutionContext::new();
        let err = int_div(&[Value::from_int(1), Value::from_int(0)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn integer_add_overflow_is_rejected() {
        let mut ctx = ExecutionContext::new();
        let err = int_add(&[Value::from_int(i64::MAX), Value::from_int(1)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TypeConstraintViolation(_)));
    }

    #[test]
    fn float_arithmetic_is_plain_ieee754() {
        let mut ctx = ExecutionContext::new();
        let v = float_mul(&[Value::from_float(1.5), Value::from_float(2.0)], &mut ctx).unwrap();
        assert_eq!(v.as_float().unwrap(), 3.0);
    }

    #[test]
    fn float_add_overflow_to_infinity_is_a_type_constraint_violation() {
        let mut ctx = ExecutionContext::new();
        let err = float_add(&[Value::from_float(f64::MAX), Value::from_float(f64::MAX)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TypeConstraintViolation(_)));
    }

    #[test]
    fn float_division_by_zero_is_a_type_constraint_violation() {
        let mut ctx = ExecutionContext::new();
        let err = float_div(&[Value::from_float(1.0), Value::from_float(0.0)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::TypeConstraintViolation(_)));
    }
}
