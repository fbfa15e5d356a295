//! `cast_as_*` conversions between `integer`, `float`, `string`, and
//! `binary` (§4.4). Each cast validates range or parse failures rather than
//! silently truncating or producing garbage.

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::Value;
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let int = arena.integer();
    let float = arena.float();
    let string = arena.string();
    let binary = arena.binary();

    registry.register(OpEntry::native("cast_as_integer", vec![Some(int)], Some(int), int_to_int));
    registry.register(OpEntry::native("cast_as_integer", vec![Some(float)], Some(int), float_to_int));
    registry.register(OpEntry::native("cast_as_integer", vec![Some(string)], Some(int), string_to_int));

    registry.register(OpEntry::native("cast_as_float", vec![Some(float)], Some(float), float_to_float));
    registry.register(OpEntry::native("cast_as_float", vec![Some(int)], Some(float), int_to_float));
    registry.register(OpEntry::native("cast_as_float", vec![Some(string)], Some(float), string_to_float));

    registry.register(OpEntry::native("cast_as_string", vec![Some(int)], Some(string), int_to_string));
    registry.register(OpEntry::native("cast_as_string", vec![Some(float)], Some(string), float_to_string));
    registry.register(OpEntry::native("cast_as_string", vec![Some(string)], Some(string), string_to_string));
    registry.register(OpEntry::native("cast_as_string", vec![Some(binary)], Some(string), binary_to_string));

    registry.register(OpEntry::native("cast_as_binary", vec![Some(string)], Some(binary), string_to_binary));
    registry.register(OpEntry::native("cast_as_binary", vec![Some(binary)], Some(binary), binary_to_binary));
}

fn int_to_int(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_int(args[0].as_int()?))
}

fn float_to_int(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let f = args[0].as_float()?;
    if !f.is_finite() || f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(Error::invalid_argument(format!("{} is out of range for integer", f)));
    }
    Ok(Value::from_int(f as i64))
}

fn string_to_int(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let s = args[0].as_str()?;
    let n = s.trim().parse::<i64>().map_err(|_| Error::invalid_argument(format!("`{}` is not a valid integer", s)))?;
    Ok(Value::from_int(n))
}

fn float_to_float(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_float()?))
}

fn int_to_float(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_float(args[0].as_int()? as f64))
}

fn string_to_float(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let s = args[0].as_str()?;
    let f = s.trim().parse::<f64>().map_err(|_| Error::invalid_argument(format!("`{}` is not a valid float", s)))?;
    Ok(Value::from_float(f))
}

fn int_to_string(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_string(args[0].as_int()?.to_string()))
}

fn float_to_string(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_string(args[0].as_float()?.to_string()))
}

fn string_to_string(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_string(args[0].as_str()?))
}

fn binary_to_string(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let bytes = args[0].as_bytes()?;
    let s = std::str::from_utf8(bytes).map_err(|_| Error::invalid_argument("binary value is not valid utf-8"))?;
    Ok(Value::from_string(s))
}

fn string_to_binary(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_binary(args[0].as_bytes()?.to_vec()))
}

fn binary_to_binary(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_binary(args[0].as_bytes()?.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_to_string_round_trips_exactly() {
        let mut ctx = ExecutionContext::new();
        let s = int_to_string(&[Value::from_int(42)], &mut ctx).unwrap();
        let back = string_to_int(&[s], &mut ctx).unwrap();
        assert_eq!(back.as_int().unwrap(), 42);
    }

    #[test]
    fn float_out_of_range_for_integer_is_rejected() {
        let mut ctx = ExecutionContext::new();
        let err = float_to_int(&[Value::from_float(f64::INFINITY)], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn unparseable_string_to_float_is_rejected() {
        let mut ctx = ExecutionContext::new();
        assert!(string_to_float(&[Value::from_string("not a number")], &mut ctx).is_err());
    }
}
