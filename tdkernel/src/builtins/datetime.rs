//! `datetime` operators beyond the possrep selector/getters/setters, which
//! `query::eval`'s possrep-component handling covers directly (§4.4).

use crate::context::ExecutionContext;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::{DateTime, Value};
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let int = arena.integer();
    let string = arena.string();
    let datetime = arena.datetime();

    registry.register(OpEntry::native("now", vec![], Some(datetime), now));
    registry.register(OpEntry::native("now_utc", vec![], Some(datetime), now_utc));
    registry.register(OpEntry::native("add_seconds", vec![Some(datetime), Some(int)], Some(datetime), add_seconds));
    registry.register(OpEntry::native("cast_as_string", vec![Some(datetime)], Some(string), cast_as_string));
}

fn now(_args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_datetime(DateTime::now()))
}

fn now_utc(_args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_datetime(DateTime::now_utc()))
}

fn add_seconds(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let dt = args[0].as_datetime()?;
    let secs = args[1].as_int()?;
    Ok(Value::from_datetime(dt.add_seconds(secs)?))
}

fn cast_as_string(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_string(args[0].as_datetime()?.to_iso8601()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_seconds_rolls_over_a_day_boundary() {
        let mut ctx = ExecutionContext::new();
        let dt = DateTime::new(2020, 1, 1, 23, 59, 59).unwrap();
        let v = add_seconds(&[Value::from_datetime(dt), Value::from_int(2)], &mut ctx).unwrap();
        assert_eq!(v.as_datetime().unwrap(), DateTime::new(2020, 1, 2, 0, 0, 1).unwrap());
    }

    #[test]
    fn cast_as_string_produces_iso8601() {
        let mut ctx = ExecutionContext::new();
        let dt = DateTime::new(2020, 6, 15, 9, 30, 5).unwrap();
        let v = cast_as_string(&[Value::from_datetime(dt)], &mut ctx).unwrap();
        assert_eq!(v.as_str().unwrap(), "2020-06-15T09:30:05");
    }
}
