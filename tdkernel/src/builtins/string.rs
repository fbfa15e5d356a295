//! `string` operators (§4.4): length, slicing, search and SQL-style
//! pattern matching. `regex_like` and `format` are deliberately absent --
//! both belong to the regex/locale/I-O adapters this kernel treats as
//! external collaborators, not kernel-level builtins.

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::operator::{OpEntry, OperatorRegistry};
use crate::types::TypeArena;
use crate::value::Value;
use crate::Result;

pub fn register(registry: &mut OperatorRegistry, arena: &TypeArena) {
    let int = arena.integer();
    let string = arena.string();
    let boolean = arena.boolean();

    registry.register(OpEntry::native("||", vec![Some(string), Some(string)], Some(string), concat));
    registry.register(OpEntry::native("strlen", vec![Some(string)], Some(int), strlen));
    registry.register(OpEntry::native("strlen_b", vec![Some(string)], Some(int), strlen_b));
    registry.register(OpEntry::native("substr", vec![Some(string), Some(int), Some(int)], Some(string), substr));
    registry.register(OpEntry::native("substr_b", vec![Some(string), Some(int), Some(int)], Some(string), substr_b));
    registry.register(OpEntry::native("strfind_b", vec![Some(string), Some(string)], Some(int), strfind_b));
    registry.register(OpEntry::native("starts_with", vec![Some(string), Some(string)], Some(boolean), starts_with));
    registry.register(OpEntry::native("like", vec![Some(string), Some(string)], Some(boolean), like));
}

fn concat(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_string(format!("{}{}", args[0].as_str()?, args[1].as_str()?)))
}

fn strlen(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_int(args[0].as_str()?.chars().count() as i64))
}

fn strlen_b(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_int(args[0].as_bytes()?.len() as i64))
}

/// `substr(s, start, len)`, with `start` a 0-based character offset.
fn substr(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let s = args[0].as_str()?;
    let (start, len) = (args[1].as_int()?, args[2].as_int()?);
    if start < 0 || len < 0 {
        return Err(Error::invalid_argument("substr requires non-negative start and length"));
    }
    let chars: Vec<char> = s.chars().collect();
    let start = start as usize;
    let end = start.saturating_add(len as usize).min(chars.len());
    if start > chars.len() {
        return Err(Error::invalid_argument("substr start is past the end of the string"));
    }
    Ok(Value::from_string(chars[start..end].iter().collect::<String>()))
}

/// `substr_b(s, start, len)`, with `start` a 0-based byte offset. Errors if
/// either boundary falls inside a multi-byte UTF-8 sequence.
fn substr_b(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let b = args[0].as_bytes()?;
    let (start, len) = (args[1].as_int()?, args[2].as_int()?);
    if start < 0 || len < 0 {
        return Err(Error::invalid_argument("substr_b requires non-negative start and length"));
    }
    let start = start as usize;
    let end = start.saturating_add(len as usize).min(b.len());
    if start > b.len() {
        return Err(Error::invalid_argument("substr_b start is past the end of the string"));
    }
    let slice = &b[start..end];
    let s = std::str::from_utf8(slice).map_err(|_| Error::invalid_argument("substr_b boundary splits a multi-byte character"))?;
    Ok(Value::from_string(s))
}

fn strfind_b(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let haystack = args[0].as_bytes()?;
    let needle = args[1].as_bytes()?;
    let pos = haystack
        .windows(needle.len().max(1))
        .position(|w| w == needle)
        .filter(|_| !needle.is_empty())
        .map(|p| p as i64)
        .unwrap_or(-1);
    Ok(Value::from_int(pos))
}

fn starts_with(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    Ok(Value::from_bool(args[0].as_str()?.starts_with(args[1].as_str()?)))
}

fn like(args: &[Value], _ctx: &mut ExecutionContext) -> Result<Value> {
    let s = args[0].as_str()?;
    let pattern = args[1].as_str()?;
    Ok(Value::from_bool(glob_match(s.as_bytes(), pattern.as_bytes())))
}

/// SQL-style `%`/`_` glob matching: `%` matches any run of characters
/// (including none), `_` matches exactly one.
fn glob_match(s: &[u8], pattern: &[u8]) -> bool {
    fn rec(s: &[u8], p: &[u8]) -> bool {
        match p.first() {
            None => s.is_empty(),
            Some(b'%') => rec(s, &p[1..]) || (!s.is_empty() && rec(&s[1..], p)),
            Some(b'_') => !s.is_empty() && rec(&s[1..], &p[1..]),
            Some(&c) => !s.is_empty() && s[0] == c && rec(&s[1..], &p[1..]),
        }
    }
    rec(s, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strlen_counts_characters_not_bytes() {
        let mut ctx = ExecutionContext::new();
        let v = strlen(&[Value::from_string("café")], &mut ctx).unwrap();
        assert_eq!(v.as_int().unwrap(), 4);
        let b = strlen_b(&[Value::from_string("café")], &mut ctx).unwrap();
        assert_eq!(b.as_int().unwrap(), 5);
    }

    #[test]
    fn substr_slices_by_character_offset() {
        let mut ctx = ExecutionContext::new();
        let v = substr(&[Value::from_string("hello world"), Value::from_int(6), Value::from_int(5)], &mut ctx).unwrap();
        assert_eq!(v.as_str().unwrap(), "world");
    }

    #[test]
    fn strfind_b_returns_minus_one_when_absent() {
        let mut ctx = ExecutionContext::new();
        let v = strfind_b(&[Value::from_string("hello"), Value::from_string("xyz")], &mut ctx).unwrap();
        assert_eq!(v.as_int().unwrap(), -1);
    }

    #[test]
    fn like_matches_percent_and_underscore_wildcards() {
        assert!(glob_match(b"hello", b"h_l%"));
        assert!(glob_match(b"hello", b"%"));
        assert!(!glob_match(b"hello", b"h_l"));
    }
}
