//! Tuple values: an unordered mapping from attribute name to owned value
//! (`duro/obj/tuple.c`'s `RDB_OB_TUPLE` representation, backed there by a
//! hashtable of `tuple_entry`).

use std::collections::HashMap;

use crate::error::Error;
use crate::value::Value;
use crate::Result;

/// A tuple value: attribute name -> value, names unique within the tuple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    attrs: HashMap<String, Value>,
}

impl Tuple {
    /// An empty tuple (the heading with no attributes, `TABLE_DUM`/`TABLE_DEE`'s
    /// tuple).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (inserting or overwriting) the attribute named `name`.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    /// Reads the attribute named `name`.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.attrs
            .get(name)
            .ok_or_else(|| Error::not_found(format!("no such attribute: {}", name)))
    }

    /// Reads the attribute named `name`, if present.
    pub fn try_get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// True iff the tuple has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// All attribute names, in arbitrary order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Projects onto the named attributes, optionally also producing the
    /// "rest" tuple of attributes *not* named -- used internally by `wrap`
    /// (`RDB_project_tuple`/`RDB_remove_tuple`).
    pub fn project(&self, names: &[&str]) -> Result<Tuple> {
        let mut out = Tuple::new();
        for name in names {
            let v = self.get(name)?;
            out.set(*name, v.clone());
        }
        Ok(out)
    }

    /// Projects onto the *complement* of the named attributes.
    pub fn project_rest(&self, names: &[&str]) -> Tuple {
        let mut out = Tuple::new();
        for (k, v) in self.iter() {
            if !names.contains(&k) {
                out.set(k, v.clone());
            }
        }
        out
    }

    /// Returns a new tuple with `other`'s attributes merged in, overwriting any
    /// attribute names the two share. Used by `join`/`extend`/`ungroup`.
    pub fn merged_with(&self, other: &Tuple) -> Tuple {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.set(k, v.clone());
        }
        out
    }

    /// True iff `self` and `other` agree on every attribute named in `key`.
    pub fn agrees_on(&self, other: &Tuple, key: &[String]) -> bool {
        key.iter().all(|name| match (self.try_get(name), other.try_get(name)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn set_then_get_is_identity_and_does_not_disturb_other_attrs() {
        let mut t = Tuple::new();
        t.set("m", Value::from_int(1));
        t.set("n", Value::from_int(2));
        t.set("m", Value::from_int(9));
        assert_eq!(t.get("m").unwrap(), &Value::from_int(9));
        assert_eq!(t.get("n").unwrap(), &Value::from_int(2));
    }

    #[test]
    fn project_rest_is_complement() {
        let mut t = Tuple::new();
        t.set("a", Value::from_int(1));
        t.set("b", Value::from_int(2));
        t.set("c", Value::from_int(3));
        let rest = t.project_rest(&["a"]);
        assert_eq!(rest.len(), 2);
        assert!(rest.try_get("a").is_none());
        assert!(rest.try_get("b").is_some());
    }
}
