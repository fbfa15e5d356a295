//! The value core: a tagged sum of concrete value kinds, each owning its
//! payload and optionally carrying a type pointer (§3.1, §4.1).

mod codec;
mod datetime;
mod relation;
mod tuple;

pub use codec::{BinaryKey, BinaryValue};
pub use datetime::DateTime;
pub use relation::{CandidateKey, MaterializedRelation, RelationValue};
pub use tuple::Tuple;

use crate::error::Error;
use crate::types::TypeHandle;
use crate::Result;

/// The payload of a [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Produced by default construction; legal as a write target only.
    Unit,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A date and time.
    DateTime(DateTime),
    /// A byte string, covering both textual `string` and opaque `binary` values.
    ByteString(Vec<u8>),
    /// A tuple.
    Tuple(Tuple),
    /// A relation handle.
    Relation(Box<RelationValue>),
    /// An array.
    Array(Vec<Value>),
}

/// A value of an arbitrary kind, optionally typed.
///
/// Scalars always carry a type pointer; tuples and arrays may or may not (the
/// front-end attaches one when the type cannot be inferred). `impl_typ` records
/// which concrete subtype a value declared at a dummy (union) supertype
/// actually inhabits.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    kind: ValueKind,
    typ: Option<TypeHandle>,
    impl_typ: Option<TypeHandle>,
}

impl Value {
    fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            typ: None,
            impl_typ: None,
        }
    }

    /// The uninitialized value.
    pub fn unit() -> Self {
        Self::new(ValueKind::Unit)
    }

    /// Constructs a boolean value.
    pub fn from_bool(v: bool) -> Self {
        Self::new(ValueKind::Bool(v))
    }

    /// Constructs an integer value.
    pub fn from_int(v: i64) -> Self {
        Self::new(ValueKind::Int(v))
    }

    /// Constructs a float value.
    pub fn from_float(v: f64) -> Self {
        Self::new(ValueKind::Float(v))
    }

    /// Constructs a datetime value.
    pub fn from_datetime(v: DateTime) -> Self {
        Self::new(ValueKind::DateTime(v))
    }

    /// Constructs a string value from UTF-8 text.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::new(ValueKind::ByteString(s.into().into_bytes()))
    }

    /// Constructs a binary value from raw bytes.
    pub fn from_binary(bytes: Vec<u8>) -> Self {
        Self::new(ValueKind::ByteString(bytes))
    }

    /// Constructs a tuple value.
    pub fn from_tuple(t: Tuple) -> Self {
        Self::new(ValueKind::Tuple(t))
    }

    /// Constructs a relation value.
    pub fn from_relation(r: RelationValue) -> Self {
        Self::new(ValueKind::Relation(Box::new(r)))
    }

    /// Constructs an array value.
    pub fn from_array(elems: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(elems))
    }

    /// Attaches a declared type to the value (builder style).
    pub fn with_type(mut self, typ: TypeHandle) -> Self {
        self.typ = Some(typ);
        self
    }

    /// The value's declared type, if attached.
    pub fn typ(&self) -> Option<TypeHandle> {
        self.typ
    }

    /// Sets the declared type in place.
    pub fn set_typ(&mut self, typ: Option<TypeHandle>) {
        self.typ = typ;
    }

    /// The value's implementation type (for values declared at a dummy/union
    /// supertype), if set.
    pub fn impl_typ(&self) -> Option<TypeHandle> {
        self.impl_typ
    }

    /// Records which concrete subtype this value actually inhabits.
    pub fn set_impl_typ(&mut self, typ: Option<TypeHandle>) {
        self.impl_typ = typ;
    }

    /// The type used for operator dispatch: the implementation type if set,
    /// otherwise the declared type.
    pub fn dispatch_typ(&self) -> Option<TypeHandle> {
        self.impl_typ.or(self.typ)
    }

    /// The payload kind.
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    fn mismatch(&self, wanted: &str) -> Error {
        Error::type_mismatch(format!("value is not a {}", wanted))
    }

    /// Reads the value as a `bool`.
    pub fn as_bool(&self) -> Result<bool> {
        match self.kind {
            ValueKind::Bool(b) => Ok(b),
            _ => Err(self.mismatch("boolean")),
        }
    }

    /// Reads the value as an `i64`.
    pub fn as_int(&self) -> Result<i64> {
        match self.kind {
            ValueKind::Int(i) => Ok(i),
            _ => Err(self.mismatch("integer")),
        }
    }

    /// Reads the value as an `f64`.
    pub fn as_float(&self) -> Result<f64> {
        match self.kind {
            ValueKind::Float(f) => Ok(f),
            _ => Err(self.mismatch("float")),
        }
    }

    /// Reads the value as a [`DateTime`].
    pub fn as_datetime(&self) -> Result<DateTime> {
        match self.kind {
            ValueKind::DateTime(d) => Ok(d),
            _ => Err(self.mismatch("datetime")),
        }
    }

    /// Reads the value as a UTF-8 string slice.
    pub fn as_str(&self) -> Result<&str> {
        match &self.kind {
            ValueKind::ByteString(b) => {
                std::str::from_utf8(b).map_err(|_| Error::type_mismatch("value is not valid utf-8"))
            }
            _ => Err(self.mismatch("string")),
        }
    }

    /// Reads the value as raw bytes (works for both `string` and `binary`
    /// values, since both share the byte-string representation).
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match &self.kind {
            ValueKind::ByteString(b) => Ok(b),
            _ => Err(self.mismatch("byte string")),
        }
    }

    /// Reads the value as a tuple.
    pub fn as_tuple(&self) -> Result<&Tuple> {
        match &self.kind {
            ValueKind::Tuple(t) => Ok(t),
            _ => Err(self.mismatch("tuple")),
        }
    }

    /// Mutably reads the value as a tuple.
    pub fn as_tuple_mut(&mut self) -> Result<&mut Tuple> {
        match &mut self.kind {
            ValueKind::Tuple(t) => Ok(t),
            _ => Err(Error::type_mismatch("value is not a tuple")),
        }
    }

    /// Reads the value as a relation.
    pub fn as_relation(&self) -> Result<&RelationValue> {
        match &self.kind {
            ValueKind::Relation(r) => Ok(r),
            _ => Err(self.mismatch("relation")),
        }
    }

    /// Mutably reads the value as a relation.
    pub fn as_relation_mut(&mut self) -> Result<&mut RelationValue> {
        match &mut self.kind {
            ValueKind::Relation(r) => Ok(r),
            _ => Err(Error::type_mismatch("value is not a relation")),
        }
    }

    /// Reads the value as an array slice.
    pub fn as_array(&self) -> Result<&[Value]> {
        match &self.kind {
            ValueKind::Array(a) => Ok(a),
            _ => Err(self.mismatch("array")),
        }
    }

    /// Mutably reads the value as an array.
    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Value>> {
        match &mut self.kind {
            ValueKind::Array(a) => Ok(a),
            _ => Err(Error::type_mismatch("value is not an array")),
        }
    }

    /// Appends `s` to a byte-string value, growing the backing buffer by at
    /// least `increment` bytes beyond what is strictly needed to amortize
    /// repeated small appends (mirrors `RDB_append_string`'s growth policy;
    /// `increment` is normally [`crate::config::EngineConfig::string_grow_increment`]).
    pub fn append_str(&mut self, s: &str, increment: usize) -> Result<()> {
        self.append_bytes(s.as_bytes(), increment)
    }

    /// Appends raw bytes to a byte-string value (`RDB_append_string`'s binary
    /// counterpart).
    pub fn append_bytes(&mut self, bytes: &[u8], increment: usize) -> Result<()> {
        match &mut self.kind {
            ValueKind::ByteString(b) => {
                let needed = b.len() + bytes.len();
                if b.capacity() < needed {
                    b.reserve(needed - b.len() + increment);
                }
                b.extend_from_slice(bytes);
                Ok(())
            }
            _ => Err(Error::type_mismatch("value is not a byte string")),
        }
    }

    /// Overwrites `len` bytes starting at `pos` with `src`, growing the buffer
    /// with zero bytes first if `pos + len` exceeds the current length.
    pub fn binary_set(&mut self, pos: usize, src: &[u8]) -> Result<()> {
        match &mut self.kind {
            ValueKind::ByteString(b) => {
                let end = pos + src.len();
                if end > b.len() {
                    b.resize(end, 0);
                }
                b[pos..end].copy_from_slice(src);
                Ok(())
            }
            _ => Err(Error::type_mismatch("value is not a byte string")),
        }
    }

    /// Reads `len` bytes starting at `pos`; raises [`Error::ResourceNotFound`]
    /// if the range is out of bounds.
    pub fn binary_get(&self, pos: usize, len: usize) -> Result<&[u8]> {
        let b = self.as_bytes()?;
        b.get(pos..pos + len)
            .ok_or_else(|| Error::ResourceNotFound(format!("binary range [{}, {}) out of bounds", pos, pos + len)))
    }

    /// Length of the byte-string payload.
    pub fn binary_length(&self) -> Result<usize> {
        Ok(self.as_bytes()?.len())
    }

    /// Resizes the byte-string payload to exactly `len` bytes, zero-filling any
    /// new tail.
    pub fn binary_resize(&mut self, len: usize) -> Result<()> {
        match &mut self.kind {
            ValueKind::ByteString(b) => {
                b.resize(len, 0);
                Ok(())
            }
            _ => Err(Error::type_mismatch("value is not a byte string")),
        }
    }

    /// Sets a tuple attribute (requires the value to be a tuple).
    pub fn tuple_set(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.as_tuple_mut()?.set(name, value);
        Ok(())
    }

    /// Reads a tuple attribute (requires the value to be a tuple).
    pub fn tuple_get(&self, name: &str) -> Result<&Value> {
        self.as_tuple()?.get(name)
    }

    /// Sets `idx`-th array element; the array must already have at least
    /// `idx + 1` elements (see [`Value::array_set_length`]).
    pub fn array_set(&mut self, idx: usize, value: Value) -> Result<()> {
        let arr = self.as_array_mut()?;
        let slot = arr
            .get_mut(idx)
            .ok_or_else(|| Error::ResourceNotFound(format!("array index {} out of range", idx)))?;
        *slot = value;
        Ok(())
    }

    /// Reads the `idx`-th array element.
    pub fn array_get(&self, idx: usize) -> Result<&Value> {
        self.as_array()?
            .get(idx)
            .ok_or_else(|| Error::ResourceNotFound(format!("array index {} out of range", idx)))
    }

    /// Sets the array's logical length, zero-filling (`Value::unit`) any new
    /// tail or truncating any excess.
    pub fn array_set_length(&mut self, len: usize) -> Result<()> {
        let arr = self.as_array_mut()?;
        arr.resize_with(len, Value::unit);
        Ok(())
    }

    /// The array's logical length.
    pub fn array_length(&self) -> Result<usize> {
        Ok(self.as_array()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_set_get_roundtrips_and_preserves_siblings() {
        let mut t = Value::from_tuple(Tuple::new());
        t.tuple_set("m", Value::from_int(5)).unwrap();
        t.tuple_set("n", Value::from_int(6)).unwrap();
        assert_eq!(t.tuple_get("m").unwrap(), &Value::from_int(5));
        assert_eq!(t.tuple_get("n").unwrap(), &Value::from_int(6));
    }

    #[test]
    fn array_set_then_get_roundtrips() {
        let mut a = Value::from_array(vec![Value::unit(); 3]);
        a.array_set(1, Value::from_int(42)).unwrap();
        assert_eq!(a.array_get(1).unwrap(), &Value::from_int(42));
    }

    #[test]
    fn array_get_out_of_range_is_resource_not_found() {
        let a = Value::from_array(vec![]);
        assert!(matches!(a.array_get(0), Err(Error::ResourceNotFound(_))));
    }

    #[test]
    fn reading_wrong_kind_is_type_mismatch() {
        let v = Value::from_int(1);
        assert!(matches!(v.as_bool(), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn binary_get_past_end_is_resource_not_found() {
        let v = Value::from_binary(vec![1, 2, 3]);
        assert!(matches!(v.binary_get(0, 10), Err(Error::ResourceNotFound(_))));
    }
}
