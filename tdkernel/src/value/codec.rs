//! Value-on-wire encoding contracts (§6.3): `BinaryKey` for record-layer keys,
//! `BinaryValue` for arbitrary Rust payload types occupying an attribute slot.
//!
//! Built-in scalar kinds get built-in impls here; user scalar types derive
//! `BinaryValue` via `tdkernel-derive`.

use byteorder::{BigEndian, ByteOrder};
use std::borrow::Cow;

use crate::error::Error;
use crate::Result;

/// A type that can serve as a record-layer key (or part of one, when a key is a
/// concatenation of attribute encodings).
///
/// Integer keys are encoded so that unsigned byte-lexicographic order matches
/// numeric order (sign bit flipped), so an index-positioned cursor scan over
/// encoded keys visits rows in ascending attribute order without decoding them.
pub trait BinaryKey {
    /// The type produced by [`BinaryKey::read`]; usually `Self` for `Sized` keys,
    /// an owned type for unsized ones (e.g. `str::Owned = String`).
    type Owned: std::borrow::Borrow<Self>;

    /// Encoded size in bytes.
    fn size(&self) -> usize;
    /// Writes the encoding into `buffer` (which is exactly [`BinaryKey::size`]
    /// bytes long) and returns the number of bytes written.
    fn write(&self, buffer: &mut [u8]) -> usize;
    /// Decodes a key from `buffer`.
    fn read(buffer: &[u8]) -> Self::Owned;
}

impl BinaryKey for i64 {
    type Owned = i64;

    fn size(&self) -> usize {
        8
    }

    fn write(&self, buffer: &mut [u8]) -> usize {
        let flipped = (*self as u64) ^ (1u64 << 63);
        BigEndian::write_u64(buffer, flipped);
        8
    }

    fn read(buffer: &[u8]) -> i64 {
        let flipped = BigEndian::read_u64(buffer);
        (flipped ^ (1u64 << 63)) as i64
    }
}

impl BinaryKey for bool {
    type Owned = bool;

    fn size(&self) -> usize {
        1
    }

    fn write(&self, buffer: &mut [u8]) -> usize {
        buffer[0] = *self as u8;
        1
    }

    fn read(buffer: &[u8]) -> bool {
        buffer[0] != 0
    }
}

impl BinaryKey for str {
    type Owned = String;

    fn size(&self) -> usize {
        self.len()
    }

    fn write(&self, buffer: &mut [u8]) -> usize {
        buffer[..self.len()].copy_from_slice(self.as_bytes());
        self.len()
    }

    fn read(buffer: &[u8]) -> String {
        String::from_utf8_lossy(buffer).into_owned()
    }
}

impl BinaryKey for [u8] {
    type Owned = Vec<u8>;

    fn size(&self) -> usize {
        self.len()
    }

    fn write(&self, buffer: &mut [u8]) -> usize {
        buffer[..self.len()].copy_from_slice(self);
        self.len()
    }

    fn read(buffer: &[u8]) -> Vec<u8> {
        buffer.to_vec()
    }
}

/// A type that can be stored as an attribute value or catalog row via the
/// record layer.
pub trait BinaryValue: Sized {
    /// Serializes `self` to an owned byte vector.
    fn to_bytes(&self) -> Vec<u8>;
    /// Deserializes a value previously produced by [`BinaryValue::to_bytes`].
    fn from_bytes(bytes: Cow<'_, [u8]>) -> Result<Self>;
}

impl BinaryValue for i64 {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        BinaryKey::write(self, &mut buf);
        buf
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Result<Self> {
        if bytes.len() != 8 {
            return Err(Error::DataCorrupted("integer encoding must be 8 bytes".to_string()));
        }
        Ok(BinaryKey::read(bytes.as_ref()))
    }
}

impl BinaryValue for f64 {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        BigEndian::write_f64(&mut buf, *self);
        buf
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Result<Self> {
        if bytes.len() != 8 {
            return Err(Error::DataCorrupted("float encoding must be 8 bytes".to_string()));
        }
        Ok(BigEndian::read_f64(bytes.as_ref()))
    }
}

impl BinaryValue for bool {
    fn to_bytes(&self) -> Vec<u8> {
        vec![*self as u8]
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Result<Self> {
        bytes
            .first()
            .map(|b| *b != 0)
            .ok_or_else(|| Error::DataCorrupted("boolean encoding must be 1 byte".to_string()))
    }
}

impl BinaryValue for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Result<Self> {
        String::from_utf8(bytes.into_owned())
            .map_err(|e| Error::DataCorrupted(format!("invalid utf8: {}", e)))
    }
}

impl BinaryValue for Vec<u8> {
    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Result<Self> {
        Ok(bytes.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_key_ordering_matches_numeric_ordering() {
        let values: [i64; 5] = [-100, -1, 0, 1, 100];
        let mut encoded: Vec<[u8; 8]> = values
            .iter()
            .map(|v| {
                let mut buf = [0u8; 8];
                BinaryKey::write(v, &mut buf);
                buf
            })
            .collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        encoded.sort();
        assert_eq!(encoded, sorted);
        for (buf, v) in encoded.iter().zip(values.iter()) {
            assert_eq!(&i64::read(buf), v);
        }
    }

    #[test]
    fn float_roundtrips() {
        let v = 3.5f64;
        let bytes = v.to_bytes();
        assert_eq!(f64::from_bytes(Cow::Owned(bytes)).unwrap(), v);
    }
}
