//! Demonstrates repurposing `tdkernel-derive`'s `BinaryValue` derive for a
//! Rust-native payload type occupying a possrep component, the way the
//! teacher's own `metaldb-derive` derives `BinaryValue` for a fixture type in
//! its own benchmark suite.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tdkernel::BinaryValue;
use tdkernel_derive::BinaryValue;

/// A fixed-size opaque payload a scalar type's possrep could carry alongside
/// its declared components -- not itself a Tutorial D scalar, just a Rust
/// value that needs a wire encoding to pass through the record layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, BinaryValue)]
#[binary_value(codec = "bincode")]
struct AuditStamp {
    actor_id: u64,
    sequence: u32,
}

#[test]
fn derived_binary_value_round_trips() {
    let stamp = AuditStamp { actor_id: 42, sequence: 7 };
    let bytes = stamp.to_bytes();
    let decoded = AuditStamp::from_bytes(Cow::Owned(bytes)).unwrap();
    assert_eq!(decoded, stamp);
}

#[test]
fn derived_binary_value_rejects_truncated_bytes() {
    let err = AuditStamp::from_bytes(Cow::Borrowed(&[0u8; 2])).unwrap_err();
    assert!(matches!(err, tdkernel::Error::TypeMismatch(_)));
}
