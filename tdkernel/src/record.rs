//! The record-layer contract (§6.1): the abstract interface to persistent
//! recmaps, sequences, and transactions the kernel calls out to. The kernel
//! never implements a storage backend itself -- it is handed one of these
//! through [`Environment`].
//!
//! Errors crossing this boundary are expected to already be translated into
//! the canonical taxonomy of [`crate::error::Error`] (§6.2); this module does
//! not perform that translation itself, since it has no backend-specific error
//! codes of its own to translate.

use std::fmt;

use crate::types::ReprLen;
use crate::Result;

/// Describes one fixed- or variable-length field of a recmap's record layout.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Encoded width, per the owning type's internal representation length.
    pub len: ReprLen,
}

/// A record-layer transaction. Backends implement this over whatever native
/// transaction handle they have (a B-tree store's `DB_TXN`, a distributed
/// store's lease-scoped batch, ...).
pub trait Transaction: fmt::Debug {
    /// The backend-assigned transaction id.
    fn id(&self) -> u64;
    /// Commits the transaction, consuming it.
    fn commit(self: Box<Self>) -> Result<()>;
    /// Aborts the transaction, consuming it.
    fn abort(self: Box<Self>) -> Result<()>;
}

/// A cursor over a [`RecMap`]'s records, scoped to one transaction.
///
/// `next` raises [`crate::Error::not_found`] once the cursor runs past the
/// last record, in keeping with `not_found`'s role as the uniform
/// end-of-iteration marker (§7).
pub trait Cursor {
    /// Positions the cursor at the first record whose key is `>= key`.
    fn seek(&mut self, key: &[u8]) -> Result<()>;
    /// Advances to the next record.
    fn next(&mut self) -> Result<()>;
    /// Reads the current record's `field`-th field.
    fn get(&self, field: usize) -> Result<&[u8]>;
    /// Overwrites the current record's `field`-th field.
    fn set(&mut self, field: usize, bytes: &[u8]) -> Result<()>;
    /// Deletes the current record.
    fn delete(&mut self) -> Result<()>;
    /// Releases the cursor.
    fn close(&mut self) -> Result<()>;
}

/// A persistent key-value map storing encoded tuples, keyed by one or more
/// designated key fields (the primary candidate key's encoding).
pub trait RecMap: fmt::Debug {
    /// Inserts a new record; raises [`crate::Error::KeyViolation`] if `key`
    /// already exists.
    fn insert(&self, tx: &mut dyn Transaction, key: &[u8], fields: &[Vec<u8>]) -> Result<()>;
    /// Overwrites the named fields of the record stored under `key`.
    fn update_by_key(&self, tx: &mut dyn Transaction, key: &[u8], fields: &[(usize, Vec<u8>)]) -> Result<()>;
    /// Deletes the record stored under `key`.
    fn delete_by_key(&self, tx: &mut dyn Transaction, key: &[u8]) -> Result<()>;
    /// True iff a record is stored under `key`.
    fn contains(&self, tx: &dyn Transaction, key: &[u8]) -> Result<bool>;
    /// Opens a cursor scoped to `tx`; `write` requests a writable cursor.
    fn cursor<'a>(&'a self, tx: &'a mut dyn Transaction, write: bool) -> Result<Box<dyn Cursor + 'a>>;
}

/// A monotonically increasing counter backed by its own single-key database.
pub trait Sequence: fmt::Debug {
    /// Returns the next value and durably advances the counter.
    fn next(&self, tx: &mut dyn Transaction) -> Result<i64>;
    /// Deletes the sequence's backing storage.
    fn delete(self: Box<Self>, tx: &mut dyn Transaction) -> Result<()>;
}

/// The top-level handle to an open backend: a collection of recmaps and
/// sequences sharing one transactional domain.
pub trait Environment: fmt::Debug {
    /// Creates a new recmap; raises [`crate::Error::ElementExists`] if `name`
    /// is already in use within `file`.
    fn create_recmap(
        &self,
        name: &str,
        file: &str,
        fields: &[FieldSpec],
        key_fields: &[usize],
        tx: &mut dyn Transaction,
    ) -> Result<Box<dyn RecMap>>;
    /// Opens an existing recmap.
    fn open_recmap(&self, name: &str, file: &str, fields: &[FieldSpec], tx: &mut dyn Transaction) -> Result<Box<dyn RecMap>>;
    /// Opens (creating if necessary) a sequence.
    fn open_sequence(&self, name: &str, file: &str, tx: &mut dyn Transaction) -> Result<Box<dyn Sequence>>;
    /// Renames a sequence's backing storage.
    fn rename_sequence(&self, old: &str, new: &str, file: &str, tx: &mut dyn Transaction) -> Result<()>;
    /// Begins a transaction, optionally nested under `parent`.
    fn begin_tx(&self, parent: Option<&dyn Transaction>) -> Result<Box<dyn Transaction>>;
    /// Closes the environment, releasing any open handles.
    fn close(&self) -> Result<()>;
}

#[cfg(any(test, feature = "testing"))]
pub mod memory;
