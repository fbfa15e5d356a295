//! An in-memory reference implementation of the record-layer contract, for
//! unit and integration tests only (never a production backend -- mirrors the
//! role the teacher's `TemporaryDB` plays for its own test suite).
//!
//! Transactions here are a coarse single-writer lock rather than true MVCC:
//! good enough to exercise the kernel's query engine and catalog logic without
//! pulling in a real storage engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Error;
use crate::record::{Cursor, Environment, FieldSpec, RecMap, Sequence, Transaction};
use crate::Result;

#[derive(Debug, Default)]
struct Table {
    records: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
}

/// An in-memory [`Environment`].
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    tables: Mutex<HashMap<String, Arc<Mutex<Table>>>>,
    sequences: Mutex<HashMap<String, Arc<AtomicI64>>>,
    next_tx_id: AtomicU64,
}

impl MemoryEnvironment {
    /// An empty environment with no recmaps or sequences.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Environment for MemoryEnvironment {
    fn create_recmap(
        &self,
        name: &str,
        file: &str,
        _fields: &[FieldSpec],
        _key_fields: &[usize],
        _tx: &mut dyn Transaction,
    ) -> Result<Box<dyn RecMap>> {
        let key = format!("{}/{}", file, name);
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(&key) {
            return Err(Error::ElementExists(format!("recmap {} already exists", key)));
        }
        let table = Arc::new(Mutex::new(Table {
            records: BTreeMap::new(),
        }));
        tables.insert(key, table.clone());
        Ok(Box::new(MemoryRecMap { table }))
    }

    fn open_recmap(&self, name: &str, file: &str, _fields: &[FieldSpec], _tx: &mut dyn Transaction) -> Result<Box<dyn RecMap>> {
        let key = format!("{}/{}", file, name);
        let table = self
            .tables
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(format!("recmap {} not found", key)))?;
        Ok(Box::new(MemoryRecMap { table }))
    }

    fn open_sequence(&self, name: &str, file: &str, _tx: &mut dyn Transaction) -> Result<Box<dyn Sequence>> {
        let key = format!("{}/{}", file, name);
        let counter = self.sequences.lock().unwrap().entry(key).or_insert_with(|| Arc::new(AtomicI64::new(0))).clone();
        Ok(Box::new(MemorySequence { counter }))
    }

    fn rename_sequence(&self, old: &str, new: &str, file: &str, _tx: &mut dyn Transaction) -> Result<()> {
        let old_key = format!("{}/{}", file, old);
        let new_key = format!("{}/{}", file, new);
        let mut sequences = self.sequences.lock().unwrap();
        let counter = sequences
            .remove(&old_key)
            .ok_or_else(|| Error::ResourceNotFound(format!("sequence {} not found", old_key)))?;
        sequences.insert(new_key, counter);
        Ok(())
    }

    fn begin_tx(&self, _parent: Option<&dyn Transaction>) -> Result<Box<dyn Transaction>> {
        let id = self.next_tx_id.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(tx = id, "begin transaction");
        Ok(Box::new(MemoryTransaction { id }))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryTransaction {
    id: u64,
}

impl Transaction for MemoryTransaction {
    fn id(&self) -> u64 {
        self.id
    }

    fn commit(self: Box<Self>) -> Result<()> {
        tracing::trace!(tx = self.id, "commit transaction");
        Ok(())
    }

    fn abort(self: Box<Self>) -> Result<()> {
        tracing::trace!(tx = self.id, "abort transaction");
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryRecMap {
    table: Arc<Mutex<Table>>,
}

impl MemoryRecMap {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap()
    }
}

impl RecMap for MemoryRecMap {
    fn insert(&self, _tx: &mut dyn Transaction, key: &[u8], fields: &[Vec<u8>]) -> Result<()> {
        let mut table = self.lock();
        if table.records.contains_key(key) {
            return Err(Error::key_violation("duplicate primary key"));
        }
        table.records.insert(key.to_vec(), fields.to_vec());
        Ok(())
    }

    fn update_by_key(&self, _tx: &mut dyn Transaction, key: &[u8], fields: &[(usize, Vec<u8>)]) -> Result<()> {
        let mut table = self.lock();
        let record = table
            .records
            .get_mut(key)
            .ok_or_else(|| Error::not_found("no record with that key"))?;
        for (idx, bytes) in fields {
            if *idx >= record.len() {
                return Err(Error::invalid_argument("field index out of range"));
            }
            record[*idx] = bytes.clone();
        }
        Ok(())
    }

    fn delete_by_key(&self, _tx: &mut dyn Transaction, key: &[u8]) -> Result<()> {
        let mut table = self.lock();
        table
            .records
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("no record with that key"))
    }

    fn contains(&self, _tx: &dyn Transaction, key: &[u8]) -> Result<bool> {
        Ok(self.lock().records.contains_key(key))
    }

    fn cursor<'a>(&'a self, _tx: &'a mut dyn Transaction, _write: bool) -> Result<Box<dyn Cursor + 'a>> {
        let table = self.lock();
        let keys: Vec<Vec<u8>> = table.records.keys().cloned().collect();
        drop(table);
        Ok(Box::new(MemoryCursor {
            table: self.table.clone(),
            keys,
            pos: None,
            current: None,
        }))
    }
}

struct MemoryCursor {
    table: Arc<Mutex<Table>>,
    keys: Vec<Vec<u8>>,
    pos: Option<usize>,
    current: Option<Vec<Vec<u8>>>,
}

impl MemoryCursor {
    fn load_current(&mut self) -> Result<()> {
        let idx = self.pos.ok_or_else(|| Error::not_found("cursor not positioned"))?;
        let key = self.keys.get(idx).ok_or_else(|| Error::not_found("cursor exhausted"))?;
        let table = self.table.lock().unwrap();
        self.current = table.records.get(key).cloned();
        Ok(())
    }

    fn current_key(&self) -> Result<&[u8]> {
        let idx = self.pos.ok_or_else(|| Error::not_found("cursor not positioned"))?;
        self.keys.get(idx).map(Vec::as_slice).ok_or_else(|| Error::not_found("cursor exhausted"))
    }
}

impl Cursor for MemoryCursor {
    fn seek(&mut self, key: &[u8]) -> Result<()> {
        match self.keys.iter().position(|k| k.as_slice() >= key) {
            Some(i) => {
                self.pos = Some(i);
                self.load_current()
            }
            None => Err(Error::not_found("seek past end of recmap")),
        }
    }

    fn next(&mut self) -> Result<()> {
        let next_pos = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        if next_pos >= self.keys.len() {
            return Err(Error::not_found("cursor exhausted"));
        }
        self.pos = Some(next_pos);
        self.load_current()
    }

    fn get(&self, field: usize) -> Result<&[u8]> {
        self.current
            .as_ref()
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found("cursor not positioned on a record"))
    }

    fn set(&mut self, field: usize, bytes: &[u8]) -> Result<()> {
        let key = self.current_key()?.to_vec();
        let mut table = self.table.lock().unwrap();
        let record = table.records.get_mut(&key).ok_or_else(|| Error::not_found("record was deleted"))?;
        if field >= record.len() {
            return Err(Error::invalid_argument("field index out of range"));
        }
        record[field] = bytes.to_vec();
        drop(table);
        self.load_current()
    }

    fn delete(&mut self) -> Result<()> {
        let key = self.current_key()?.to_vec();
        self.table.lock().unwrap().records.remove(&key);
        self.current = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct MemorySequence {
    counter: Arc<AtomicI64>,
}

impl Sequence for MemorySequence {
    fn next(&self, _tx: &mut dyn Transaction) -> Result<i64> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn delete(self: Box<Self>, _tx: &mut dyn Transaction) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_cursor_scan_visits_in_key_order() {
        let env = MemoryEnvironment::new();
        let mut tx = env.begin_tx(None).unwrap();
        let recmap = env
            .create_recmap("emps", "db", &[], &[0], tx.as_mut())
            .unwrap();
        recmap.insert(tx.as_mut(), b"b", &[b"B".to_vec()]).unwrap();
        recmap.insert(tx.as_mut(), b"a", &[b"A".to_vec()]).unwrap();

        let mut cursor = recmap.cursor(tx.as_mut(), false).unwrap();
        cursor.next().unwrap();
        assert_eq!(cursor.get(0).unwrap(), b"A");
        cursor.next().unwrap();
        assert_eq!(cursor.get(0).unwrap(), b"B");
        assert!(matches!(cursor.next(), Err(Error::NotFound(_))));
    }

    #[test]
    fn duplicate_insert_is_key_violation() {
        let env = MemoryEnvironment::new();
        let mut tx = env.begin_tx(None).unwrap();
        let recmap = env.create_recmap("t", "db", &[], &[0], tx.as_mut()).unwrap();
        recmap.insert(tx.as_mut(), b"k", &[b"v".to_vec()]).unwrap();
        let err = recmap.insert(tx.as_mut(), b"k", &[b"v2".to_vec()]).unwrap_err();
        assert!(matches!(err, Error::KeyViolation(_)));
    }

    #[test]
    fn sequence_advances_monotonically() {
        let env = MemoryEnvironment::new();
        let mut tx = env.begin_tx(None).unwrap();
        let seq = env.open_sequence("s", "db", tx.as_mut()).unwrap();
        assert_eq!(seq.next(tx.as_mut()).unwrap(), 1);
        assert_eq!(seq.next(tx.as_mut()).unwrap(), 2);
    }
}
