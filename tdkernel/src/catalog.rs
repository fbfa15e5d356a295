//! A reference [`Catalog`] implementation: the system tables that track
//! declared relvars and their candidate keys, and the glue that turns
//! [`Tuple`] reads/writes into calls against a [`record::Environment`] (§5,
//! §6). Storage backends themselves remain out of scope (§1 Non-goals) --
//! this module only ever talks to the record layer through its abstract
//! trait, the same way the query engine only ever talks to types through
//! [`TypeContext`] and operators through [`OperatorRegistry`].
//!
//! The system relations `SYS_TABLES` etc. that an implementation like this
//! would normally expose as ordinary queryable relvars (`rtables`, `keys`,
//! ...) are kept here as a plain in-memory map rather than relvars of their
//! own backed by the same record layer -- see `DESIGN.md` for why that line
//! was drawn where it was for this kernel.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard};

use crate::config::EngineConfig;
use crate::error::Error;
use crate::expr::TypeContext;
use crate::operator::OperatorRegistry;
use crate::record::{Cursor as _, Environment, FieldSpec, RecMap};
use crate::registry::Globals;
use crate::types::{ReprLen, TupleAttr, TypeArena, TypeHandle, TypeKind};
use crate::value::{CandidateKey, DateTime, Tuple, Value, ValueKind};
use crate::Result;

/// A declared relvar: its heading and candidate keys, plus the open recmap
/// backing its tuples.
struct TableDef {
    heading: TypeHandle,
    keys: Vec<CandidateKey>,
    recmap: Box<dyn RecMap>,
}

/// A database: the shared type/operator [`Globals`], a record-layer
/// [`Environment`], the declared-relvar system catalog, and a session's
/// local (non-table) variables.
pub struct Database {
    env: Box<dyn Environment>,
    globals: Globals,
    config: EngineConfig,
    tables: RwLock<HashMap<String, TableDef>>,
    locals: RwLock<HashMap<String, Value>>,
}

impl Database {
    /// Opens a fresh database over `env`, installing the built-in scalar
    /// types and operators (§4.4, §5).
    pub fn new(env: Box<dyn Environment>, config: EngineConfig) -> Self {
        let globals = Globals::new();
        crate::builtins::register_all(&mut globals.operators_mut(), &globals.types());
        Self {
            env,
            globals,
            config,
            tables: RwLock::new(HashMap::new()),
            locals: RwLock::new(HashMap::new()),
        }
    }

    /// Read access to the shared type arena.
    pub fn types(&self) -> std::sync::RwLockReadGuard<'_, TypeArena> {
        self.globals.types()
    }

    /// Registers a new named tuple type, for use as a relvar heading passed
    /// to [`Database::create_table`]. Unlike the anonymous tuple types a
    /// query derives mid-evaluation (§4.6.1), a relvar's heading is declared
    /// once, up front, and shared by every [`DbCatalog`] opened afterwards.
    pub fn define_tuple_type(&self, attrs: Vec<TupleAttr>) -> Result<TypeHandle> {
        self.globals.types_mut().new_tuple_type(attrs)
    }

    /// Declares a new base relvar with the given heading and candidate keys.
    /// An empty key list is rejected -- every relvar needs at least one
    /// candidate key, synthesized by the caller from the full heading if the
    /// user supplied none (§4.6.1).
    pub fn create_table(&self, name: &str, heading: TypeHandle, keys: Vec<CandidateKey>) -> Result<()> {
        if keys.is_empty() {
            return Err(Error::invalid_argument("a relvar requires at least one candidate key"));
        }
        let mut tables = self.tables.write().expect("catalog lock poisoned");
        if tables.contains_key(name) {
            return Err(Error::ElementExists(format!("relvar {} already exists", name)));
        }

        let attrs = match self.globals.types().get(heading) {
            TypeKind::Tuple(t) => t.attrs.clone(),
            _ => return Err(Error::type_mismatch("a relvar's heading must be a tuple type")),
        };
        let fields: Vec<FieldSpec> = attrs
            .iter()
            .map(|a| FieldSpec {
                name: a.name.clone().unwrap_or_default(),
                len: ReprLen::Variable,
            })
            .collect();

        let mut tx = self.env.begin_tx(None)?;
        let recmap = self.env.create_recmap(name, "db", &fields, &[0], tx.as_mut())?;
        tx.commit()?;
        tracing::info!(relvar = name, attrs = attrs.len(), "committed CREATE relvar");

        tables.insert(
            name.to_string(),
            TableDef {
                heading,
                keys,
                recmap,
            },
        );
        Ok(())
    }

    /// Sets a local (non-table) variable's value, for `local_var` lookups
    /// made while evaluating expressions that reference it.
    pub fn set_local_var(&self, name: impl Into<String>, value: Value) {
        self.locals.write().expect("locals lock poisoned").insert(name.into(), value);
    }

    fn table_def<'a>(&'a self, name: &str, tables: &'a HashMap<String, TableDef>) -> Result<&'a TableDef> {
        tables.get(name).ok_or_else(|| Error::ResourceNotFound(format!("no such relvar: {}", name)))
    }

    /// Opens an evaluation-scoped [`Catalog`]/[`TypeContext`] view over this
    /// database. One `DbCatalog` is expected per statement: it clones the
    /// shared arena out from behind its lock once, up front, and grows that
    /// private copy as `project`/`extend`/`group` register anonymous tuple
    /// and relation types while the query evaluates. Anonymous types born
    /// this way are scoped to the statement that derived them and never need
    /// to be written back -- see `DESIGN.md`.
    pub fn catalog(&self) -> DbCatalog<'_> {
        DbCatalog {
            db: self,
            types: RefCell::new(self.globals.types().clone()),
            arena_cache: Cell::new(None),
            operators: self.globals.operators(),
        }
    }
}

/// The [`Catalog`](crate::query::Catalog)/[`TypeContext`] a single statement
/// evaluates against.
///
/// `TypeContext::arena` and `Catalog::arena_new_tuple_type` both take `&self`
/// (the query engine holds a `&dyn Catalog`, never `&mut`), so growing the
/// arena while also handing out `&TypeArena` needs some interior mutability.
/// `types` is a private `RefCell<TypeArena>` rather than a re-acquired lock
/// guard: mutating methods borrow it mutably and drop the borrow before
/// returning, same as any other `RefCell` use. Handing out a `&TypeArena`
/// from behind that cell is the one thing a `RefCell` can't do safely, so
/// `arena()` leaks a throwaway clone of the current contents (`Box::leak`,
/// no `unsafe`) and caches the leaked reference in `arena_cache` until the
/// next mutation invalidates it -- one leaked clone per generation of the
/// arena, not per call.
pub struct DbCatalog<'a> {
    db: &'a Database,
    types: RefCell<TypeArena>,
    arena_cache: Cell<Option<&'static TypeArena>>,
    operators: RwLockReadGuard<'a, OperatorRegistry>,
}

impl DbCatalog<'_> {
    fn heading_attrs(&self, def: &TableDef) -> Result<Vec<TupleAttr>> {
        match self.arena().get(def.heading) {
            TypeKind::Tuple(t) => Ok(t.attrs.clone()),
            _ => Err(Error::type_mismatch("relvar heading must be a tuple type")),
        }
    }
}

impl TypeContext for DbCatalog<'_> {
    fn resolve_operator_type(&self, name: &str, arg_types: &[TypeHandle]) -> Result<TypeHandle> {
        let entry = self.operators.resolve(name, arg_types, self.arena())?;
        entry.ret().ok_or_else(|| Error::type_mismatch(format!("operator {} has no declared return type", name)))
    }

    fn table_type(&self, name: &str) -> Result<TypeHandle> {
        let tables = self.db.tables.read().expect("catalog lock poisoned");
        let def = self.db.table_def(name, &tables)?;
        let handle = self.types.borrow_mut().new_relation_type_from_heading(def.heading);
        self.arena_cache.set(None);
        Ok(handle)
    }

    fn var_type(&self, name: &str) -> Result<TypeHandle> {
        let locals = self.db.locals.read().expect("locals lock poisoned");
        let v = locals.get(name).ok_or_else(|| Error::not_found(format!("no such variable: {}", name)))?;
        v.typ().ok_or_else(|| Error::type_mismatch(format!("variable {} carries no declared type", name)))
    }

    fn arena(&self) -> &TypeArena {
        if let Some(cached) = self.arena_cache.get() {
            return cached;
        }
        let leaked: &'static TypeArena = Box::leak(Box::new(self.types.borrow().clone()));
        self.arena_cache.set(Some(leaked));
        leaked
    }
}

impl crate::query::Catalog for DbCatalog<'_> {
    fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    fn table_keys(&self, name: &str) -> Result<Vec<CandidateKey>> {
        let tables = self.db.tables.read().expect("catalog lock poisoned");
        Ok(self.db.table_def(name, &tables)?.keys.clone())
    }

    fn scan_table(&self, name: &str) -> Result<Vec<Tuple>> {
        let tables = self.db.tables.read().expect("catalog lock poisoned");
        let def = self.db.table_def(name, &tables)?;
        let attrs = self.heading_attrs(def)?;

        let mut tx = self.db.env.begin_tx(None)?;
        let mut cursor = def.recmap.cursor(tx.as_mut(), false)?;
        let mut out = Vec::new();
        loop {
            match cursor.next() {
                Ok(()) => {
                    let mut t = Tuple::new();
                    for (i, attr) in attrs.iter().enumerate() {
                        let name = attr.name.clone().unwrap_or_default();
                        let bytes = cursor.get(i)?;
                        t.set(name, decode_value(bytes)?.with_type(attr.typ));
                    }
                    out.push(t);
                }
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(e),
            }
        }
        cursor.close()?;
        drop(tx); // read-only scan, nothing to commit
        Ok(out)
    }

    fn insert_tuple(&self, name: &str, tuple: &Tuple) -> Result<()> {
        let tables = self.db.tables.read().expect("catalog lock poisoned");
        let def = self.db.table_def(name, &tables)?;
        // Keyed on the relvar's first heading attribute only, not its full
        // declared candidate key -- see DESIGN.md.
        let attrs = self.heading_attrs(def)?;

        let key_attr = attrs.first().map(|a| a.name.clone().unwrap_or_default()).unwrap_or_default();
        let key_value = tuple.get(&key_attr)?;
        let key_bytes = encode_value(key_value)?;

        let fields: Vec<Vec<u8>> = attrs
            .iter()
            .map(|a| {
                let attr_name = a.name.clone().unwrap_or_default();
                encode_value(tuple.get(&attr_name)?)
            })
            .collect::<Result<_>>()?;

        let mut tx = self.db.env.begin_tx(None)?;
        def.recmap.insert(tx.as_mut(), &key_bytes, &fields)?;
        tx.commit()?;
        tracing::trace!(relvar = name, "inserted tuple");
        Ok(())
    }

    fn delete_tuple(&self, name: &str, tuple: &Tuple) -> Result<()> {
        let tables = self.db.tables.read().expect("catalog lock poisoned");
        let def = self.db.table_def(name, &tables)?;
        let attrs = self.heading_attrs(def)?;
        let key_attr = attrs.first().map(|a| a.name.clone().unwrap_or_default()).unwrap_or_default();
        let key_bytes = encode_value(tuple.get(&key_attr)?)?;

        let mut tx = self.db.env.begin_tx(None)?;
        def.recmap.delete_by_key(tx.as_mut(), &key_bytes)?;
        tx.commit()?;
        tracing::trace!(relvar = name, "deleted tuple");
        Ok(())
    }

    fn local_var(&self, name: &str) -> Result<Value> {
        let locals = self.db.locals.read().expect("locals lock poisoned");
        locals.get(name).cloned().ok_or_else(|| Error::not_found(format!("no such variable: {}", name)))
    }

    fn arena_new_tuple_type(&self, attrs: Vec<TupleAttr>) -> Result<TypeHandle> {
        let handle = self.types.borrow_mut().new_tuple_type(attrs)?;
        self.arena_cache.set(None);
        Ok(handle)
    }

    fn arena_new_relation_type_from_heading(&self, heading: TypeHandle) -> TypeHandle {
        let handle = self.types.borrow_mut().new_relation_type_from_heading(heading);
        self.arena_cache.set(None);
        handle
    }

    fn config(&self) -> EngineConfig {
        self.db.config
    }
}

/// A scalar-attribute encoding tag, prefixed onto each stored field so
/// decoding never needs the heading. Tuple/relation/array-valued attributes
/// are outside this adapter's scope (see the module doc comment).
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Tag {
    Bool = 0,
    Int = 1,
    Float = 2,
    DateTime = 3,
    ByteString = 4,
}

fn encode_value(v: &Value) -> Result<Vec<u8>> {
    let (tag, mut payload) = match v.kind() {
        ValueKind::Bool(b) => (Tag::Bool, vec![*b as u8]),
        ValueKind::Int(i) => (Tag::Int, i.to_be_bytes().to_vec()),
        ValueKind::Float(f) => (Tag::Float, f.to_be_bytes().to_vec()),
        ValueKind::DateTime(dt) => {
            let mut buf = Vec::with_capacity(9);
            buf.extend_from_slice(&dt.year.to_be_bytes());
            buf.extend_from_slice(&[dt.month, dt.day, dt.hour, dt.minute, dt.second]);
            (Tag::DateTime, buf)
        }
        ValueKind::ByteString(b) => (Tag::ByteString, b.clone()),
        other => {
            return Err(Error::NotSupported(format!(
                "storing a {:?}-valued attribute in a base relvar is not supported by this record-layer adapter",
                other
            )))
        }
    };
    let mut out = vec![tag as u8];
    out.append(&mut payload);
    Ok(out)
}

fn tag_from_byte(b: u8) -> Option<Tag> {
    match b {
        0 => Some(Tag::Bool),
        1 => Some(Tag::Int),
        2 => Some(Tag::Float),
        3 => Some(Tag::DateTime),
        4 => Some(Tag::ByteString),
        _ => None,
    }
}

fn decode_value(bytes: &[u8]) -> Result<Value> {
    let (tag, payload) = bytes.split_first().ok_or_else(|| Error::DataCorrupted("empty stored attribute".to_string()))?;
    match tag_from_byte(*tag) {
        Some(Tag::Bool) => Ok(Value::from_bool(payload.first().copied().unwrap_or(0) != 0)),
        Some(Tag::Int) => {
            let arr: [u8; 8] = payload.try_into().map_err(|_| Error::DataCorrupted("malformed integer field".to_string()))?;
            Ok(Value::from_int(i64::from_be_bytes(arr)))
        }
        Some(Tag::Float) => {
            let arr: [u8; 8] = payload.try_into().map_err(|_| Error::DataCorrupted("malformed float field".to_string()))?;
            Ok(Value::from_float(f64::from_be_bytes(arr)))
        }
        Some(Tag::DateTime) => {
            if payload.len() != 9 {
                return Err(Error::DataCorrupted("malformed datetime field".to_string()));
            }
            let year = i32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
            let dt = DateTime::new(year, payload[4], payload[5], payload[6], payload[7], payload[8])?;
            Ok(Value::from_datetime(dt))
        }
        Some(Tag::ByteString) => Ok(Value::from_binary(payload.to_vec())),
        None => Err(Error::DataCorrupted(format!("unknown stored attribute tag {}", tag))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Catalog as QueryCatalog;
    use crate::record::memory::MemoryEnvironment;
    use crate::types::TupleAttr;

    fn fresh_db() -> Database {
        Database::new(Box::new(MemoryEnvironment::new()), EngineConfig::default())
    }

    #[test]
    fn create_table_rejects_an_empty_key_list() {
        let db = fresh_db();
        let int = db.types().integer();
        let heading = db
            .globals
            .types_mut()
            .new_tuple_type(vec![TupleAttr { name: Some("n".into()), typ: int }])
            .unwrap();
        let err = db.create_table("t", heading, vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn insert_then_scan_round_trips_tuples() {
        let db = fresh_db();
        let int = db.types().integer();
        let heading = db
            .globals
            .types_mut()
            .new_tuple_type(vec![
                TupleAttr { name: Some("empno".into()), typ: int },
                TupleAttr { name: Some("salary".into()), typ: int },
            ])
            .unwrap();
        db.create_table("emps", heading, vec![vec!["empno".to_string()]]).unwrap();

        let mut t = Tuple::new();
        t.set("empno", Value::from_int(7));
        t.set("salary", Value::from_int(50000));
        let catalog = db.catalog();
        QueryCatalog::insert_tuple(&catalog, "emps", &t).unwrap();

        let rows = QueryCatalog::scan_table(&catalog, "emps").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("empno").unwrap().as_int().unwrap(), 7);
        assert_eq!(rows[0].get("salary").unwrap().as_int().unwrap(), 50000);
    }

    #[test]
    fn delete_removes_the_matching_row() {
        let db = fresh_db();
        let int = db.types().integer();
        let heading = db
            .globals
            .types_mut()
            .new_tuple_type(vec![TupleAttr { name: Some("empno".into()), typ: int }])
            .unwrap();
        db.create_table("emps", heading, vec![vec!["empno".to_string()]]).unwrap();

        let mut t = Tuple::new();
        t.set("empno", Value::from_int(1));
        let catalog = db.catalog();
        QueryCatalog::insert_tuple(&catalog, "emps", &t).unwrap();
        QueryCatalog::delete_tuple(&catalog, "emps", &t).unwrap();
        assert!(QueryCatalog::scan_table(&catalog, "emps").unwrap().is_empty());
    }
}
