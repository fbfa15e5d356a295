//! The virtual-table query engine (§4.6): turns an expression rooted at one of
//! the algebraic operators into tuples, either by opening a lazy [`QResult`]
//! cursor over the result or by asking for the whole result as a
//! [`MaterializedRelation`] up front.
//!
//! Base (persistent) tables are read through [`Catalog::scan_table`] -- a full
//! scan of the backing recmap decoded into tuples -- and then combined
//! functionally the same way a virtual table would be. This keeps every
//! operator's semantics (heading rules, duplicate elimination, update
//! propagation) expressed once, in one place, rather than duplicated between a
//! "base table" code path and a "derived table" code path.

mod eval;
mod planner;
mod tclose;
mod update;

pub use eval::{eval_relation, eval_scalar};
pub use planner::plan_where;
pub use update::{delete_view, insert_view, update_view};

use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::error::Error;
use crate::expr::{Expr, TypeContext};
use crate::operator::OperatorRegistry;
use crate::types::{TupleAttr, TypeHandle};
use crate::value::{CandidateKey, Tuple, Value};
use crate::Result;

/// The execution environment a query evaluates against: type resolution
/// (inherited from [`TypeContext`]), the operator registry, table storage, and
/// local variable lookup.
///
/// `arena_new_tuple_type`/`arena_new_relation_type_from_heading` give the
/// query engine a way to register the anonymous composite types its operators
/// construct (a `project`'s narrower heading, a `group`'s nested relation
/// type, ...) without requiring every evaluation function to take a mutable
/// borrow of the whole catalog.
pub trait Catalog: TypeContext {
    /// The operator registry used to resolve and invoke operator applications.
    fn operators(&self) -> &OperatorRegistry;
    /// The candidate keys declared for the named table.
    fn table_keys(&self, name: &str) -> Result<Vec<CandidateKey>>;
    /// Reads every tuple currently stored for the named (persistent) table.
    fn scan_table(&self, name: &str) -> Result<Vec<Tuple>>;
    /// Inserts a tuple into the named (persistent) table.
    fn insert_tuple(&self, name: &str, tuple: &Tuple) -> Result<()>;
    /// Deletes every stored tuple of the named table equal to `tuple`.
    fn delete_tuple(&self, name: &str, tuple: &Tuple) -> Result<()>;
    /// The current value of a local (non-table) variable.
    fn local_var(&self, name: &str) -> Result<Value>;
    /// Registers a new anonymous tuple type.
    fn arena_new_tuple_type(&self, attrs: Vec<TupleAttr>) -> Result<TypeHandle>;
    /// Registers a new anonymous relation type over an existing heading.
    fn arena_new_relation_type_from_heading(&self, heading: TypeHandle) -> TypeHandle;
    /// The kernel-level tunables in effect for this session (§4.3).
    fn config(&self) -> EngineConfig;
}

/// A stateful cursor over a (possibly virtual) relation's tuples (§4.6.2).
///
/// `next` raises [`Error::not_found`] once the sequence is exhausted; that is
/// the ordinary end-of-iteration signal, not a fault, and an iterator opened
/// on an empty relation raises it on the very first call.
pub trait QResult {
    /// Advances to and returns the next tuple.
    fn next(&mut self) -> Result<Tuple>;
    /// Releases any resources the cursor holds. Idempotent.
    fn close(&mut self);
}

/// A [`QResult`] over an already-materialized tuple vector.
pub struct MaterializedQResult {
    tuples: Vec<Tuple>,
    pos: usize,
}

impl MaterializedQResult {
    /// Wraps `tuples` for sequential iteration.
    pub fn new(tuples: Vec<Tuple>) -> Self {
        Self { tuples, pos: 0 }
    }
}

impl QResult for MaterializedQResult {
    fn next(&mut self) -> Result<Tuple> {
        let tuple = self.tuples.get(self.pos).cloned().ok_or_else(|| Error::not_found("end of relation"))?;
        self.pos += 1;
        Ok(tuple)
    }

    fn close(&mut self) {
        self.pos = self.tuples.len();
    }
}

impl Drop for MaterializedQResult {
    fn drop(&mut self) {
        self.close();
    }
}

/// `open(expr, catalog)`: evaluates `expr` as a relation and wraps the result
/// in a [`QResult`] cursor (§4.6.2).
pub fn open(expr: &Expr, catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<Box<dyn QResult>> {
    let relation = eval_relation(expr, catalog, ctx)?;
    Ok(Box::new(MaterializedQResult::new(relation.tuples().cloned().collect())))
}

/// The heading (attribute-name, type) pairs of a relation type, in declared order.
pub fn heading_attrs(heading: TypeHandle, catalog: &dyn Catalog) -> Result<Vec<(String, TypeHandle)>> {
    use crate::types::TypeKind;
    match catalog.arena().get(heading) {
        TypeKind::Tuple(t) => Ok(t
            .attrs
            .iter()
            .map(|a| (a.name.clone().unwrap_or_default(), a.typ))
            .collect()),
        _ => Err(Error::type_mismatch("expected a tuple (heading) type")),
    }
}
