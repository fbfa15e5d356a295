//! Relation values: either a materialized bag of tuples keyed by candidate keys,
//! or a virtual table defined by an expression (§3.1, §4.6).

use std::sync::Arc;

use crate::error::Error;
use crate::expr::Expr;
use crate::types::TypeHandle;
use crate::value::Tuple;
use crate::Result;

/// A candidate key: a non-empty, heading-subset attribute-name set.
pub type CandidateKey = Vec<String>;

/// An in-memory bag of tuples with candidate-key enforcement.
///
/// Used for relation literals, the `relation{...}` constructor, and as the
/// scratch buffer materialized by `tclose` and by duplicate-eliminating
/// `project` iterators (§4.6.2, §4.6.3).
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRelation {
    heading: TypeHandle,
    keys: Vec<CandidateKey>,
    tuples: Vec<Tuple>,
}

impl MaterializedRelation {
    /// Creates an empty relation over `heading` with the given candidate keys.
    /// Synthesizes an all-attribute key if `keys` is empty.
    pub fn new(heading: TypeHandle, mut keys: Vec<CandidateKey>, all_attrs: Vec<String>) -> Self {
        if keys.is_empty() {
            keys.push(all_attrs);
        }
        Self {
            heading,
            keys,
            tuples: Vec::new(),
        }
    }

    /// The relation's heading type.
    pub fn heading(&self) -> TypeHandle {
        self.heading
    }

    /// The relation's candidate keys.
    pub fn keys(&self) -> &[CandidateKey] {
        &self.keys
    }

    /// Number of tuples currently in the relation.
    pub fn cardinality(&self) -> usize {
        self.tuples.len()
    }

    /// Iterates over the tuples currently in the relation.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// True iff some tuple in the relation is structurally equal to `tuple`.
    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.tuples.iter().any(|t| t == tuple)
    }

    /// Inserts `tuple`, raising [`Error::KeyViolation`] if any candidate key
    /// collides with an existing tuple, and [`Error::ElementExists`] if the
    /// tuple is already present verbatim.
    pub fn insert(&mut self, tuple: Tuple) -> Result<()> {
        if self.contains(&tuple) {
            return Err(Error::ElementExists("tuple already present".to_string()));
        }
        for key in &self.keys {
            if self.tuples.iter().any(|t| t.agrees_on(&tuple, key)) {
                return Err(Error::key_violation(format!("key violation on {{{}}}", key.join(", "))));
            }
        }
        self.tuples.push(tuple);
        Ok(())
    }

    /// Inserts `tuple` only if an equal tuple is not already present, silently
    /// ignoring [`Error::ElementExists`]. Used by `tclose`'s insertion step,
    /// which treats re-deriving an already-known pair as a no-op rather than a
    /// fault (`tclose_insert`'s handling of `RDB_ELEMENT_EXISTS_ERROR`).
    pub fn insert_if_new(&mut self, tuple: Tuple) -> Result<bool> {
        match self.insert(tuple) {
            Ok(()) => Ok(true),
            Err(Error::ElementExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes every tuple for which `pred` returns true. Returns the count removed.
    pub fn delete_where(&mut self, pred: impl Fn(&Tuple) -> bool) -> usize {
        let before = self.tuples.len();
        self.tuples.retain(|t| !pred(t));
        before - self.tuples.len()
    }
}

/// A relation value: a materialized tuple bag, or a virtual table defined by an
/// expression (the expression is reference-counted, not owned uniquely, so
/// duplicating a relation value that wraps a view is cheap).
#[derive(Debug, Clone)]
pub enum RelationValue {
    /// A materialized (in-memory) relation.
    Materialized(MaterializedRelation),
    /// A virtual table: the relation is defined by this expression and has no
    /// tuples of its own.
    Virtual(Arc<Expr>),
}

impl PartialEq for RelationValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RelationValue::Materialized(a), RelationValue::Materialized(b)) => a == b,
            (RelationValue::Virtual(a), RelationValue::Virtual(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
