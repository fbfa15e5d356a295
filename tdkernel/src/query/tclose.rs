//! The `tclose` (transitive closure) operator (§4.6.3).
//!
//! Only defined over a binary relation whose two attributes share a type.
//! The iterator first yields every tuple of the input, then computes a
//! separate *buf* relation of newly-derived tuples: each round extends
//! first against the input, then against *buf*, in that order, inserting
//! a bridged pair into *buf* only if it isn't already one of the input's
//! own tuples. Rounds repeat until a full round inserts nothing.

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::expr::Expr;
use crate::query::heading_attrs;
use crate::query::Catalog;
use crate::value::{MaterializedRelation, Tuple};
use crate::Result;

pub fn eval_tclose(args: &[Expr], catalog: &dyn Catalog, ctx: &mut ExecutionContext) -> Result<MaterializedRelation> {
    let source = super::eval::eval_relation(&args[0], catalog, ctx)?;
    let attrs = heading_attrs(source.heading(), catalog)?;
    if attrs.len() != 2 {
        return Err(Error::type_mismatch("tclose requires a binary relation"));
    }
    let (attr1, typ1) = &attrs[0];
    let (attr2, typ2) = &attrs[1];
    if !catalog.arena().equals(*typ1, *typ2) {
        return Err(Error::type_mismatch("tclose requires both attributes to share a type"));
    }
    let attr1 = attr1.clone();
    let attr2 = attr2.clone();
    let round_limit = catalog.config().tclose_round_limit;

    let attr_names = vec![attr1.clone(), attr2.clone()];
    let mut buf = MaterializedRelation::new(source.heading(), source.keys().to_vec(), attr_names.clone());

    let mut round_count = 0usize;
    loop {
        if let Some(limit) = round_limit {
            if round_count >= limit {
                return Err(Error::NotSupported(format!("tclose exceeded the configured round limit of {}", limit)));
            }
        }
        round_count += 1;
        let buf_snapshot: Vec<Tuple> = buf.tuples().cloned().collect();
        let mut inserted = false;

        // Phase 1: extend against the input.
        for t in source.tuples() {
            if extend_one(t, &attr1, &attr2, &source, &buf_snapshot, &mut buf)? {
                inserted = true;
            }
        }
        // Phase 2: extend against buf, in that order.
        for t in &buf_snapshot {
            if extend_one(t, &attr1, &attr2, &source, &buf_snapshot, &mut buf)? {
                inserted = true;
            }
        }

        if !inserted {
            break;
        }
    }

    let mut out = MaterializedRelation::new(source.heading(), source.keys().to_vec(), attr_names);
    for t in source.tuples() {
        out.insert_if_new(t.clone())?;
    }
    for t in buf.tuples() {
        out.insert_if_new(t.clone())?;
    }
    Ok(out)
}

/// Finds every tuple in the input or in `buf_snapshot` whose first attribute
/// equals `t`'s second attribute, and inserts the bridged pair into `buf`
/// unless it's already one of the input's own tuples. Returns whether any
/// insertion actually occurred.
fn extend_one(
    t: &Tuple,
    attr1: &str,
    attr2: &str,
    source: &MaterializedRelation,
    buf_snapshot: &[Tuple],
    buf: &mut MaterializedRelation,
) -> Result<bool> {
    let a = t.get(attr1)?.clone();
    let b = t.get(attr2)?.clone();
    let mut inserted = false;
    for step in source.tuples().chain(buf_snapshot.iter()) {
        if step.get(attr1)? != &b {
            continue;
        }
        let x = step.get(attr2)?.clone();
        let mut bridged = Tuple::new();
        bridged.set(attr1, a.clone());
        bridged.set(attr2, x);
        if source.contains(&bridged) {
            continue;
        }
        if buf.insert_if_new(bridged)? {
            inserted = true;
        }
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TypeContext;
    use crate::operator::OperatorRegistry;
    use crate::types::{TupleAttr, TypeArena, TypeHandle};
    use crate::value::{CandidateKey, Value};

    /// Only `tclose` itself is under test here, so the catalog needs no
    /// mutable arena access: `equals()` (read-only) is all `eval_tclose` calls.
    struct FixtureCatalog {
        arena: TypeArena,
        operators: OperatorRegistry,
    }

    impl TypeContext for FixtureCatalog {
        fn resolve_operator_type(&self, _name: &str, _arg_types: &[TypeHandle]) -> Result<TypeHandle> {
            Err(Error::operator_not_found("n/a"))
        }
        fn table_type(&self, _name: &str) -> Result<TypeHandle> {
            Err(Error::not_found("n/a"))
        }
        fn var_type(&self, _name: &str) -> Result<TypeHandle> {
            Err(Error::not_found("n/a"))
        }
        fn arena(&self) -> &TypeArena {
            &self.arena
        }
    }

    impl Catalog for FixtureCatalog {
        fn operators(&self) -> &OperatorRegistry {
            &self.operators
        }
        fn table_keys(&self, _name: &str) -> Result<Vec<CandidateKey>> {
            Err(Error::not_found("n/a"))
        }
        fn scan_table(&self, _name: &str) -> Result<Vec<Tuple>> {
            Err(Error::not_found("n/a"))
        }
        fn insert_tuple(&self, _name: &str, _tuple: &Tuple) -> Result<()> {
            Err(Error::not_found("n/a"))
        }
        fn delete_tuple(&self, _name: &str, _tuple: &Tuple) -> Result<()> {
            Err(Error::not_found("n/a"))
        }
        fn local_var(&self, _name: &str) -> Result<Value> {
            Err(Error::not_found("n/a"))
        }
        fn arena_new_tuple_type(&self, _attrs: Vec<TupleAttr>) -> Result<TypeHandle> {
            unreachable!("tclose evaluation never registers a new type")
        }
        fn arena_new_relation_type_from_heading(&self, _heading: TypeHandle) -> TypeHandle {
            unreachable!("tclose evaluation never registers a new type")
        }
        fn config(&self) -> crate::config::EngineConfig {
            crate::config::EngineConfig::default()
        }
    }

    #[test]
    fn closes_a_chain_transitively() {
        let mut arena = TypeArena::with_builtins();
        let int = arena.integer();
        let heading = arena
            .new_tuple_type(vec![
                TupleAttr { name: Some("from".into()), typ: int },
                TupleAttr { name: Some("to".into()), typ: int },
            ])
            .unwrap();

        let catalog = FixtureCatalog {
            arena,
            operators: OperatorRegistry::new(),
        };

        let rows = [(1i64, 2i64), (2, 3), (3, 4)];
        let mut source = MaterializedRelation::new(heading, vec![vec!["from".into(), "to".into()]], vec!["from".into(), "to".into()]);
        for (from, to) in &rows {
            let mut t = Tuple::new();
            t.set("from", Value::from_int(*from));
            t.set("to", Value::from_int(*to));
            source.insert(t).unwrap();
        }

        let arg = Expr::literal(Value::from_relation(crate::value::RelationValue::Materialized(source)));
        let mut ctx = ExecutionContext::new();
        let closed = eval_tclose(std::slice::from_ref(&arg), &catalog, &mut ctx).unwrap();

        assert_eq!(closed.cardinality(), 6);
        let has = |from: i64, to: i64| {
            closed.tuples().any(|t| t.get("from").unwrap().as_int().unwrap() == from && t.get("to").unwrap().as_int().unwrap() == to)
        };
        assert!(has(1, 4));
        assert!(has(2, 4));
    }
}
