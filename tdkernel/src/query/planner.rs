//! Index planning (§4.6.4): annotates `where` nodes over a table reference
//! with `optinfo` bounds when the predicate is a conjunction of comparisons
//! against a prefix of one of the table's candidate keys.
//!
//! This engine evaluates every operator eagerly (`eval::eval_where` always
//! walks the whole materialized source), so `optinfo` does not yet drive an
//! index-positioned scan the way the source's qresult iterators do -- it is
//! computed and attached for a future index-aware scan to consume, and is
//! otherwise inert. See DESIGN.md for why that line wasn't crossed here.

use crate::expr::{Expr, ExprKind, OptInfo};
use crate::query::Catalog;
use crate::Result;

/// Walks `expr` and installs `optinfo` on every `where` node whose child is a
/// table reference and whose predicate bounds a prefix of one of that
/// table's candidate keys. A no-op if `index_planning` is disabled.
pub fn plan_where(expr: &mut Expr, catalog: &dyn Catalog) -> Result<()> {
    if !catalog.config().index_planning {
        return Ok(());
    }
    plan_node(expr, catalog)
}

fn plan_node(expr: &mut Expr, catalog: &dyn Catalog) -> Result<()> {
    let is_where = expr.is_op("where");
    if is_where {
        plan_where_node(expr, catalog)?;
    }
    if let Some(args) = expr.args_mut() {
        for arg in args.iter_mut() {
            plan_node(arg, catalog)?;
        }
    }
    Ok(())
}

fn plan_where_node(expr: &mut Expr, catalog: &dyn Catalog) -> Result<()> {
    let args = expr.args().expect("is_op(\"where\") implies an Apply node");
    if args.len() != 2 {
        return Ok(());
    }
    let table_name = match args[0].table_name() {
        Some(n) => n.to_string(),
        None => return Ok(()),
    };
    let keys = catalog.table_keys(&table_name)?;
    let conjuncts = flatten_conjuncts(&args[1]);

    let Some(info) = bind_against_keys(&keys, &conjuncts) else {
        tracing::trace!(table = %table_name, "no candidate-key prefix bound, full scan plan");
        return Ok(());
    };
    tracing::debug!(table = %table_name, all_eq = info.all_eq, bound = info.objpv.len(), "index-bound scan plan selected");
    expr.set_optinfo(info);
    Ok(())
}

/// One `attr OP literal` conjunct recognized by the planner.
struct Bound<'a> {
    attr: &'a str,
    op: &'a str,
    literal: &'a Expr,
}

fn flatten_conjuncts(expr: &Expr) -> Vec<Bound<'_>> {
    let mut out = Vec::new();
    collect_conjuncts(expr, &mut out);
    out
}

fn collect_conjuncts<'a>(expr: &'a Expr, out: &mut Vec<Bound<'a>>) {
    if expr.is_op("and") {
        if let Some(args) = expr.args() {
            for a in args {
                collect_conjuncts(a, out);
            }
        }
        return;
    }
    if let (Some(op), Some(args)) = (expr.op_name(), expr.args()) {
        if matches!(op, "=" | "<" | "<=" | ">" | ">=") && args.len() == 2 {
            if let Some(attr) = args[0].var_name() {
                if matches!(args[1].kind(), ExprKind::Literal(_)) {
                    out.push(Bound { attr, op, literal: &args[1] });
                    return;
                }
            }
        }
    }
}

/// Matches `conjuncts` against the leading attributes of whichever candidate
/// key they bind the longest prefix of, preferring full equality coverage.
fn bind_against_keys(keys: &[Vec<String>], conjuncts: &[Bound<'_>]) -> Option<OptInfo> {
    keys.iter().filter_map(|key| bind_against_key(key, conjuncts)).max_by_key(|info| info.objv.len())
}

fn bind_against_key(key: &[String], conjuncts: &[Bound<'_>]) -> Option<OptInfo> {
    let mut objv = Vec::new();
    let mut objpv = Vec::new();
    let mut asc = true;
    let mut stopexp = None;

    for attr in key {
        let Some(eq) = conjuncts.iter().find(|c| c.attr == attr && c.op == "=") else {
            if let Some(ord) = conjuncts.iter().find(|c| c.attr == attr && matches!(c.op, "<" | "<=" | ">" | ">=")) {
                asc = matches!(ord.op, "<" | "<=");
                stopexp = Some(Box::new(ord.literal.clone()));
            }
            break;
        };
        let ExprKind::Literal(v) = eq.literal.kind() else {
            unreachable!("flatten_conjuncts only emits literal bounds")
        };
        objv.push(v.clone());
        objpv.push(attr.clone());
    }

    if objv.is_empty() && stopexp.is_none() {
        return None;
    }
    let all_eq = objv.len() == key.len() && stopexp.is_none();
    Some(OptInfo { objv, objpv, asc, all_eq, stopexp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::operator::OperatorRegistry;
    use crate::types::{TupleAttr, TypeArena, TypeHandle};
    use crate::value::{CandidateKey, Tuple, Value};
    use crate::Result as KResult;

    struct FixtureCatalog {
        arena: TypeArena,
        operators: OperatorRegistry,
        keys: Vec<CandidateKey>,
        config: crate::config::EngineConfig,
    }

    impl crate::expr::TypeContext for FixtureCatalog {
        fn resolve_operator_type(&self, _name: &str, _arg_types: &[TypeHandle]) -> KResult<TypeHandle> {
            Err(Error::operator_not_found("n/a"))
        }
        fn table_type(&self, _name: &str) -> KResult<TypeHandle> {
            Err(Error::not_found("n/a"))
        }
        fn var_type(&self, _name: &str) -> KResult<TypeHandle> {
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
        fn table_keys(&self, _name: &str) -> KResult<Vec<CandidateKey>> {
            Ok(self.keys.clone())
        }
        fn scan_table(&self, _name: &str) -> KResult<Vec<Tuple>> {
            Ok(Vec::new())
        }
        fn insert_tuple(&self, _name: &str, _tuple: &Tuple) -> KResult<()> {
            Err(Error::not_found("n/a"))
        }
        fn delete_tuple(&self, _name: &str, _tuple: &Tuple) -> KResult<()> {
            Err(Error::not_found("n/a"))
        }
        fn local_var(&self, _name: &str) -> KResult<Value> {
            Err(Error::not_found("n/a"))
        }
        fn arena_new_tuple_type(&self, _attrs: Vec<TupleAttr>) -> KResult<TypeHandle> {
            unreachable!()
        }
        fn arena_new_relation_type_from_heading(&self, _heading: TypeHandle) -> TypeHandle {
            unreachable!()
        }
        fn config(&self) -> crate::config::EngineConfig {
            self.config
        }
    }

    fn catalog(keys: Vec<CandidateKey>) -> FixtureCatalog {
        FixtureCatalog {
            arena: TypeArena::with_builtins(),
            operators: OperatorRegistry::new(),
            keys,
            config: crate::config::EngineConfig::default(),
        }
    }

    #[test]
    fn equality_over_the_whole_key_sets_all_eq() {
        let cat = catalog(vec![vec!["empno".to_string()]]);
        let mut e = Expr::apply(
            "where",
            vec![Expr::table_ref("emps"), Expr::eq(Expr::var_ref("empno"), Expr::literal(Value::from_int(7)))],
        );
        plan_where(&mut e, &cat).unwrap();
        let info = e.optinfo().expect("optinfo should have been installed");
        assert!(info.all_eq);
        assert_eq!(info.objpv, vec!["empno".to_string()]);
        assert_eq!(info.objv, vec![Value::from_int(7)]);
    }

    #[test]
    fn ordered_bound_installs_a_stopexp() {
        let cat = catalog(vec![vec!["empno".to_string()]]);
        let mut e = Expr::apply(
            "where",
            vec![
                Expr::table_ref("emps"),
                Expr::apply("<", vec![Expr::var_ref("empno"), Expr::literal(Value::from_int(100))]),
            ],
        );
        plan_where(&mut e, &cat).unwrap();
        let info = e.optinfo().unwrap();
        assert!(!info.all_eq);
        assert!(info.asc);
        assert!(info.stopexp.is_some());
    }

    #[test]
    fn non_key_predicate_leaves_optinfo_unset() {
        let cat = catalog(vec![vec!["empno".to_string()]]);
        let mut e = Expr::apply(
            "where",
            vec![Expr::table_ref("emps"), Expr::eq(Expr::var_ref("salary"), Expr::literal(Value::from_int(1000)))],
        );
        plan_where(&mut e, &cat).unwrap();
        assert!(e.optinfo().is_none());
    }

    #[test]
    fn disabling_index_planning_is_a_no_op() {
        let mut cat = catalog(vec![vec!["empno".to_string()]]);
        cat.config.index_planning = false;
        let mut e = Expr::apply(
            "where",
            vec![Expr::table_ref("emps"), Expr::eq(Expr::var_ref("empno"), Expr::literal(Value::from_int(7)))],
        );
        plan_where(&mut e, &cat).unwrap();
        assert!(e.optinfo().is_none());
    }
}
