//! End-to-end tests over a full [`Database`](tdkernel::catalog::Database):
//! declare relvars, evaluate expressions against them, and propagate
//! inserts/deletes back through a view.

mod common;

use tdkernel::context::ExecutionContext;
use tdkernel::expr::Expr;
use tdkernel::query::{delete_view, eval_relation, insert_view, Catalog as _};
use tdkernel::value::{Tuple, Value};

use common::{fresh_db, seed_depts, seed_emps};

fn attr<'a>(t: &'a Tuple, name: &str) -> &'a Value {
    t.get(name).unwrap()
}

#[test]
fn where_keeps_only_matching_tuples() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let expr = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply(">", vec![Expr::var_ref("salary"), Expr::literal(Value::from_int(6000))])],
    );

    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    let names: Vec<i64> = rel.tuples().map(|t| attr(t, "empno").as_int().unwrap()).collect();
    assert_eq!(names, vec![3]);
}

#[test]
fn project_drops_attributes_and_deduplicates() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let expr = Expr::apply("project", vec![Expr::table_ref("emps"), Expr::var_ref("deptno")]);
    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    let mut deptnos: Vec<i64> = rel.tuples().map(|t| attr(t, "deptno").as_int().unwrap()).collect();
    deptnos.sort_unstable();
    assert_eq!(deptnos, vec![10, 20]);
}

#[test]
fn join_matches_on_common_attribute_names() {
    let db = fresh_db();
    seed_emps(&db);
    seed_depts(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let expr = Expr::apply("join", vec![Expr::table_ref("emps"), Expr::table_ref("depts")]);
    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    assert_eq!(rel.tuples().count(), 3);
    for t in rel.tuples() {
        let expected = if attr(t, "deptno").as_int().unwrap() == 10 { "accounting" } else { "sales" };
        assert_eq!(attr(t, "dname").as_str().unwrap(), expected);
    }
}

#[test]
fn union_requires_identical_headings_and_deduplicates() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let high_earners = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply(">", vec![Expr::var_ref("salary"), Expr::literal(Value::from_int(5900))])],
    );
    let expr = Expr::apply("union", vec![Expr::table_ref("emps"), high_earners]);
    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    assert_eq!(rel.tuples().count(), 3, "union with a subset of its own rows must not duplicate them");
}

#[test]
fn minus_removes_matching_tuples() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let dept_10 = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply("=", vec![Expr::var_ref("deptno"), Expr::literal(Value::from_int(10))])],
    );
    let expr = Expr::apply("minus", vec![Expr::table_ref("emps"), dept_10]);
    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    let names: Vec<i64> = rel.tuples().map(|t| attr(t, "empno").as_int().unwrap()).collect();
    assert_eq!(names, vec![3]);
}

#[test]
fn extend_adds_a_computed_attribute() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let expr = Expr::apply(
        "extend",
        vec![
            Expr::table_ref("emps"),
            Expr::apply("*", vec![Expr::var_ref("salary"), Expr::literal(Value::from_int(12))]),
            Expr::var_ref("annual_salary"),
        ],
    );
    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    for t in rel.tuples() {
        let monthly = attr(t, "salary").as_int().unwrap();
        let annual = attr(t, "annual_salary").as_int().unwrap();
        assert_eq!(annual, monthly * 12);
    }
}

#[test]
fn extend_over_an_empty_relation_still_types_the_added_attribute() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let none_match = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply(">", vec![Expr::var_ref("salary"), Expr::literal(Value::from_int(1_000_000))])],
    );
    let expr = Expr::apply(
        "extend",
        vec![
            none_match,
            Expr::apply("*", vec![Expr::var_ref("salary"), Expr::literal(Value::from_int(12))]),
            Expr::var_ref("annual_salary"),
        ],
    );

    let rel = eval_relation(&expr, &catalog, &mut ctx).unwrap();
    assert_eq!(rel.tuples().count(), 0, "the source relation has no matching tuples");

    let heading = tdkernel::query::heading_attrs(rel.heading(), &catalog).unwrap();
    let names: Vec<&str> = heading.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"annual_salary"), "extend must add the attribute to the heading even with zero source tuples");
    assert!(names.contains(&"empno"), "extend must keep the original attributes in the heading even with zero source tuples");
}

#[test]
fn insert_view_through_where_checks_the_predicate() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let high_earners = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply(">", vec![Expr::var_ref("salary"), Expr::literal(Value::from_int(6000))])],
    );

    let mut good = Tuple::new();
    good.set("empno", Value::from_int(4));
    good.set("ename", Value::from_string("dave"));
    good.set("deptno", Value::from_int(20));
    good.set("salary", Value::from_int(9000));
    insert_view(&high_earners, &good, &catalog, &mut ctx).unwrap();
    assert_eq!(catalog.scan_table("emps").unwrap().len(), 4);

    let mut bad = Tuple::new();
    bad.set("empno", Value::from_int(5));
    bad.set("ename", Value::from_string("erin"));
    bad.set("deptno", Value::from_int(20));
    bad.set("salary", Value::from_int(100));
    assert!(insert_view(&high_earners, &bad, &catalog, &mut ctx).is_err());
    assert_eq!(catalog.scan_table("emps").unwrap().len(), 4);
}

#[test]
fn delete_view_through_where_only_removes_matching_rows() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let dept_10 = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply("=", vec![Expr::var_ref("deptno"), Expr::literal(Value::from_int(10))])],
    );

    let mut victim = Tuple::new();
    victim.set("empno", Value::from_int(1));
    victim.set("ename", Value::from_string("alice"));
    victim.set("deptno", Value::from_int(10));
    victim.set("salary", Value::from_int(6000));
    delete_view(&dept_10, &victim, &catalog, &mut ctx).unwrap();

    let remaining: Vec<i64> = catalog.scan_table("emps").unwrap().iter().map(|t| attr(t, "empno").as_int().unwrap()).collect();
    assert!(!remaining.contains(&1));
    assert_eq!(remaining.len(), 2);
}

#[test]
fn insert_through_a_minus_view_is_rejected() {
    let db = fresh_db();
    seed_emps(&db);
    let catalog = db.catalog();
    let mut ctx = ExecutionContext::new();

    let dept_10 = Expr::apply(
        "where",
        vec![Expr::table_ref("emps"), Expr::apply("=", vec![Expr::var_ref("deptno"), Expr::literal(Value::from_int(10))])],
    );
    let view = Expr::apply("minus", vec![Expr::table_ref("emps"), dept_10]);

    let mut t = Tuple::new();
    t.set("empno", Value::from_int(99));
    t.set("ename", Value::from_string("zed"));
    t.set("deptno", Value::from_int(20));
    t.set("salary", Value::from_int(1));
    assert!(insert_view(&view, &t, &catalog, &mut ctx).is_err());
}
