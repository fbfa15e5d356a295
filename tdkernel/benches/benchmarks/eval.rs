//! Benchmarks for the core relational operators over a modest base relvar.

use criterion::{black_box, Criterion};

use tdkernel::context::ExecutionContext;
use tdkernel::expr::Expr;
use tdkernel::query::eval_relation;
use tdkernel::value::Value;

use super::seeded_db;

const ROWS: i64 = 10_000;

pub fn bench_eval(c: &mut Criterion) {
    let (db, _heading) = seeded_db(ROWS);
    let catalog = db.catalog();

    c.bench_function("where over 10k rows", |b| {
        let expr = Expr::apply("where", vec![Expr::table_ref("widgets"), Expr::apply("=", vec![Expr::var_ref("group_id"), Expr::literal(Value::from_int(3))])]);
        b.iter(|| {
            let mut ctx = ExecutionContext::new();
            black_box(eval_relation(&expr, &catalog, &mut ctx).unwrap());
        });
    });

    c.bench_function("project over 10k rows", |b| {
        let expr = Expr::apply("project", vec![Expr::table_ref("widgets"), Expr::var_ref("group_id")]);
        b.iter(|| {
            let mut ctx = ExecutionContext::new();
            black_box(eval_relation(&expr, &catalog, &mut ctx).unwrap());
        });
    });

    c.bench_function("self-join on group_id over 10k rows", |b| {
        let lhs = Expr::apply("project", vec![Expr::table_ref("widgets"), Expr::var_ref("group_id")]);
        let rhs = Expr::apply("project", vec![Expr::table_ref("widgets"), Expr::var_ref("group_id")]);
        let expr = Expr::apply("join", vec![lhs, rhs]);
        b.iter(|| {
            let mut ctx = ExecutionContext::new();
            black_box(eval_relation(&expr, &catalog, &mut ctx).unwrap());
        });
    });
}
