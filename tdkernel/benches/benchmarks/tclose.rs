//! Benchmark for `tclose` over a chain of edges, the operator's worst case
//! (every round bridges one more hop until the whole chain collapses).

use criterion::{black_box, Criterion};

use tdkernel::catalog::Database;
use tdkernel::config::EngineConfig;
use tdkernel::context::ExecutionContext;
use tdkernel::expr::Expr;
use tdkernel::query::{eval_relation, Catalog as _};
use tdkernel::record::memory::MemoryEnvironment;
use tdkernel::types::TupleAttr;
use tdkernel::value::{Tuple, Value};

const CHAIN_LEN: i64 = 200;

fn chain_db() -> Database {
    let db = Database::new(Box::new(MemoryEnvironment::new()), EngineConfig::default());
    let int = db.types().integer();
    let heading = db
        .define_tuple_type(vec![
            TupleAttr { name: Some("from_node".into()), typ: int },
            TupleAttr { name: Some("to_node".into()), typ: int },
        ])
        .unwrap();
    db.create_table("edges", heading, vec![vec!["from_node".to_string(), "to_node".to_string()]]).unwrap();

    let catalog = db.catalog();
    for i in 0..CHAIN_LEN {
        let mut t = Tuple::new();
        t.set("from_node", Value::from_int(i));
        t.set("to_node", Value::from_int(i + 1));
        catalog.insert_tuple("edges", &t).unwrap();
    }
    db
}

pub fn bench_tclose(c: &mut Criterion) {
    let db = chain_db();
    let catalog = db.catalog();
    let expr = Expr::apply("tclose", vec![Expr::table_ref("edges")]);

    c.bench_function("tclose over a 200-node chain", |b| {
        b.iter(|| {
            let mut ctx = ExecutionContext::new();
            black_box(eval_relation(&expr, &catalog, &mut ctx).unwrap());
        });
    });
}
