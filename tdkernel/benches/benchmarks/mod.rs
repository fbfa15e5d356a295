//! Shared setup for the kernel benchmarks: an in-memory [`Database`] seeded
//! with a base relvar of a configurable size.

use tdkernel::catalog::Database;
use tdkernel::config::EngineConfig;
use tdkernel::record::memory::MemoryEnvironment;
use tdkernel::types::{TupleAttr, TypeHandle};
use tdkernel::value::{Tuple, Value};

pub mod eval;
pub mod tclose;

pub(super) fn seeded_db(rows: i64) -> (Database, TypeHandle) {
    let db = Database::new(Box::new(MemoryEnvironment::new()), EngineConfig::default());
    let int = db.types().integer();
    let string = db.types().string();
    let heading = db
        .define_tuple_type(vec![
            TupleAttr { name: Some("id".into()), typ: int },
            TupleAttr { name: Some("name".into()), typ: string },
            TupleAttr { name: Some("group_id".into()), typ: int },
        ])
        .unwrap();
    db.create_table("widgets", heading, vec![vec!["id".to_string()]]).unwrap();

    use tdkernel::query::Catalog as _;
    let catalog = db.catalog();
    for id in 0..rows {
        let mut t = Tuple::new();
        t.set("id", Value::from_int(id));
        t.set("name", Value::from_string(format!("widget-{}", id)));
        t.set("group_id", Value::from_int(id % 8));
        catalog.insert_tuple("widgets", &t).unwrap();
    }
    (db, heading)
}
