//! Shared setup for the end-to-end relational tests: a fresh in-memory
//! [`Database`] with a couple of declared relvars, ready for `eval_relation`/
//! `insert_view`/`delete_view` calls against it.

use tdkernel::catalog::Database;
use tdkernel::config::EngineConfig;
use tdkernel::query::Catalog as _;
use tdkernel::record::memory::MemoryEnvironment;
use tdkernel::types::{TupleAttr, TypeHandle};
use tdkernel::value::{Tuple, Value};

pub fn fresh_db() -> Database {
    Database::new(Box::new(MemoryEnvironment::new()), EngineConfig::default())
}

/// Declares an `emps(empno, ename, deptno, salary)` relvar keyed on `empno`
/// and loads it with a small, fixed roster.
pub fn seed_emps(db: &Database) -> TypeHandle {
    let int = db.types().integer();
    let string = db.types().string();
    let heading = db
        .define_tuple_type(vec![
            TupleAttr { name: Some("empno".into()), typ: int },
            TupleAttr { name: Some("ename".into()), typ: string },
            TupleAttr { name: Some("deptno".into()), typ: int },
            TupleAttr { name: Some("salary".into()), typ: int },
        ])
        .unwrap();
    db.create_table("emps", heading, vec![vec!["empno".to_string()]]).unwrap();

    let catalog = db.catalog();
    for (empno, ename, deptno, salary) in [
        (1, "alice", 10, 6000),
        (2, "bob", 10, 5500),
        (3, "carol", 20, 7000),
    ] {
        let mut t = Tuple::new();
        t.set("empno", Value::from_int(empno));
        t.set("ename", Value::from_string(ename));
        t.set("deptno", Value::from_int(deptno));
        t.set("salary", Value::from_int(salary));
        catalog.insert_tuple("emps", &t).unwrap();
    }
    heading
}

/// Declares a `depts(deptno, dname)` relvar keyed on `deptno`.
pub fn seed_depts(db: &Database) -> TypeHandle {
    let int = db.types().integer();
    let string = db.types().string();
    let heading = db
        .define_tuple_type(vec![
            TupleAttr { name: Some("deptno".into()), typ: int },
            TupleAttr { name: Some("dname".into()), typ: string },
        ])
        .unwrap();
    db.create_table("depts", heading, vec![vec!["deptno".to_string()]]).unwrap();

    let catalog = db.catalog();
    for (deptno, dname) in [(10, "accounting"), (20, "sales")] {
        let mut t = Tuple::new();
        t.set("deptno", Value::from_int(deptno));
        t.set("dname", Value::from_string(dname));
        catalog.insert_tuple("depts", &t).unwrap();
    }
    heading
}
