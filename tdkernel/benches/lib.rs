use criterion::{criterion_group, criterion_main};

use crate::benchmarks::eval::bench_eval;
use crate::benchmarks::tclose::bench_tclose;

mod benchmarks;

criterion_group!(benches, bench_eval, bench_tclose);
criterion_main!(benches);
