//! Backend throughput benchmarks
//!
//! Runs the harness scenarios against each backend:
//! - whole-blob loads
//! - prefix loads
//! - offset window loads
//! - save/remove churn
//!
//! Every measurement opens a fresh backend through the suite and closes it
//! afterwards.
//!
//! Run with: cargo bench --bench backend

use blobkit::harness::{Scenario, Suite};
use blobkit::{Backend, LocalBackend, MemoryBackend};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

fn bench_suite<B: Backend + 'static>(c: &mut Criterion, name: &str, suite: &Suite<B>) {
    let config = suite.config().clone();
    let mut group = c.benchmark_group(name);
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for scenario in Scenario::ALL {
        group.throughput(Throughput::Bytes(scenario.bytes_per_iteration(&config)));
        group.bench_function(BenchmarkId::from_parameter(scenario), |b| {
            b.iter_custom(|iters| {
                suite
                    .run(scenario, iters.max(1) as usize)
                    .unwrap_or_else(|e| panic!("{scenario} failed: {e}"))
                    .elapsed
            })
        });
    }

    group.finish();
}

fn bench_memory(c: &mut Criterion) {
    let suite = Suite::new(|| Ok(MemoryBackend::new()));
    bench_suite(c, "memory", &suite);
}

fn bench_local(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("repo");
    let suite = Suite::new(move || LocalBackend::open_or_create(&root));
    bench_suite(c, "local", &suite);
}

criterion_group!(benches, bench_memory, bench_local);
criterion_main!(benches);
