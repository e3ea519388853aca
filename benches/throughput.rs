//! Throughput Benchmark for credcache
//!
//! Measures the secret store under set/get workloads. The store sits
//! behind one mutex; these numbers show what the single-accessor design
//! costs, not what a sharded cache could do.

use credcache::store::SecretStore;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(SecretStore::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_unique", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let service = format!("svc:{}", i);
            store.set(&service, "hunter2", 600).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_overwrite", |b| {
        b.iter(|| {
            store.set("svc:shared", "hunter2", 600).unwrap();
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(SecretStore::new());

    // Pre-populate with data
    for i in 0..10_000 {
        let service = format!("svc:{}", i);
        let secret = format!("secret:{}", i);
        store.set(&service, &secret, 600).unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let service = format!("svc:{}", i % 10_000);
            black_box(store.get(&service)).ok();
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let service = format!("missing:{}", i);
            black_box(store.get(&service)).ok();
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get);
criterion_main!(benches);
