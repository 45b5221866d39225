//! Index benchmarks across the three variants.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use motordb_bench::{filled, open_for, random_keys, shuffled_keys, KINDS};
use motordb_core::BPlusTreeIndex;
use motordb_core::Index;

const SIZES: [u64; 3] = [1_000, 10_000, 100_000];

/// Benchmark inserting shuffled keys into an empty index.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in SIZES {
        let keys = shuffled_keys(size);
        group.throughput(Throughput::Elements(size));
        for kind in KINDS {
            group.bench_with_input(BenchmarkId::new(kind.as_str(), size), &keys, |b, keys| {
                b.iter(|| {
                    let mut index = open_for(kind, keys.len());
                    for &key in keys {
                        index.insert(black_box(key), key);
                    }
                    black_box(index.len());
                });
            });
        }
    }

    group.finish();
}

/// Benchmark point lookups, half of which miss.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in SIZES {
        let keys = shuffled_keys(size);
        let probes = random_keys(1_000, size * 2);
        group.throughput(Throughput::Elements(probes.len() as u64));
        for kind in KINDS {
            let index = filled(kind, &keys);
            group.bench_with_input(BenchmarkId::new(kind.as_str(), size), &probes, |b, probes| {
                b.iter(|| {
                    let hits = probes
                        .iter()
                        .filter(|&&key| index.search(black_box(&key)).is_some())
                        .count();
                    black_box(hits);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark delete followed by reinsert of the same key.
fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_reinsert");

    let size = 10_000;
    let keys = shuffled_keys(size);
    for kind in KINDS {
        group.bench_function(kind.as_str(), |b| {
            let mut index = filled(kind, &keys);
            let mut cursor = keys.iter().cycle();
            b.iter(|| {
                if let Some(&key) = cursor.next() {
                    black_box(index.delete(&key));
                    index.insert(key, key);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark materializing every value.
fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_scan");

    for size in SIZES {
        let keys = shuffled_keys(size);
        group.throughput(Throughput::Elements(size));
        for kind in KINDS {
            let index = filled(kind, &keys);
            group.bench_function(BenchmarkId::new(kind.as_str(), size), |b| {
                b.iter(|| black_box(index.all_values()));
            });
        }
    }

    group.finish();
}

/// Benchmark B+-tree range scans of growing width.
fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("bplus_range");

    let mut index = BPlusTreeIndex::new(32).unwrap();
    for key in shuffled_keys(100_000) {
        index.insert(key, key);
    }

    for width in [10u64, 100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*width));
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            let start = 50_000;
            b.iter(|| black_box(index.range(black_box(&start), &(start + width - 1))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_search,
    bench_delete,
    bench_full_scan,
    bench_range
);
criterion_main!(benches);
