//! Benchmarks for cache key derivation

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use skp_fetch_core::{KeyCodec, RequestDescriptor};
use std::hint::black_box;

fn descriptors() -> Vec<(&'static str, RequestDescriptor)> {
    let small = RequestDescriptor::get("/api/users/42");

    let medium = RequestDescriptor::post("/api/search")
        .header("Accept", "application/json")
        .header("Accept-Language", "en-US")
        .json(json!({
            "query": "rust cache",
            "filters": {"lang": "en", "year": 2026},
            "page": {"index": 3, "size": 50}
        }));

    let items: Vec<_> = (0..200)
        .map(|i| json!({"id": i, "tags": ["a", "b", "c"], "meta": {"z": i, "a": i * 2}}))
        .collect();
    let large = RequestDescriptor::post("/api/batch")
        .headers((0..20).map(|i| (format!("x-header-{i}"), format!("value-{i}"))))
        .json(json!({ "items": items }));

    vec![("small", small), ("medium", medium), ("large", large)]
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_key");
    group.throughput(Throughput::Elements(1));

    let codec = KeyCodec::new();
    let vary = KeyCodec::new().vary_by(["accept-language"]);

    for (name, descriptor) in descriptors() {
        group.bench_with_input(BenchmarkId::new("all_headers", name), &descriptor, |b, d| {
            b.iter(|| black_box(codec.compute(black_box(d))));
        });
        group.bench_with_input(BenchmarkId::new("vary_subset", name), &descriptor, |b, d| {
            b.iter(|| black_box(vary.compute(black_box(d))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute);
criterion_main!(benches);
