//! Benchmarks for skp-fetch throughput and operations

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use skp_fetch::{
    transport_fn, FetchCache, FetchCacheConfig, FnTransport, RequestDescriptor, RequestOptions,
    TransportError,
};
use std::future::Ready;
use std::hint::black_box;
use std::time::Duration;
use tokio::runtime::Runtime;

type EchoFn = fn(RequestDescriptor, skp_fetch::CancellationToken) -> Ready<Result<u64, TransportError>>;

fn echo(req: RequestDescriptor, _cancel: skp_fetch::CancellationToken) -> Ready<Result<u64, TransportError>> {
    std::future::ready(Ok(req.url.len() as u64))
}

fn create_cache() -> FetchCache<FnTransport<EchoFn, u64>> {
    FetchCache::with_config(
        transport_fn(echo as EchoFn),
        FetchCacheConfig::with_ttl(Duration::from_secs(3600)),
    )
}

fn bench_request(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = create_cache();

    // Pre-populate
    rt.block_on(async {
        cache.fetch("/key", RequestOptions::default()).await.unwrap();
    });

    let mut group = c.benchmark_group("request");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hit", |b| {
        b.iter(|| {
            let request = cache.request(black_box("/key"), RequestOptions::default());
            black_box(request.data());
        });
    });

    group.bench_function("miss", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            rt.block_on(async {
                let response = cache
                    .fetch(format!("/miss/{i}"), RequestOptions::default())
                    .await
                    .unwrap();
                black_box(response);
            });
        });
        cache.invalidate_all();
    });

    group.finish();
}

fn bench_coalesced(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = create_cache();

    let mut group = c.benchmark_group("coalesced");
    group.throughput(Throughput::Elements(100));

    group.bench_function("100_waiters", |b| {
        b.iter(|| {
            rt.block_on(async {
                cache.invalidate_all();
                let requests: Vec<_> = (0..100)
                    .map(|_| cache.request("/shared", RequestOptions::default()))
                    .collect();
                for request in requests {
                    black_box(request.await.unwrap());
                }
            });
        });
    });

    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = create_cache();

    // Pre-populate some keys
    rt.block_on(async {
        for i in 0..100 {
            cache
                .fetch(format!("/key/{}", i), RequestOptions::default())
                .await
                .unwrap();
        }
    });

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(100));

    group.bench_function("80_read_20_invalidate", |b| {
        let mut i = 0u64;
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..100 {
                    i = i.wrapping_add(1);
                    let descriptor = RequestDescriptor::get(format!("/key/{}", i % 100));
                    if i % 5 == 0 {
                        // 20% invalidations
                        cache.invalidate(&descriptor);
                    } else {
                        // 80% reads
                        let _ = cache.fetch(descriptor, RequestOptions::default()).await.unwrap();
                    }
                }
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_request, bench_coalesced, bench_mixed_workload);
criterion_main!(benches);
