//! Per-index query latency
//!
//! Run with: cargo bench --bench search

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quiver::cli::{build_index, clustered_vectors};
use quiver::{
    HnswParams, IndexConfig, IndexKind, IvfParams, IvfPqParams, LshParams, Metric, SearchParams,
    VectorIndex,
};

const DIM: usize = 64;
const COUNT: usize = 10_000;

fn configs() -> Vec<IndexConfig> {
    [
        IndexKind::Flat,
        IndexKind::Ivf(IvfParams::new(100).with_seed(1)),
        IndexKind::IvfPq(IvfPqParams::new(100, 8, 8).with_seed(1)),
        IndexKind::Lsh(LshParams::new(12).with_seed(1)),
        IndexKind::Hnsw(HnswParams::default().with_seed(1)),
    ]
    .into_iter()
    .map(|kind| IndexConfig::new(DIM, Metric::L2, kind))
    .collect()
}

fn bench_search(c: &mut Criterion) {
    let mut data = clustered_vectors(COUNT + 64, DIM, 32, 42);
    let queries = data.split_off(COUNT);

    let mut group = c.benchmark_group("search_k10");
    group.sample_size(30);
    group.measurement_time(Duration::from_secs(3));

    for config in configs() {
        let index = match build_index(&config, &data) {
            Ok(index) => index,
            Err(e) => panic!("building {}: {:#}", config.kind.name(), e),
        };
        let mut i = 0;
        group.bench_function(BenchmarkId::from_parameter(config.kind.name()), |b| {
            b.iter(|| {
                i = (i + 1) % queries.len();
                black_box(index.search(&queries[i], 10, &SearchParams::default()))
            })
        });
    }
    group.finish();
}

fn bench_tunables(c: &mut Criterion) {
    let mut data = clustered_vectors(COUNT + 1, DIM, 32, 43);
    let query = data.pop().unwrap_or_default();

    let ivf = IndexConfig::new(DIM, Metric::L2, IndexKind::Ivf(IvfParams::new(100).with_seed(2)));
    let hnsw = IndexConfig::new(
        DIM,
        Metric::L2,
        IndexKind::Hnsw(HnswParams::default().with_seed(2)),
    );
    let (Ok(ivf), Ok(hnsw)) = (build_index(&ivf, &data), build_index(&hnsw, &data)) else {
        panic!("index build failed");
    };

    let mut group = c.benchmark_group("tunables");
    group.sample_size(30);
    for nprobe in [1, 8, 32] {
        group.bench_with_input(BenchmarkId::new("ivf_nprobe", nprobe), &nprobe, |b, &n| {
            b.iter(|| black_box(ivf.search(&query, 10, &SearchParams::nprobe(n))))
        });
    }
    for ef in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::new("hnsw_ef", ef), &ef, |b, &ef| {
            b.iter(|| black_box(hnsw.search(&query, 10, &SearchParams::ef_search(ef))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search, bench_tunables);
criterion_main!(benches);
