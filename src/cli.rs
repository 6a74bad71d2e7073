//! Helpers behind the `quiver` binary: data loading, index construction
//! and the benchmark loop.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;

use quiver_core::eval::{ground_truth, mean_recall};
use quiver_core::{
    AnyIndex, FlatIndex, HnswParams, IndexConfig, IndexKind, IvfParams, IvfPqParams, LshParams,
    Metric, SearchParams, VectorIndex,
};

/// Index type selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Flat,
    Ivf,
    IvfPq,
    Lsh,
    Hnsw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    L2,
    Ip,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::L2 => Metric::L2,
            MetricArg::Ip => Metric::InnerProduct,
        }
    }
}

/// Default parameters for `kind`, seeded where randomness is involved.
///
/// `nlist` is scaled down for small corpora so training has enough samples.
pub fn default_config(
    kind: KindArg,
    dim: usize,
    metric: Metric,
    count: usize,
    seed: u64,
) -> IndexConfig {
    let nlist = (count / 40).clamp(1, 100);
    let kind = match kind {
        KindArg::Flat => IndexKind::Flat,
        KindArg::Ivf => IndexKind::Ivf(IvfParams::new(nlist).with_seed(seed)),
        KindArg::IvfPq => {
            let m = [8, 4, 2, 1].into_iter().find(|m| dim % m == 0).unwrap_or(1);
            IndexKind::IvfPq(IvfPqParams::new(nlist, m, 8).with_seed(seed))
        }
        KindArg::Lsh => IndexKind::Lsh(LshParams::default().with_seed(seed)),
        KindArg::Hnsw => IndexKind::Hnsw(HnswParams::default().with_seed(seed)),
    };
    IndexConfig::new(dim, metric, kind)
}

/// Read an [`IndexConfig`] from a JSON file.
pub fn load_config(path: &Path) -> anyhow::Result<IndexConfig> {
    let file = File::open(path).with_context(|| format!("opening config {:?}", path))?;
    let config: IndexConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {:?}", path))?;
    config.validate().with_context(|| format!("invalid config {:?}", path))?;
    Ok(config)
}

/// Read a JSON array of equal-length vectors: `[[0.1, ...], [0.2, ...]]`.
pub fn load_vectors(path: &Path) -> anyhow::Result<Vec<Vec<f32>>> {
    let file = File::open(path).with_context(|| format!("opening vectors {:?}", path))?;
    let vectors: Vec<Vec<f32>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing vectors {:?}", path))?;

    let Some(first) = vectors.first() else {
        bail!("No vectors found in {:?}", path);
    };
    let dim = first.len();
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            bail!("Vector {} has dimension {}, expected {}", i, v.len(), dim);
        }
    }
    tracing::info!("Loaded {} vectors of dimension {} from {:?}", vectors.len(), dim, path);
    Ok(vectors)
}

/// Construct the index, train it on `vectors` if it needs training, and
/// add them all.
pub fn build_index(config: &IndexConfig, vectors: &[Vec<f32>]) -> anyhow::Result<AnyIndex> {
    let mut index = AnyIndex::new(config).context("creating index")?;
    if index.requires_training() {
        index.train(vectors).context("training index")?;
    }
    index.add(vectors).context("adding vectors")?;
    Ok(index)
}

/// `count` points scattered around `clusters` random centers in `[0, 10)^dim`.
pub fn clustered_vectors(count: usize, dim: usize, clusters: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f32>> = (0..clusters.max(1))
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0f32..10.0)).collect())
        .collect();
    (0..count)
        .map(|_| {
            let center = &centers[rng.gen_range(0..centers.len())];
            center.iter().map(|c| c + rng.gen_range(-1.0f32..1.0)).collect()
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub index: &'static str,
    pub count: usize,
    pub dim: usize,
    pub queries: usize,
    pub k: usize,
    pub build_ms: f64,
    pub mean_query_us: f64,
    pub batch_qps: f64,
    pub recall: f64,
}

/// Build `config` over `data`, then time `queries` and score recall@k
/// against exact search.
pub fn run_bench(
    config: &IndexConfig,
    data: &[Vec<f32>],
    queries: &[Vec<f32>],
    k: usize,
    params: &SearchParams,
) -> anyhow::Result<BenchReport> {
    let start = Instant::now();
    let index = build_index(config, data)?;
    let build_ms = start.elapsed().as_secs_f64() * 1e3;
    tracing::info!("Built {} index over {} vectors in {:.1}ms", index.name(), data.len(), build_ms);

    let mut results = Vec::with_capacity(queries.len());
    let start = Instant::now();
    for q in queries {
        results.push(index.search(q, k, params)?);
    }
    let sequential = start.elapsed().as_secs_f64();

    let start = Instant::now();
    index.search_batch(queries, k, params)?;
    let batch = start.elapsed().as_secs_f64();

    let mut flat = FlatIndex::new(config.dim, config.metric)?;
    flat.add(data)?;
    let truth = ground_truth(&flat, queries, k)?;

    let n = queries.len().max(1) as f64;
    Ok(BenchReport {
        index: index.name(),
        count: data.len(),
        dim: config.dim,
        queries: queries.len(),
        k,
        build_ms,
        mean_query_us: sequential * 1e6 / n,
        batch_qps: if batch > 0.0 { queries.len() as f64 / batch } else { 0.0 },
        recall: mean_recall(&truth, &results),
    })
}

/// Structural statistics of a built index as JSON.
pub fn index_stats(index: &AnyIndex) -> serde_json::Value {
    let mut stats = json!({
        "index": index.name(),
        "vectors": index.len(),
        "dimension": index.dimension(),
        "metric": index.metric(),
    });
    let extra = match index {
        AnyIndex::Flat(flat) => json!({ "memory_bytes": flat.store().memory_bytes() }),
        AnyIndex::Ivf(ivf) => json!({ "nlist": ivf.nlist(), "list_sizes": ivf.list_sizes() }),
        AnyIndex::IvfPq(pq) => json!({
            "nlist": pq.nlist(),
            "list_sizes": pq.list_sizes(),
            "code_bytes": pq.code_bytes(),
            "compression_ratio": pq.compression_ratio(),
        }),
        AnyIndex::Lsh(lsh) => json!({ "nbits": lsh.nbits(), "buckets": lsh.bucket_count() }),
        AnyIndex::Hnsw(hnsw) => {
            let s = hnsw.stats();
            json!({
                "max_layer": s.max_layer,
                "layer_counts": s.layer_counts,
                "total_edges": s.total_edges,
                "connection_count": s.connection_count,
                "ef_construction": s.ef_construction,
            })
        }
    };
    if let (Some(base), serde_json::Value::Object(extra)) = (stats.as_object_mut(), extra) {
        base.extend(extra);
    }
    stats
}
