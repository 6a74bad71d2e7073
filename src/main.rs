//! Quiver CLI
//!
//! # Usage
//!
//! ```bash
//! # Recall/latency of an HNSW index over synthetic clustered data
//! quiver bench --kind hnsw --count 20000 --dim 64 --queries 200 --k 10
//!
//! # Same, from a JSON index config
//! quiver bench --config ivf.json --nprobe 16
//!
//! # Top-k over vectors loaded from a JSON file
//! quiver query --data vectors.json --vector "0.1,0.2,0.3" --k 5
//!
//! # Structure of the index built over a data file
//! quiver stats --data vectors.json --kind ivf
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quiver::cli::{
    build_index, clustered_vectors, default_config, index_stats, load_config, load_vectors,
    run_bench, KindArg, MetricArg,
};
use quiver::{IndexConfig, SearchParams, VectorIndex};

#[derive(Parser)]
#[command(name = "quiver")]
#[command(about = "In-memory approximate nearest-neighbor search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// How to obtain the index configuration.
#[derive(Args)]
struct IndexArgs {
    /// JSON index config (overrides --kind and --metric)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Index type when no config file is given
    #[arg(long, value_enum, default_value = "hnsw")]
    kind: KindArg,

    #[arg(long, value_enum, default_value = "l2")]
    metric: MetricArg,

    /// Seed for k-means, hyperplanes and layer draws
    #[arg(long, default_value = "42")]
    seed: u64,
}

/// Per-query overrides.
#[derive(Args)]
struct QueryArgs {
    /// IVF / IVF-PQ: lists to probe
    #[arg(long)]
    nprobe: Option<usize>,

    /// HNSW: beam width
    #[arg(long)]
    ef_search: Option<usize>,

    /// LSH: max Hamming radius
    #[arg(long)]
    max_radius: Option<u32>,
}

impl From<&QueryArgs> for SearchParams {
    fn from(args: &QueryArgs) -> Self {
        SearchParams {
            nprobe: args.nprobe,
            ef_search: args.ef_search,
            max_radius: args.max_radius,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index over synthetic clustered data and report recall and latency
    Bench {
        #[command(flatten)]
        index: IndexArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Number of indexed vectors
        #[arg(short = 'n', long, default_value = "10000")]
        count: usize,

        /// Dimension (ignored when --config is given)
        #[arg(short, long, default_value = "64")]
        dim: usize,

        /// Number of held-out queries
        #[arg(short, long, default_value = "100")]
        queries: usize,

        #[arg(short = 'k', long, default_value = "10")]
        k: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search vectors loaded from a JSON file
    Query {
        /// JSON array of vectors
        #[arg(long)]
        data: PathBuf,

        /// Query vector (comma separated floats)
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        vector: Vec<f32>,

        #[arg(short = 'k', long, default_value = "10")]
        k: usize,

        #[command(flatten)]
        index: IndexArgs,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print structural statistics of the index built over a JSON file
    Stats {
        /// JSON array of vectors
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        index: IndexArgs,
    },
}

fn resolve_config(args: &IndexArgs, dim: usize, count: usize) -> anyhow::Result<IndexConfig> {
    match &args.config {
        Some(path) => load_config(path),
        None => Ok(default_config(args.kind, dim, args.metric.into(), count, args.seed)),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bench {
            index,
            query,
            count,
            dim,
            queries,
            k,
            json,
        } => {
            let config = resolve_config(&index, dim, count)?;
            tracing::info!(
                "Generating {} + {} vectors of dimension {}",
                count,
                queries,
                config.dim
            );
            let mut data = clustered_vectors(count + queries, config.dim, 32, index.seed);
            let held_out = data.split_off(count);

            let report = run_bench(&config, &data, &held_out, k, &SearchParams::from(&query))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Index: {}", report.index);
                println!("  Vectors: {} x {}", report.count, report.dim);
                println!("  Build: {:.1} ms", report.build_ms);
                println!("  Mean query: {:.1} us", report.mean_query_us);
                println!("  Batch throughput: {:.0} queries/s", report.batch_qps);
                println!("  Recall@{}: {:.4}", report.k, report.recall);
            }
        }

        Commands::Query {
            data,
            vector,
            k,
            index,
            query,
        } => {
            let vectors = load_vectors(&data)?;
            let config = resolve_config(&index, vectors[0].len(), vectors.len())?;
            let built = build_index(&config, &vectors)?;
            let results = built
                .search(&vector, k, &SearchParams::from(&query))
                .context("searching")?;

            println!("Results ({}):", built.name());
            for n in results {
                println!("  ID: {}, Score: {:.4}", n.id, n.distance);
            }
        }

        Commands::Stats { data, index } => {
            let vectors = load_vectors(&data)?;
            let config = resolve_config(&index, vectors[0].len(), vectors.len())?;
            let built = build_index(&config, &vectors)?;
            println!("{}", serde_json::to_string_pretty(&index_stats(&built))?);
        }
    }

    Ok(())
}
