//! Quiver Core – vector store, distance kernels and nearest-neighbor indexes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            AnyIndex / VectorIndex (train · add · search)    │
//! ├──────────┬──────────┬──────────────┬──────────┬─────────────┤
//! │   Flat   │   IVF    │    IVF-PQ    │   LSH    │    HNSW     │
//! │ (exact)  │ (lists)  │ (PQ codes)   │ (planes) │  (graph)    │
//! ├──────────┴────┬─────┴──────┬───────┴──────────┴─────────────┤
//! │  k-means Quantizer         │  ProductQuantizer (ADC tables) │
//! ├────────────────────────────┴────────────────────────────────┤
//! │        Metric (L2 / inner product) · SIMD kernels           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 VectorStore (append-only)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every index has two phases: a build phase (`train` + `add`, exclusive
//! `&mut self`) and a query phase (`search`, shared `&self`). All index
//! types are `Send + Sync`, so a populated index can be queried from any
//! number of threads.

pub mod config;
pub mod encoder;
pub mod error;
pub mod eval;
pub mod flat;
pub mod hnsw;
pub mod index;
pub mod ivf;
pub mod ivf_pq;
pub mod lsh;
pub mod metric;
pub mod pq;
pub mod simd;
pub mod store;
pub mod training;

pub use config::{
    HnswParams, IndexConfig, IndexKind, IvfParams, IvfPqParams, KMeansConfig, KMeansInit,
    LshParams, SearchParams,
};
pub use encoder::{add_texts, Encoder};
pub use error::{IndexError, Result};
pub use flat::FlatIndex;
pub use hnsw::Hnsw;
pub use index::{AnyIndex, VectorIndex};
pub use ivf::IvfIndex;
pub use ivf_pq::IvfPqIndex;
pub use lsh::LshIndex;
pub use metric::{Metric, Neighbor};
pub use pq::ProductQuantizer;
pub use store::{VectorId, VectorStore};
pub use training::Quantizer;
