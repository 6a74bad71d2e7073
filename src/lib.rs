//! Quiver: in-memory nearest-neighbor search
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              quiver CLI (bench · query · stats)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │           AnyIndex: Flat · IVF · IVF-PQ · LSH · HNSW        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          VectorStore · Metric · k-means · PQ codebooks      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index implementations live in `quiver-core` and are re-exported
//! here; [`cli`] holds the helpers behind the `quiver` binary.

pub mod cli;

pub use quiver_core::*;
