//! HNSW (Hierarchical Navigable Small World) Index
//!
//! A multi-layer proximity graph for approximate nearest neighbor search.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: o-------------------o         (few nodes, long-range edges)
//!          |                   |
//! Layer 1: o-----o-------o-----o         (more nodes)
//!          |     |       |     |
//! Layer 0: o-o-o-o-o-o-o-o-o-o-o-o       (all nodes, up to 2M edges each)
//! ```
//!
//! Queries descend greedily from the entry point through the upper layers,
//! then run a beam search of width `ef` on layer 0.

mod index;
mod node;
mod visited;

pub use index::{Hnsw, HnswStats};
