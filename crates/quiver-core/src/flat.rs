//! Exact brute-force index
//!
//! Scans every stored vector (O(n·d) per query). It needs no training and
//! is the ground truth the approximate indexes are measured against.

use crate::config::validate_dimension;
use crate::error::{check_dimension, Result};
use crate::metric::{Metric, Neighbor, TopK};
use crate::store::{VectorId, VectorStore};

#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    store: VectorStore,
}

impl FlatIndex {
    pub fn new(dim: usize, metric: Metric) -> Result<Self> {
        validate_dimension(dim)?;
        Ok(Self {
            metric,
            store: VectorStore::with_dimension(dim),
        })
    }

    /// Append vectors; ids continue from the current size.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<std::ops::Range<VectorId>> {
        self.store.extend(vectors)
    }

    /// Exact top-k: smallest L2 distance or largest dot product, ties by id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_dimension(self.store.dimension(), query.len())?;
        let mut top = TopK::new(k);
        for (id, vector) in self.store.iter() {
            top.push(id, self.metric.rank_key(query, vector));
        }
        Ok(top.into_neighbors(self.metric))
    }

    pub fn get(&self, id: VectorId) -> Result<&[f32]> {
        self.store.get(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}
