//! Inverted-file (IVF) index
//!
//! ```text
//!   train: samples ──k-means──► nlist centroids
//!   add:   vector ──nearest centroid──► inverted list[c].push(id)
//!   search: query ──nprobe nearest centroids──► scan those lists exactly
//! ```
//!
//! Vectors are kept at full precision; only the probed lists are scanned,
//! so a true neighbor routed to an unprobed list is invisible to the query.
//! Raising `nprobe` only widens the scanned set.

use rayon::prelude::*;

use crate::config::{validate_dimension, IvfParams};
use crate::error::{check_dimension, IndexError, Result};
use crate::metric::{Metric, Neighbor, TopK};
use crate::store::{VectorId, VectorStore};
use crate::training::Quantizer;

/// Build-phase state of an index that needs training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Untrained,
    Trained,
    Populated,
}

#[derive(Debug, Clone)]
pub struct IvfIndex {
    metric: Metric,
    params: IvfParams,
    quantizer: Option<Quantizer>,
    lists: Vec<Vec<VectorId>>,
    store: VectorStore,
}

impl IvfIndex {
    pub fn new(dim: usize, metric: Metric, params: IvfParams) -> Result<Self> {
        validate_dimension(dim)?;
        params.validate()?;
        Ok(Self {
            metric,
            params,
            quantizer: None,
            lists: Vec::new(),
            store: VectorStore::with_dimension(dim),
        })
    }

    /// Train the coarse quantizer. Vectors already added are re-routed.
    pub fn train<V: AsRef<[f32]> + Sync>(&mut self, samples: &[V]) -> Result<()> {
        let quantizer = Quantizer::train(
            samples,
            self.dimension(),
            self.params.nlist,
            self.metric,
            &self.params.kmeans,
        )?;

        let mut lists = vec![Vec::new(); self.params.nlist];
        for (id, vector) in self.store.iter() {
            lists[quantizer.nearest(vector)].push(id);
        }
        self.lists = lists;
        self.quantizer = Some(quantizer);
        Ok(())
    }

    /// Route each vector to its nearest centroid and store it.
    pub fn add<V: AsRef<[f32]> + Sync>(
        &mut self,
        vectors: &[V],
    ) -> Result<std::ops::Range<VectorId>> {
        let quantizer = self.quantizer.as_ref().ok_or(IndexError::IndexNotTrained)?;
        let dim = self.store.dimension();
        for v in vectors {
            check_dimension(dim, v.as_ref().len())?;
        }

        let assignments: Vec<usize> = vectors
            .par_iter()
            .map(|v| quantizer.nearest(v.as_ref()))
            .collect();

        let range = self.store.extend(vectors)?;
        for (id, list) in range.clone().zip(assignments) {
            self.lists[list].push(id);
        }
        tracing::debug!(
            "IVF add: {} vectors, total {}",
            vectors.len(),
            self.store.len()
        );
        Ok(range)
    }

    /// Top-k over the `nprobe` nearest lists (default from construction).
    pub fn search(&self, query: &[f32], k: usize, nprobe: Option<usize>) -> Result<Vec<Neighbor>> {
        check_dimension(self.dimension(), query.len())?;
        if self.store.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let quantizer = self.quantizer.as_ref().ok_or(IndexError::IndexNotTrained)?;
        let nprobe = nprobe
            .unwrap_or(self.params.nprobe)
            .clamp(1, self.params.nlist);

        let mut top = TopK::new(k);
        for (list, _) in quantizer.nearest_n(query, nprobe) {
            for &id in &self.lists[list] {
                top.push(id, self.metric.rank_key(query, self.store.row(id)));
            }
        }
        Ok(top.into_neighbors(self.metric))
    }

    pub fn state(&self) -> IndexState {
        match (&self.quantizer, self.store.is_empty()) {
            (None, _) => IndexState::Untrained,
            (Some(_), true) => IndexState::Trained,
            (Some(_), false) => IndexState::Populated,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.quantizer.is_some()
    }

    /// Number of ids in each inverted list.
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    pub fn quantizer(&self) -> Option<&Quantizer> {
        self.quantizer.as_ref()
    }

    pub fn get(&self, id: VectorId) -> Result<&[f32]> {
        self.store.get(id)
    }

    pub fn nlist(&self) -> usize {
        self.params.nlist
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
}
