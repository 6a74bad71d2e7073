//! Random-hyperplane locality-sensitive hashing (LSH)
//!
//! `nbits` Gaussian hyperplanes are drawn once at construction. A vector's
//! key has bit `i` set when its projection onto hyperplane `i` is
//! non-negative, so vectors at a small angle tend to share keys.
//!
//! Search expands outward from the query's key by Hamming distance
//! (radius 0, then 1, ...) until at least `k` candidates are gathered, the
//! radius cap is reached, or every bucket has been visited; candidates are
//! then re-ranked with the exact metric.
//!
//! The hyperplanes do not depend on the data, so [`LshIndex::train`] has
//! nothing to learn and only checks its input.

use std::collections::HashMap;

use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;

use crate::config::{validate_dimension, LshParams};
use crate::error::{check_dimension, Result};
use crate::metric::{Metric, Neighbor, TopK};
use crate::simd;
use crate::store::{VectorId, VectorStore};
use crate::training::seeded_rng;

#[derive(Debug, Clone)]
pub struct LshIndex {
    metric: Metric,
    params: LshParams,
    /// `nbits × dim`, row-major
    hyperplanes: Vec<f32>,
    buckets: HashMap<u64, Vec<VectorId>>,
    store: VectorStore,
}

impl LshIndex {
    pub fn new(dim: usize, metric: Metric, params: LshParams) -> Result<Self> {
        validate_dimension(dim)?;
        params.validate()?;

        let mut rng = seeded_rng(params.seed);
        let hyperplanes: Vec<f32> = (0..params.nbits as usize * dim)
            .map(|_| StandardNormal.sample(&mut rng))
            .collect();

        Ok(Self {
            metric,
            params,
            hyperplanes,
            buckets: HashMap::new(),
            store: VectorStore::with_dimension(dim),
        })
    }

    /// No-op: hyperplanes are fixed at construction. Samples are only
    /// checked for dimension so misuse still fails fast.
    pub fn train<V: AsRef<[f32]>>(&mut self, samples: &[V]) -> Result<()> {
        for s in samples {
            check_dimension(self.dimension(), s.as_ref().len())?;
        }
        Ok(())
    }

    /// Bucket key of `vector`.
    pub fn hash(&self, vector: &[f32]) -> Result<u64> {
        check_dimension(self.dimension(), vector.len())?;
        Ok(self.hash_unchecked(vector))
    }

    fn hash_unchecked(&self, vector: &[f32]) -> u64 {
        self.hyperplanes
            .chunks_exact(self.dimension())
            .enumerate()
            .fold(0u64, |key, (bit, plane)| {
                if simd::dot_product(plane, vector) >= 0.0 {
                    key | (1u64 << bit)
                } else {
                    key
                }
            })
    }

    pub fn add<V: AsRef<[f32]> + Sync>(
        &mut self,
        vectors: &[V],
    ) -> Result<std::ops::Range<VectorId>> {
        for v in vectors {
            check_dimension(self.dimension(), v.as_ref().len())?;
        }
        let keys: Vec<u64> = vectors
            .par_iter()
            .map(|v| self.hash_unchecked(v.as_ref()))
            .collect();

        let range = self.store.extend(vectors)?;
        for (id, key) in range.clone().zip(keys) {
            self.buckets.entry(key).or_default().push(id);
        }
        Ok(range)
    }

    /// Top-k among candidates within `max_radius` Hamming distance of the
    /// query's key (default from construction, capped at `nbits`).
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        max_radius: Option<u32>,
    ) -> Result<Vec<Neighbor>> {
        check_dimension(self.dimension(), query.len())?;
        if self.store.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let radius_cap = max_radius
            .or(self.params.max_radius)
            .unwrap_or(self.params.nbits)
            .min(self.params.nbits);
        let query_key = self.hash_unchecked(query);

        let mut by_distance: Vec<(u32, u64)> = self
            .buckets
            .keys()
            .map(|&key| ((key ^ query_key).count_ones(), key))
            .filter(|&(dist, _)| dist <= radius_cap)
            .collect();
        by_distance.sort_unstable();

        let mut top = TopK::new(k);
        let mut gathered = 0usize;
        let mut current_radius = 0u32;
        for (dist, key) in by_distance {
            if dist > current_radius {
                // a full Hamming shell has been collected
                if gathered >= k {
                    break;
                }
                current_radius = dist;
            }
            for &id in &self.buckets[&key] {
                top.push(id, self.metric.rank_key(query, self.store.row(id)));
                gathered += 1;
            }
        }
        Ok(top.into_neighbors(self.metric))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn nbits(&self) -> u32 {
        self.params.nbits
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
}
