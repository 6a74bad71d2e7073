//! Product Quantization (PQ)
//!
//! Splits a `d`-dimensional vector into `m` equal segments and replaces each
//! segment with the index of its nearest sub-centroid (`2^bits` per
//! segment), so a vector is stored as `m` bytes.
//!
//! ```text
//! Vector [f32; d] → m sub-vectors of d/m floats
//!                    ↓
//! each sub-vector → nearest of 2^bits sub-centroids (u8)
//!                    ↓
//! PQ Code [u8; m]
//! ```
//!
//! # Distance Computation (ADC)
//!
//! ```text
//! Query → table[m × 2^bits] of per-segment ranking keys
//!       → for any code, key = sum of m table lookups
//! ```
//!
//! Table entries are ranking keys (squared L2, or negated dot product), so
//! both metrics decompose into a plain per-segment sum.

use rayon::prelude::*;

use crate::config::KMeansConfig;
use crate::error::{check_dimension, IndexError, Result};
use crate::metric::Metric;
use crate::simd;
use crate::training::{kmeans, seeded_rng};

/// Trained product quantizer.
#[derive(Debug, Clone)]
pub struct ProductQuantizer {
    /// Dimension of the original vector
    pub dimension: usize,

    /// Number of segments (m)
    pub num_subspaces: usize,

    /// Dimension of each segment (dimension / num_subspaces)
    pub sub_dimension: usize,

    /// Bits per code; `num_centroids == 1 << bits`
    pub bits: u8,

    pub num_centroids: usize,

    /// Codebook: [num_subspaces][num_centroids][sub_dimension], flattened
    pub codebook: Vec<f32>,
}

fn validate_layout(dimension: usize, num_subspaces: usize, bits: u8) -> Result<()> {
    if num_subspaces == 0 || dimension % num_subspaces != 0 {
        return Err(IndexError::InvalidSegmentation {
            dimension,
            segments: num_subspaces,
        });
    }
    if !(1..=8).contains(&bits) {
        return Err(IndexError::InvalidConfig(format!(
            "bits must be in 1..=8, got {}",
            bits
        )));
    }
    Ok(())
}

impl ProductQuantizer {
    /// Train one sub-quantizer per segment from `vectors`.
    ///
    /// Needs at least `2^bits` training vectors.
    pub fn train<V: AsRef<[f32]> + Sync>(
        vectors: &[V],
        dimension: usize,
        num_subspaces: usize,
        bits: u8,
        config: &KMeansConfig,
    ) -> Result<Self> {
        validate_layout(dimension, num_subspaces, bits)?;
        config.validate()?;
        let num_centroids = 1usize << bits;
        if vectors.len() < num_centroids {
            return Err(IndexError::InsufficientTrainingData {
                count: vectors.len(),
                required: num_centroids,
            });
        }
        for v in vectors {
            check_dimension(dimension, v.as_ref().len())?;
        }

        let sub_dim = dimension / num_subspaces;
        // one seed per segment
        let per_segment: Vec<Vec<f32>> = (0..num_subspaces)
            .into_par_iter()
            .map(|s| {
                let sub_vectors: Vec<&[f32]> = vectors
                    .iter()
                    .map(|v| &v.as_ref()[s * sub_dim..(s + 1) * sub_dim])
                    .collect();
                let mut rng = seeded_rng(config.seed.map(|seed| seed.wrapping_add(s as u64)));
                kmeans(&sub_vectors, sub_dim, num_centroids, config, &mut rng)
            })
            .collect();
        let codebook: Vec<f32> = per_segment.concat();

        tracing::debug!(
            "Trained PQ codebook: {} segments × {} centroids (sub-dim {})",
            num_subspaces,
            num_centroids,
            sub_dim
        );

        Self::new(dimension, num_subspaces, bits, codebook)
    }

    /// Wrap a pre-trained codebook.
    pub fn new(
        dimension: usize,
        num_subspaces: usize,
        bits: u8,
        codebook: Vec<f32>,
    ) -> Result<Self> {
        validate_layout(dimension, num_subspaces, bits)?;
        let sub_dimension = dimension / num_subspaces;
        let num_centroids = 1usize << bits;
        let expected = num_subspaces * num_centroids * sub_dimension;
        if codebook.len() != expected {
            return Err(IndexError::InvalidConfig(format!(
                "codebook size mismatch: expected {}, got {}",
                expected,
                codebook.len()
            )));
        }
        Ok(Self {
            dimension,
            num_subspaces,
            sub_dimension,
            bits,
            num_centroids,
            codebook,
        })
    }

    #[inline]
    fn centroid(&self, subspace: usize, code: usize) -> &[f32] {
        let offset = (subspace * self.num_centroids + code) * self.sub_dimension;
        &self.codebook[offset..offset + self.sub_dimension]
    }

    #[inline]
    fn segment<'a>(&self, vector: &'a [f32], subspace: usize) -> &'a [f32] {
        &vector[subspace * self.sub_dimension..(subspace + 1) * self.sub_dimension]
    }

    /// Bytes per encoded vector.
    pub fn code_size(&self) -> usize {
        self.num_subspaces
    }

    /// Encode into a caller-provided buffer of `num_subspaces` bytes.
    /// `vector` must already have been checked against `dimension`.
    pub(crate) fn encode_into(&self, vector: &[f32], codes: &mut [u8]) {
        debug_assert_eq!(vector.len(), self.dimension);
        debug_assert_eq!(codes.len(), self.num_subspaces);
        for (s, code) in codes.iter_mut().enumerate() {
            let sub_vec = self.segment(vector, s);
            let mut best = 0usize;
            let mut best_dist = f32::INFINITY;
            for c in 0..self.num_centroids {
                let dist = simd::l2_distance_squared(sub_vec, self.centroid(s, c));
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            *code = best as u8;
        }
    }

    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u8>> {
        check_dimension(self.dimension, vector.len())?;
        let mut codes = vec![0u8; self.num_subspaces];
        self.encode_into(vector, &mut codes);
        Ok(codes)
    }

    /// Codes must have one entry per segment, each below `num_centroids`.
    fn check_codes(&self, codes: &[u8]) -> Result<()> {
        check_dimension(self.num_subspaces, codes.len())?;
        match codes
            .iter()
            .enumerate()
            .find(|&(_, &code)| code as usize >= self.num_centroids)
        {
            Some((segment, &code)) => Err(IndexError::InvalidCode {
                segment,
                code,
                num_centroids: self.num_centroids,
            }),
            None => Ok(()),
        }
    }

    /// Reconstruct the (approximate) vector a code stands for.
    pub fn decode(&self, codes: &[u8]) -> Result<Vec<f32>> {
        self.check_codes(codes)?;
        let mut vector = Vec::with_capacity(self.dimension);
        for (s, &code) in codes.iter().enumerate() {
            vector.extend_from_slice(self.centroid(s, code as usize));
        }
        Ok(vector)
    }

    /// Fill `table[s * num_centroids + c]` with the ranking key between
    /// segment `s` of `query` and sub-centroid `c`.
    pub(crate) fn fill_distance_table(
        &self,
        query: &[f32],
        metric: Metric,
        table: &mut Vec<f32>,
    ) {
        debug_assert_eq!(query.len(), self.dimension);
        table.clear();
        table.reserve(self.num_subspaces * self.num_centroids);
        for s in 0..self.num_subspaces {
            let query_sub = self.segment(query, s);
            for c in 0..self.num_centroids {
                table.push(metric.rank_key(query_sub, self.centroid(s, c)));
            }
        }
    }

    pub fn compute_distance_table(&self, query: &[f32], metric: Metric) -> Result<Vec<f32>> {
        check_dimension(self.dimension, query.len())?;
        let mut table = Vec::new();
        self.fill_distance_table(query, metric, &mut table);
        Ok(table)
    }

    /// ADC key of `codes` against a table from [`Self::compute_distance_table`].
    pub fn adc_distance(&self, table: &[f32], codes: &[u8]) -> Result<f32> {
        check_dimension(self.num_subspaces * self.num_centroids, table.len())?;
        self.check_codes(codes)?;
        Ok(self.adc(table, codes))
    }

    /// ADC: sum of `m` table lookups, for codes produced by `encode_into`.
    #[inline]
    pub(crate) fn adc(&self, table: &[f32], codes: &[u8]) -> f32 {
        codes
            .iter()
            .enumerate()
            .map(|(s, &code)| table[s * self.num_centroids + code as usize])
            .sum()
    }

    /// Mean squared reconstruction error of encode-then-decode over `vectors`.
    pub fn reconstruction_error<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<f32> {
        if vectors.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0f64;
        for v in vectors {
            let v = v.as_ref();
            let decoded = self.decode(&self.encode(v)?)?;
            total += simd::l2_distance_squared(v, &decoded) as f64;
        }
        Ok((total / vectors.len() as f64) as f32)
    }
}
