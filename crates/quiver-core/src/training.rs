//! K-means training and the coarse quantizer
//!
//! Lloyd's k-means shared by IVF (coarse centroids) and IVF-PQ (coarse
//! centroids plus one sub-quantizer per segment):
//!
//! - k-means++ or random-sample initialization
//! - assignment step parallelized with rayon (independent per vector)
//! - early stopping when the largest centroid movement < tolerance
//! - empty clusters re-seeded from a random sample
//!
//! Lloyd iterations always minimize squared L2 (a centroid is a mean).
//! [`Quantizer::assign`] then routes under the index's own metric.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::{KMeansConfig, KMeansInit};
use crate::error::{check_dimension, IndexError, Result};
use crate::metric::{cmp_ranked, Metric};
use crate::simd;

/// RNG from an optional seed; `None` draws a fresh seed.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::seed_from_u64(rand::thread_rng().gen()),
    }
}

/// A trained set of centroids (`k × dim`, row-major).
#[derive(Debug, Clone)]
pub struct Quantizer {
    dim: usize,
    metric: Metric,
    centroids: Vec<f32>,
}

impl Quantizer {
    /// Train `k` centroids from `samples`.
    ///
    /// Fails with `InsufficientTrainingData` when there are fewer samples
    /// than centroids.
    pub fn train<V: AsRef<[f32]> + Sync>(
        samples: &[V],
        dim: usize,
        k: usize,
        metric: Metric,
        config: &KMeansConfig,
    ) -> Result<Self> {
        if k == 0 {
            return Err(IndexError::InvalidConfig("k-means needs k >= 1".into()));
        }
        config.validate()?;
        if samples.len() < k {
            return Err(IndexError::InsufficientTrainingData {
                count: samples.len(),
                required: k,
            });
        }
        for s in samples {
            check_dimension(dim, s.as_ref().len())?;
        }

        let data: Vec<&[f32]> = samples.iter().map(|s| s.as_ref()).collect();
        let mut rng = seeded_rng(config.seed);
        let centroids = kmeans(&data, dim, k, config, &mut rng);

        tracing::info!(
            "Trained {} centroids (dim {}) from {} samples",
            k,
            dim,
            samples.len()
        );

        Ok(Self {
            dim,
            metric,
            centroids,
        })
    }

    /// Wrap pre-computed centroids.
    pub fn from_centroids(dim: usize, metric: Metric, centroids: Vec<f32>) -> Result<Self> {
        if dim == 0 || centroids.is_empty() || centroids.len() % dim != 0 {
            return Err(IndexError::InvalidConfig(format!(
                "centroid buffer of length {} does not hold whole vectors of dim {}",
                centroids.len(),
                dim
            )));
        }
        Ok(Self {
            dim,
            metric,
            centroids,
        })
    }

    /// Nearest centroid under the active metric.
    pub fn assign(&self, vector: &[f32]) -> Result<usize> {
        check_dimension(self.dim, vector.len())?;
        Ok(self.nearest(vector))
    }

    /// Nearest centroid, lowest id on ties. `vector` must have `dim` entries.
    pub(crate) fn nearest(&self, vector: &[f32]) -> usize {
        let mut best = 0;
        let mut best_key = f32::INFINITY;
        for (c, centroid) in self.centroids.chunks_exact(self.dim).enumerate() {
            let key = self.metric.rank_key(vector, centroid);
            if key < best_key {
                best_key = key;
                best = c;
            }
        }
        best
    }

    /// The `n` nearest centroids as `(centroid_id, rank_key)`, best first.
    pub(crate) fn nearest_n(&self, vector: &[f32], n: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(c, centroid)| (c, self.metric.rank_key(vector, centroid)))
            .collect();
        let n = n.min(ranked.len());
        if n < ranked.len() {
            ranked.select_nth_unstable_by(n, |a, b| cmp_ranked(a.1, a.0, b.1, b.0));
            ranked.truncate(n);
        }
        ranked.sort_unstable_by(|a, b| cmp_ranked(a.1, a.0, b.1, b.0));
        ranked
    }

    #[inline]
    pub fn centroid(&self, id: usize) -> &[f32] {
        &self.centroids[id * self.dim..(id + 1) * self.dim]
    }

    pub fn num_centroids(&self) -> usize {
        self.centroids.len() / self.dim
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Flat `k × dim` centroid buffer.
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }
}

/// Nearest centroid by squared L2, returning `(index, distance)`.
#[inline]
fn nearest_l2(point: &[f32], centroids: &[f32], dim: usize) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (c, centroid) in centroids.chunks_exact(dim).enumerate() {
        let d = simd::l2_distance_squared(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// K-means++ initialization
///
/// Each next centroid is sampled with probability proportional to its
/// squared distance from the nearest centroid chosen so far.
fn init_plus_plus(data: &[&[f32]], dim: usize, k: usize, rng: &mut StdRng) -> Vec<f32> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k * dim);
    centroids.extend_from_slice(data[rng.gen_range(0..n)]);

    let mut min_dists = vec![f32::INFINITY; n];
    for c in 1..k {
        let last = &centroids[(c - 1) * dim..c * dim];
        for (d, point) in min_dists.iter_mut().zip(data) {
            *d = d.min(simd::l2_distance_squared(point, last));
        }

        let total: f64 = min_dists.iter().map(|&d| d as f64).sum();
        let chosen = if total <= 0.0 {
            // every point already sits on a centroid
            rng.gen_range(0..n)
        } else {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0f64;
            min_dists
                .iter()
                .position(|&d| {
                    cumulative += d as f64;
                    cumulative >= threshold
                })
                .unwrap_or(n - 1)
        };
        centroids.extend_from_slice(data[chosen]);
    }
    centroids
}

fn init_random(data: &[&[f32]], dim: usize, k: usize, rng: &mut StdRng) -> Vec<f32> {
    let mut centroids = Vec::with_capacity(k * dim);
    for idx in rand::seq::index::sample(rng, data.len(), k).into_iter() {
        centroids.extend_from_slice(data[idx]);
    }
    centroids
}

/// Lloyd's k-means over `data`; returns `k × dim` centroids.
///
/// Callers guarantee `data.len() >= k >= 1` and uniform dimension.
pub(crate) fn kmeans(
    data: &[&[f32]],
    dim: usize,
    k: usize,
    config: &KMeansConfig,
    rng: &mut StdRng,
) -> Vec<f32> {
    let n = data.len();
    let mut centroids = match config.init {
        KMeansInit::KMeansPlusPlus => init_plus_plus(data, dim, k, rng),
        KMeansInit::Random => init_random(data, dim, k, rng),
    };
    let mut assignments: Vec<usize> = Vec::with_capacity(n);
    let mut next = vec![0.0f32; k * dim];
    let mut counts = vec![0usize; k];

    for iter in 0..config.max_iters {
        data.par_iter()
            .map(|point| nearest_l2(point, &centroids, dim).0)
            .collect_into_vec(&mut assignments);

        next.fill(0.0);
        counts.fill(0);
        for (point, &c) in data.iter().zip(&assignments) {
            counts[c] += 1;
            for (acc, &x) in next[c * dim..(c + 1) * dim].iter_mut().zip(point.iter()) {
                *acc += x;
            }
        }

        for (c, &count) in counts.iter().enumerate() {
            let row = &mut next[c * dim..(c + 1) * dim];
            if count > 0 {
                let inv = 1.0 / count as f32;
                row.iter_mut().for_each(|x| *x *= inv);
            } else {
                row.copy_from_slice(data[rng.gen_range(0..n)]);
            }
        }

        let max_movement = centroids
            .chunks_exact(dim)
            .zip(next.chunks_exact(dim))
            .map(|(old, new)| simd::l2_distance_squared(old, new))
            .fold(0.0f32, f32::max);

        std::mem::swap(&mut centroids, &mut next);

        if max_movement < config.tolerance * config.tolerance {
            tracing::debug!("K-means converged after {} iterations", iter + 1);
            break;
        }
    }

    centroids
}
