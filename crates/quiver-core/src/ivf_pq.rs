//! IVF with product-quantized residuals (IVF-PQ)
//!
//! Coarse partitioning is the same as [`IvfIndex`](crate::ivf::IvfIndex).
//! Each vector is then stored only as the PQ code of its residual
//! (`vector - centroid`); the float vector itself is discarded.
//!
//! Search never decodes a stored vector:
//!
//! - `L2`: `||q - (c + r)||² = Σ_s ||(q - c)_s - r_s||²`, one residual
//!   table per probed list.
//! - `InnerProduct`: `<q, c + r> = <q, c> + Σ_s <q_s, r_s>`, one table per
//!   query plus a per-list constant.

use rayon::prelude::*;

use crate::config::{validate_dimension, IvfPqParams};
use crate::error::{check_dimension, IndexError, Result};
use crate::ivf::IndexState;
use crate::metric::{Metric, Neighbor, TopK};
use crate::pq::ProductQuantizer;
use crate::simd;
use crate::store::VectorId;
use crate::training::Quantizer;

/// Ids and their codes, `code_size` bytes per id.
#[derive(Debug, Clone, Default)]
struct InvertedList {
    ids: Vec<VectorId>,
    codes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct IvfPqIndex {
    dim: usize,
    metric: Metric,
    params: IvfPqParams,
    coarse: Option<Quantizer>,
    pq: Option<ProductQuantizer>,
    lists: Vec<InvertedList>,
    count: usize,
}

impl IvfPqIndex {
    /// Fails with `InvalidSegmentation` if `dim` is not divisible by `m`.
    pub fn new(dim: usize, metric: Metric, params: IvfPqParams) -> Result<Self> {
        validate_dimension(dim)?;
        params.validate(dim)?;
        Ok(Self {
            dim,
            metric,
            params,
            coarse: None,
            pq: None,
            lists: Vec::new(),
            count: 0,
        })
    }

    /// Train the coarse quantizer, then one sub-quantizer per segment on
    /// the training residuals.
    pub fn train<V: AsRef<[f32]> + Sync>(&mut self, samples: &[V]) -> Result<()> {
        if self.count > 0 {
            return Err(IndexError::InvalidConfig(
                "cannot retrain a populated IVF-PQ index: original vectors are not retained"
                    .into(),
            ));
        }
        let required = self.params.nlist.max(1usize << self.params.bits);
        if samples.len() < required {
            return Err(IndexError::InsufficientTrainingData {
                count: samples.len(),
                required,
            });
        }

        let coarse = Quantizer::train(
            samples,
            self.dim,
            self.params.nlist,
            self.metric,
            &self.params.kmeans,
        )?;

        let residuals: Vec<Vec<f32>> = samples
            .par_iter()
            .map(|s| {
                let s = s.as_ref();
                let mut r = vec![0.0f32; s.len()];
                simd::subtract_into(s, coarse.centroid(coarse.nearest(s)), &mut r);
                r
            })
            .collect();

        let mut pq_config = self.params.kmeans.clone();
        pq_config.seed = pq_config.seed.map(|s| s.wrapping_add(0x5EED));
        let pq = ProductQuantizer::train(
            &residuals,
            self.dim,
            self.params.m,
            self.params.bits,
            &pq_config,
        )?;

        tracing::info!(
            "Trained IVF-PQ: nlist {}, m {}, bits {} from {} samples",
            self.params.nlist,
            self.params.m,
            self.params.bits,
            samples.len()
        );

        self.lists = vec![InvertedList::default(); self.params.nlist];
        self.coarse = Some(coarse);
        self.pq = Some(pq);
        Ok(())
    }

    /// Route, compute the residual, and store only its PQ code.
    pub fn add<V: AsRef<[f32]> + Sync>(
        &mut self,
        vectors: &[V],
    ) -> Result<std::ops::Range<VectorId>> {
        let (coarse, pq) = match (&self.coarse, &self.pq) {
            (Some(c), Some(p)) => (c, p),
            _ => return Err(IndexError::IndexNotTrained),
        };
        for v in vectors {
            check_dimension(self.dim, v.as_ref().len())?;
        }

        let encoded: Vec<(usize, Vec<u8>)> = vectors
            .par_iter()
            .map_init(
                || vec![0.0f32; self.dim],
                |residual, v| {
                    let v = v.as_ref();
                    let list = coarse.nearest(v);
                    simd::subtract_into(v, coarse.centroid(list), residual);
                    let mut codes = vec![0u8; pq.code_size()];
                    pq.encode_into(residual, &mut codes);
                    (list, codes)
                },
            )
            .collect();

        let start = self.count;
        for (list, codes) in encoded {
            let list = &mut self.lists[list];
            list.ids.push(self.count);
            list.codes.extend_from_slice(&codes);
            self.count += 1;
        }
        tracing::debug!("IVF-PQ add: {} vectors, total {}", vectors.len(), self.count);
        Ok(start..self.count)
    }

    /// Approximate top-k over the `nprobe` nearest lists using ADC.
    pub fn search(&self, query: &[f32], k: usize, nprobe: Option<usize>) -> Result<Vec<Neighbor>> {
        check_dimension(self.dim, query.len())?;
        if self.count == 0 || k == 0 {
            return Ok(Vec::new());
        }
        let (coarse, pq) = match (&self.coarse, &self.pq) {
            (Some(c), Some(p)) => (c, p),
            _ => return Err(IndexError::IndexNotTrained),
        };
        let nprobe = nprobe
            .unwrap_or(self.params.nprobe)
            .clamp(1, self.params.nlist);
        let code_size = pq.code_size();

        let mut top = TopK::new(k);
        let mut table = Vec::new();
        let mut residual = vec![0.0f32; self.dim];

        if self.metric == Metric::InnerProduct {
            pq.fill_distance_table(query, self.metric, &mut table);
        }

        for (list_id, coarse_key) in coarse.nearest_n(query, nprobe) {
            let list = &self.lists[list_id];
            if list.ids.is_empty() {
                continue;
            }
            let base = match self.metric {
                Metric::L2 => {
                    simd::subtract_into(query, coarse.centroid(list_id), &mut residual);
                    pq.fill_distance_table(&residual, self.metric, &mut table);
                    0.0
                }
                // coarse_key is -<q, c>
                Metric::InnerProduct => coarse_key,
            };
            for (&id, codes) in list.ids.iter().zip(list.codes.chunks_exact(code_size)) {
                top.push(id, base + pq.adc(&table, codes));
            }
        }
        Ok(top.into_neighbors(self.metric))
    }

    pub fn state(&self) -> IndexState {
        match (&self.pq, self.count) {
            (None, _) => IndexState::Untrained,
            (Some(_), 0) => IndexState::Trained,
            (Some(_), _) => IndexState::Populated,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.pq.is_some()
    }

    /// Bytes held by stored codes.
    pub fn code_bytes(&self) -> usize {
        self.lists.iter().map(|l| l.codes.len()).sum()
    }

    /// Float32 bytes per vector divided by code bytes per vector.
    pub fn compression_ratio(&self) -> f32 {
        (self.dim * std::mem::size_of::<f32>()) as f32 / self.params.m as f32
    }

    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(|l| l.ids.len()).collect()
    }

    pub fn product_quantizer(&self) -> Option<&ProductQuantizer> {
        self.pq.as_ref()
    }

    pub fn nlist(&self) -> usize {
        self.params.nlist
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }
}
