//! Common index interface
//!
//! [`VectorIndex`] is the capability set every index shares
//! (`train` / `add` / `search`), so callers can be written once over any
//! variant. [`AnyIndex`] is the tagged variant built from an
//! [`IndexConfig`].

use std::ops::Range;

use rayon::prelude::*;

use crate::config::{IndexConfig, IndexKind, SearchParams};
use crate::error::{check_dimension, Result};
use crate::flat::FlatIndex;
use crate::hnsw::Hnsw;
use crate::ivf::IvfIndex;
use crate::ivf_pq::IvfPqIndex;
use crate::lsh::LshIndex;
use crate::metric::{Metric, Neighbor};
use crate::store::VectorId;

/// Build phase takes `&mut self`; query phase takes `&self` and may run
/// from any number of threads once the index is populated.
pub trait VectorIndex: Send + Sync {
    /// Short name of the index type (`"flat"`, `"ivf"`, ...).
    fn name(&self) -> &'static str;

    /// Learn data-dependent structure. A no-op for variants that have none.
    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()>;

    /// Append vectors; returns the ids they were given.
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>>;

    /// Top-k, best first. Parameters that do not apply are ignored.
    fn search(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;

    fn metric(&self) -> Metric;

    /// Whether `add` and `search` can proceed.
    fn is_trained(&self) -> bool;

    /// Run independent queries in parallel. Fails on the first error.
    fn search_batch(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        params: &SearchParams,
    ) -> Result<Vec<Vec<Neighbor>>> {
        queries
            .par_iter()
            .map(|q| self.search(q, k, params))
            .collect()
    }
}

fn check_samples(dim: usize, samples: &[Vec<f32>]) -> Result<()> {
    samples.iter().try_for_each(|s| check_dimension(dim, s.len()))
}

impl VectorIndex for FlatIndex {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        check_samples(self.dimension(), samples)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>> {
        FlatIndex::add(self, vectors)
    }

    fn search(&self, query: &[f32], k: usize, _params: &SearchParams) -> Result<Vec<Neighbor>> {
        FlatIndex::search(self, query, k)
    }

    fn len(&self) -> usize {
        FlatIndex::len(self)
    }

    fn dimension(&self) -> usize {
        FlatIndex::dimension(self)
    }

    fn metric(&self) -> Metric {
        FlatIndex::metric(self)
    }

    fn is_trained(&self) -> bool {
        true
    }
}

impl VectorIndex for IvfIndex {
    fn name(&self) -> &'static str {
        "ivf"
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        IvfIndex::train(self, samples)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>> {
        IvfIndex::add(self, vectors)
    }

    fn search(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>> {
        IvfIndex::search(self, query, k, params.nprobe)
    }

    fn len(&self) -> usize {
        IvfIndex::len(self)
    }

    fn dimension(&self) -> usize {
        IvfIndex::dimension(self)
    }

    fn metric(&self) -> Metric {
        IvfIndex::metric(self)
    }

    fn is_trained(&self) -> bool {
        IvfIndex::is_trained(self)
    }
}

impl VectorIndex for IvfPqIndex {
    fn name(&self) -> &'static str {
        "ivf_pq"
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        IvfPqIndex::train(self, samples)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>> {
        IvfPqIndex::add(self, vectors)
    }

    fn search(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>> {
        IvfPqIndex::search(self, query, k, params.nprobe)
    }

    fn len(&self) -> usize {
        IvfPqIndex::len(self)
    }

    fn dimension(&self) -> usize {
        IvfPqIndex::dimension(self)
    }

    fn metric(&self) -> Metric {
        IvfPqIndex::metric(self)
    }

    fn is_trained(&self) -> bool {
        IvfPqIndex::is_trained(self)
    }
}

impl VectorIndex for LshIndex {
    fn name(&self) -> &'static str {
        "lsh"
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        LshIndex::train(self, samples)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>> {
        LshIndex::add(self, vectors)
    }

    fn search(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>> {
        LshIndex::search(self, query, k, params.max_radius)
    }

    fn len(&self) -> usize {
        LshIndex::len(self)
    }

    fn dimension(&self) -> usize {
        LshIndex::dimension(self)
    }

    fn metric(&self) -> Metric {
        LshIndex::metric(self)
    }

    fn is_trained(&self) -> bool {
        true
    }
}

impl VectorIndex for Hnsw {
    fn name(&self) -> &'static str {
        "hnsw"
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        Hnsw::train(self, samples)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>> {
        Hnsw::add(self, vectors)
    }

    fn search(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>> {
        Hnsw::search(self, query, k, params.ef_search)
    }

    fn len(&self) -> usize {
        Hnsw::len(self)
    }

    fn dimension(&self) -> usize {
        Hnsw::dimension(self)
    }

    fn metric(&self) -> Metric {
        Hnsw::metric(self)
    }

    fn is_trained(&self) -> bool {
        true
    }
}

/// One of the five index types, chosen at runtime.
#[derive(Debug, Clone)]
pub enum AnyIndex {
    Flat(FlatIndex),
    Ivf(IvfIndex),
    IvfPq(IvfPqIndex),
    Lsh(LshIndex),
    Hnsw(Hnsw),
}

macro_rules! dispatch {
    ($self:expr, $index:ident => $body:expr) => {
        match $self {
            AnyIndex::Flat($index) => $body,
            AnyIndex::Ivf($index) => $body,
            AnyIndex::IvfPq($index) => $body,
            AnyIndex::Lsh($index) => $body,
            AnyIndex::Hnsw($index) => $body,
        }
    };
}

impl AnyIndex {
    /// Validate `config` and construct an empty index.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        let (dim, metric) = (config.dim, config.metric);
        let index = match &config.kind {
            IndexKind::Flat => AnyIndex::Flat(FlatIndex::new(dim, metric)?),
            IndexKind::Ivf(p) => AnyIndex::Ivf(IvfIndex::new(dim, metric, p.clone())?),
            IndexKind::IvfPq(p) => AnyIndex::IvfPq(IvfPqIndex::new(dim, metric, p.clone())?),
            IndexKind::Lsh(p) => AnyIndex::Lsh(LshIndex::new(dim, metric, p.clone())?),
            IndexKind::Hnsw(p) => AnyIndex::Hnsw(Hnsw::new(dim, metric, p.clone())?),
        };
        tracing::debug!("Created {} index (dim {}, {:?})", index.name(), dim, metric);
        Ok(index)
    }

    /// True for the variants whose `train` learns something.
    pub fn requires_training(&self) -> bool {
        matches!(self, AnyIndex::Ivf(_) | AnyIndex::IvfPq(_))
    }

    pub fn as_dyn(&self) -> &dyn VectorIndex {
        dispatch!(self, index => index as &dyn VectorIndex)
    }
}

impl VectorIndex for AnyIndex {
    fn name(&self) -> &'static str {
        dispatch!(self, index => index.name())
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        dispatch!(self, index => VectorIndex::train(index, samples))
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Range<VectorId>> {
        dispatch!(self, index => VectorIndex::add(index, vectors))
    }

    fn search(&self, query: &[f32], k: usize, params: &SearchParams) -> Result<Vec<Neighbor>> {
        dispatch!(self, index => VectorIndex::search(index, query, k, params))
    }

    fn len(&self) -> usize {
        dispatch!(self, index => VectorIndex::len(index))
    }

    fn dimension(&self) -> usize {
        dispatch!(self, index => VectorIndex::dimension(index))
    }

    fn metric(&self) -> Metric {
        dispatch!(self, index => VectorIndex::metric(index))
    }

    fn is_trained(&self) -> bool {
        dispatch!(self, index => VectorIndex::is_trained(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HnswParams, IvfParams, IvfPqParams, LshParams};
    use crate::error::IndexError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect())
            .collect()
    }

    fn all_kinds() -> Vec<IndexKind> {
        vec![
            IndexKind::Flat,
            IndexKind::Ivf(IvfParams::new(4).with_seed(1)),
            IndexKind::IvfPq(IvfPqParams::new(4, 4, 8).with_seed(1)),
            IndexKind::Lsh(LshParams::new(8).with_seed(1)),
            IndexKind::Hnsw(HnswParams::default().with_seed(1)),
        ]
    }

    #[test]
    fn test_every_kind_builds_and_finds_duplicate() {
        let data = random_vectors(300, 16, 1);
        for kind in all_kinds() {
            let name = kind.name();
            let mut index = AnyIndex::new(&IndexConfig::new(16, Metric::L2, kind)).unwrap();
            assert_eq!(index.name(), name);

            index.train(&data).unwrap();
            assert!(index.is_trained());
            assert_eq!(index.add(&data).unwrap(), 0..300);
            assert_eq!(index.len(), 300);

            let results = index
                .search(&data[5], 3, &SearchParams::default())
                .unwrap();
            assert_eq!(results.len(), 3, "{}", name);
            assert_eq!(results[0].id, 5, "{}", name);
        }
    }

    #[test]
    fn test_requires_training() {
        for kind in all_kinds() {
            let index = AnyIndex::new(&IndexConfig::new(16, Metric::L2, kind)).unwrap();
            assert_eq!(index.requires_training(), !index.is_trained());
        }
        let mut ivf = AnyIndex::new(&IndexConfig::new(
            2,
            Metric::L2,
            IndexKind::Ivf(IvfParams::new(2)),
        ))
        .unwrap();
        assert_eq!(
            ivf.add(&[vec![0.0, 0.0]]).unwrap_err(),
            IndexError::IndexNotTrained
        );
    }

    #[test]
    fn test_invalid_config_rejected_eagerly() {
        let config = IndexConfig::new(10, Metric::L2, IndexKind::IvfPq(IvfPqParams::new(4, 4, 8)));
        assert_eq!(
            AnyIndex::new(&config).unwrap_err(),
            IndexError::InvalidSegmentation { dimension: 10, segments: 4 }
        );
        let config = IndexConfig::new(0, Metric::L2, IndexKind::Flat);
        assert!(matches!(AnyIndex::new(&config), Err(IndexError::InvalidConfig(_))));
    }

    #[test]
    fn test_search_batch_matches_sequential() {
        let data = random_vectors(300, 8, 2);
        let queries = random_vectors(16, 8, 3);
        let mut index = AnyIndex::new(&IndexConfig::new(
            8,
            Metric::InnerProduct,
            IndexKind::Hnsw(HnswParams::default().with_seed(2)),
        ))
        .unwrap();
        index.add(&data).unwrap();

        let params = SearchParams::ef_search(64);
        let batch = index.search_batch(&queries, 5, &params).unwrap();
        for (q, got) in queries.iter().zip(batch) {
            assert_eq!(got, index.search(q, 5, &params).unwrap());
        }
    }

    #[test]
    fn test_search_batch_propagates_dimension_error() {
        let mut index = AnyIndex::new(&IndexConfig::new(4, Metric::L2, IndexKind::Flat)).unwrap();
        index.add(&random_vectors(10, 4, 4)).unwrap();
        let queries = vec![vec![0.0; 4], vec![0.0; 3]];
        assert!(matches!(
            index.search_batch(&queries, 1, &SearchParams::default()),
            Err(IndexError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_trait_object() {
        let mut flat = FlatIndex::new(2, Metric::L2).unwrap();
        VectorIndex::add(&mut flat, &[vec![1.0, 1.0], vec![0.0, 0.0]]).unwrap();
        let any = AnyIndex::Flat(flat);
        let index: &dyn VectorIndex = any.as_dyn();
        let results = index.search(&[0.1, 0.1], 1, &SearchParams::default()).unwrap();
        assert_eq!(results[0].id, 1);
    }
}
