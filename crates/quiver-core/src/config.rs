//! Index construction options and per-query tunables
//!
//! `IndexConfig` is plain serde data so it can be loaded from JSON:
//!
//! ```json
//! { "dim": 128, "metric": "l2", "kind": { "ivf_pq": { "nlist": 256, "m": 16, "bits": 8 } } }
//! ```
//!
//! Every parameter struct validates eagerly in `validate`, which each index
//! constructor calls before any build work is done.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::metric::Metric;

/// How k-means picks its starting centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KMeansInit {
    /// Distinct random samples.
    Random,
    /// D²-weighted sampling.
    #[default]
    KMeansPlusPlus,
}

/// Configuration for k-means training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Maximum Lloyd iterations (default: 25)
    pub max_iters: usize,

    /// Stop once the largest centroid movement is below this (default: 1e-4)
    pub tolerance: f32,

    pub init: KMeansInit,

    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iters: 25,
            tolerance: 1e-4,
            init: KMeansInit::KMeansPlusPlus,
            seed: None,
        }
    }
}

impl KMeansConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_iters(mut self, iters: usize) -> Self {
        self.max_iters = iters;
        self
    }

    pub fn with_init(mut self, init: KMeansInit) -> Self {
        self.init = init;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iters == 0 {
            return Err(IndexError::InvalidConfig("k-means max_iters must be >= 1".into()));
        }
        if !(self.tolerance >= 0.0) {
            return Err(IndexError::InvalidConfig(
                "k-means tolerance must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvfParams {
    /// Number of coarse centroids / inverted lists
    pub nlist: usize,
    /// Lists scanned per query unless overridden
    pub nprobe: usize,
    pub kmeans: KMeansConfig,
}

impl Default for IvfParams {
    fn default() -> Self {
        Self {
            nlist: 100,
            nprobe: 8,
            kmeans: KMeansConfig::default(),
        }
    }
}

impl IvfParams {
    pub fn new(nlist: usize) -> Self {
        Self {
            nlist,
            ..Self::default()
        }
    }

    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.kmeans.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.nlist == 0 {
            return Err(IndexError::InvalidConfig("nlist must be >= 1".into()));
        }
        if self.nprobe == 0 {
            return Err(IndexError::InvalidConfig("nprobe must be >= 1".into()));
        }
        self.kmeans.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvfPqParams {
    pub nlist: usize,
    pub nprobe: usize,
    /// Number of sub-vector segments
    pub m: usize,
    /// Bits per sub-code; each segment has `2^bits` sub-centroids
    pub bits: u8,
    pub kmeans: KMeansConfig,
}

impl Default for IvfPqParams {
    fn default() -> Self {
        Self {
            nlist: 100,
            nprobe: 8,
            m: 8,
            bits: 8,
            kmeans: KMeansConfig::default(),
        }
    }
}

impl IvfPqParams {
    pub fn new(nlist: usize, m: usize, bits: u8) -> Self {
        Self {
            nlist,
            m,
            bits,
            ..Self::default()
        }
    }

    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.kmeans.seed = Some(seed);
        self
    }

    pub fn validate(&self, dim: usize) -> Result<()> {
        IvfParams {
            nlist: self.nlist,
            nprobe: self.nprobe,
            kmeans: self.kmeans.clone(),
        }
        .validate()?;
        if self.m == 0 || dim % self.m != 0 {
            return Err(IndexError::InvalidSegmentation {
                dimension: dim,
                segments: self.m,
            });
        }
        if !(1..=8).contains(&self.bits) {
            return Err(IndexError::InvalidConfig(format!(
                "bits must be in 1..=8, got {}",
                self.bits
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshParams {
    /// Number of random hyperplanes (hash bits), at most 64
    pub nbits: u32,
    /// Largest Hamming radius explored per query unless overridden;
    /// `None` means "all of `nbits`"
    pub max_radius: Option<u32>,
    pub seed: Option<u64>,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            nbits: 16,
            max_radius: None,
            seed: None,
        }
    }
}

impl LshParams {
    pub fn new(nbits: u32) -> Self {
        Self {
            nbits,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_radius(mut self, radius: u32) -> Self {
        self.max_radius = Some(radius);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.nbits) {
            return Err(IndexError::InvalidConfig(format!(
                "nbits must be in 1..=64, got {}",
                self.nbits
            )));
        }
        Ok(())
    }
}

/// Upper bound on `HnswParams::connection_count`; layer 0 holds twice this.
pub const MAX_CONNECTION_COUNT: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    /// Max neighbors per node on layers >= 1 (layer 0 allows twice this)
    pub connection_count: usize,
    /// Candidate-list width while inserting
    pub ef_construction: usize,
    /// Candidate-list width while querying
    pub ef_search: usize,
    pub seed: Option<u64>,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            connection_count: 16,
            ef_construction: 100,
            ef_search: 50,
            seed: None,
        }
    }
}

impl HnswParams {
    pub fn new(connection_count: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            connection_count,
            ef_construction,
            ef_search,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_CONNECTION_COUNT).contains(&self.connection_count) {
            return Err(IndexError::InvalidConfig(format!(
                "connection_count must be in 2..={}, got {}",
                MAX_CONNECTION_COUNT, self.connection_count
            )));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(IndexError::InvalidConfig(
                "ef_construction and ef_search must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Which index structure to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Flat,
    Ivf(IvfParams),
    IvfPq(IvfPqParams),
    Lsh(LshParams),
    Hnsw(HnswParams),
}

impl IndexKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Flat => "flat",
            IndexKind::Ivf(_) => "ivf",
            IndexKind::IvfPq(_) => "ivf_pq",
            IndexKind::Lsh(_) => "lsh",
            IndexKind::Hnsw(_) => "hnsw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub dim: usize,
    #[serde(default)]
    pub metric: Metric,
    pub kind: IndexKind,
}

impl IndexConfig {
    pub fn new(dim: usize, metric: Metric, kind: IndexKind) -> Self {
        Self { dim, metric, kind }
    }

    pub fn validate(&self) -> Result<()> {
        validate_dimension(self.dim)?;
        match &self.kind {
            IndexKind::Flat => Ok(()),
            IndexKind::Ivf(p) => p.validate(),
            IndexKind::IvfPq(p) => p.validate(self.dim),
            IndexKind::Lsh(p) => p.validate(),
            IndexKind::Hnsw(p) => p.validate(),
        }
    }
}

pub(crate) fn validate_dimension(dim: usize) -> Result<()> {
    if dim == 0 {
        return Err(IndexError::InvalidConfig("dimension must be >= 1".into()));
    }
    Ok(())
}

/// Per-query overrides layered over construction-time defaults.
///
/// Fields that do not apply to an index type are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// IVF / IVF-PQ: lists to scan
    pub nprobe: Option<usize>,
    /// HNSW: beam width at layer 0
    pub ef_search: Option<usize>,
    /// LSH: largest Hamming radius to expand to
    pub max_radius: Option<u32>,
}

impl SearchParams {
    pub fn nprobe(nprobe: usize) -> Self {
        Self {
            nprobe: Some(nprobe),
            ..Self::default()
        }
    }

    pub fn ef_search(ef: usize) -> Self {
        Self {
            ef_search: Some(ef),
            ..Self::default()
        }
    }

    pub fn max_radius(radius: u32) -> Self {
        Self {
            max_radius: Some(radius),
            ..Self::default()
        }
    }
}
