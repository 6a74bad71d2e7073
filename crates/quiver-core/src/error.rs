//! Error type shared by the store, the quantizers and every index.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index is not trained; call train() before add()")]
    IndexNotTrained,

    #[error("Not enough training data: {count} vectors (required: {required})")]
    InsufficientTrainingData { count: usize, required: usize },

    #[error("Dimension {dimension} is not divisible into {segments} segments")]
    InvalidSegmentation { dimension: usize, segments: usize },

    #[error("Vector id out of range: {id} >= {count}")]
    OutOfRange { id: usize, count: usize },

    #[error("PQ code {code} in segment {segment} is out of range (max {num_centroids})")]
    InvalidCode {
        segment: usize,
        code: u8,
        num_centroids: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Reject `actual` unless it equals the fixed dimension.
#[inline]
pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(IndexError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
