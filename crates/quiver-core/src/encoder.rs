//! Boundary to an external text encoder
//!
//! The engine never inspects text: an [`Encoder`] turns each string into a
//! fixed-length vector and [`add_texts`] feeds the results to an index.

use std::ops::Range;

use rayon::prelude::*;

use crate::error::{check_dimension, Result};
use crate::index::VectorIndex;
use crate::store::VectorId;

/// Maps a string to a vector of fixed dimension.
pub trait Encoder: Sync {
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Vec<f32>;
}

/// Encode `texts` in parallel and add them to `index` in order.
///
/// The encoder's declared dimension and every produced vector are checked
/// before anything is added.
pub fn add_texts<I, E, S>(index: &mut I, encoder: &E, texts: &[S]) -> Result<Range<VectorId>>
where
    I: VectorIndex + ?Sized,
    E: Encoder + ?Sized,
    S: AsRef<str> + Sync,
{
    check_dimension(index.dimension(), encoder.dimension())?;
    let vectors: Vec<Vec<f32>> = texts
        .par_iter()
        .map(|t| encoder.encode(t.as_ref()))
        .collect();
    for v in &vectors {
        check_dimension(index.dimension(), v.len())?;
    }
    let ids = index.add(&vectors)?;
    tracing::debug!("Encoded and added {} texts", texts.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchParams;
    use crate::error::IndexError;
    use crate::flat::FlatIndex;
    use crate::metric::Metric;
    use crate::simd::l2_normalize;

    /// Hashed bag of words.
    struct HashingEncoder {
        dim: usize,
    }

    impl Encoder for HashingEncoder {
        fn dimension(&self) -> usize {
            self.dim
        }

        fn encode(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; self.dim];
            for word in text.split_whitespace() {
                let h = word
                    .to_lowercase()
                    .bytes()
                    .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                        (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                    });
                v[(h % self.dim as u64) as usize] += 1.0;
            }
            l2_normalize(&mut v);
            v
        }
    }

    /// Declares one dimension, produces another.
    struct BrokenEncoder;

    impl Encoder for BrokenEncoder {
        fn dimension(&self) -> usize {
            8
        }

        fn encode(&self, _text: &str) -> Vec<f32> {
            vec![0.0; 3]
        }
    }

    #[test]
    fn test_add_texts_and_query() {
        let encoder = HashingEncoder { dim: 64 };
        let mut index = FlatIndex::new(64, Metric::InnerProduct).unwrap();
        let docs = [
            "rust ownership and borrowing",
            "inverted file index with product quantization",
            "graph based nearest neighbor search",
        ];
        assert_eq!(add_texts(&mut index, &encoder, &docs).unwrap(), 0..3);

        let query = encoder.encode("product quantization index");
        let results = VectorIndex::search(&index, &query, 1, &SearchParams::default()).unwrap();
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn test_declared_dimension_checked() {
        let encoder = HashingEncoder { dim: 32 };
        let mut index = FlatIndex::new(64, Metric::L2).unwrap();
        assert_eq!(
            add_texts(&mut index, &encoder, &["hello"]).unwrap_err(),
            IndexError::DimensionMismatch { expected: 64, actual: 32 }
        );
    }

    #[test]
    fn test_produced_dimension_checked() {
        let mut index = FlatIndex::new(8, Metric::L2).unwrap();
        assert_eq!(
            add_texts(&mut index, &BrokenEncoder, &["a", "b"]).unwrap_err(),
            IndexError::DimensionMismatch { expected: 8, actual: 3 }
        );
        assert!(index.is_empty());
    }
}
