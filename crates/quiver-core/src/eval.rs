//! Recall measurement against exact search

use rayon::prelude::*;

use crate::error::Result;
use crate::flat::FlatIndex;
use crate::metric::Neighbor;
use crate::store::VectorId;

/// Exact top-k ids for each query.
pub fn ground_truth(
    flat: &FlatIndex,
    queries: &[Vec<f32>],
    k: usize,
) -> Result<Vec<Vec<VectorId>>> {
    queries
        .par_iter()
        .map(|q| -> Result<Vec<VectorId>> {
            Ok(flat.search(q, k)?.into_iter().map(|n| n.id).collect())
        })
        .collect()
}

/// Fraction of `truth` ids present in `approx`.
///
/// An empty `truth` counts as perfect recall.
pub fn recall_at_k(truth: &[VectorId], approx: &[Neighbor]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let found = truth
        .iter()
        .filter(|id| approx.iter().any(|n| n.id == **id))
        .count();
    found as f64 / truth.len() as f64
}

/// Mean of [`recall_at_k`] over paired query results.
pub fn mean_recall(truth: &[Vec<VectorId>], approx: &[Vec<Neighbor>]) -> f64 {
    debug_assert_eq!(truth.len(), approx.len());
    if truth.is_empty() {
        return 1.0;
    }
    let total: f64 = truth
        .iter()
        .zip(approx)
        .map(|(t, a)| recall_at_k(t, a))
        .sum();
    total / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;

    fn n(id: VectorId) -> Neighbor {
        Neighbor { id, distance: 0.0 }
    }

    #[test]
    fn test_recall_counts_overlap() {
        assert_eq!(recall_at_k(&[1, 2, 3, 4], &[n(4), n(9), n(1)]), 0.5);
        assert_eq!(recall_at_k(&[], &[n(1)]), 1.0);
        assert_eq!(recall_at_k(&[7], &[]), 0.0);
    }

    #[test]
    fn test_mean_recall() {
        let truth = vec![vec![0, 1], vec![2, 3]];
        let approx = vec![vec![n(0), n(1)], vec![n(2), n(5)]];
        assert_eq!(mean_recall(&truth, &approx), 0.75);
    }

    #[test]
    fn test_flat_against_itself_is_perfect() {
        let data: Vec<Vec<f32>> = (0..50).map(|i| vec![i as f32, (i % 7) as f32]).collect();
        let mut flat = FlatIndex::new(2, Metric::L2).unwrap();
        flat.add(&data).unwrap();

        let queries = vec![vec![3.2, 1.0], vec![40.0, 6.0]];
        let truth = ground_truth(&flat, &queries, 5).unwrap();
        let approx: Vec<Vec<Neighbor>> =
            queries.iter().map(|q| flat.search(q, 5).unwrap()).collect();
        assert_eq!(mean_recall(&truth, &approx), 1.0);
    }
}
