//! Distance metrics and the shared ranking contract
//!
//! Every index ranks candidates by a *key* where smaller is better:
//!
//! | Metric         | Reported value          | Key        |
//! |----------------|-------------------------|------------|
//! | `L2`           | squared Euclidean dist  | `d`        |
//! | `InnerProduct` | raw dot product         | `-dot`     |
//!
//! Ties on the key are broken by ascending id, so results are
//! deterministic for a given index state.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::simd::{dot_product, l2_distance_squared};
use crate::store::VectorId;

/// Metric fixed at index construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance; smaller is more similar.
    #[default]
    L2,
    /// Unnormalized dot product; larger is more similar.
    InnerProduct,
}

impl Metric {
    /// The value reported to callers for the pair `(a, b)`.
    #[inline]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => l2_distance_squared(a, b),
            Metric::InnerProduct => dot_product(a, b),
        }
    }

    /// Ranking key for `(a, b)`: smaller is better under both metrics.
    #[inline]
    pub fn rank_key(self, a: &[f32], b: &[f32]) -> f32 {
        self.key_from_score(self.score(a, b))
    }

    #[inline]
    pub fn key_from_score(self, score: f32) -> f32 {
        match self {
            Metric::L2 => score,
            Metric::InnerProduct => -score,
        }
    }

    #[inline]
    pub fn score_from_key(self, key: f32) -> f32 {
        // negation is its own inverse
        self.key_from_score(key)
    }

    /// True if `a` is a strictly better reported score than `b`.
    pub fn is_better(self, a: f32, b: f32) -> bool {
        self.key_from_score(a) < self.key_from_score(b)
    }
}

/// One entry of a query result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: VectorId,
    /// Squared L2 distance, or the dot product under `InnerProduct`.
    pub distance: f32,
}

/// Total order on `(key, id)`: key ascending, then id ascending.
#[inline]
pub(crate) fn cmp_ranked(a_key: f32, a_id: usize, b_key: f32, b_id: usize) -> Ordering {
    a_key.total_cmp(&b_key).then(a_id.cmp(&b_id))
}

#[derive(Clone, Copy)]
struct Ranked {
    key: f32,
    id: VectorId,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ranked(self.key, self.id, other.key, other.id)
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded top-k collector over ranking keys.
///
/// Backed by a max-heap so the current worst entry is evicted in O(log k).
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Ranked>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
        }
    }

    /// Offer a candidate. Returns `true` if it was kept.
    #[inline]
    pub fn push(&mut self, id: VectorId, key: f32) -> bool {
        if self.k == 0 {
            return false;
        }
        let item = Ranked { key, id };
        if self.heap.len() < self.k {
            self.heap.push(item);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if item < *worst => {
                self.heap.pop();
                self.heap.push(item);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a result sorted best-first, converting keys back to scores.
    pub fn into_neighbors(self, metric: Metric) -> Vec<Neighbor> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| Neighbor {
                id: r.id,
                distance: metric.score_from_key(r.key),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_score_and_key() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(Metric::L2.score(&a, &b), 25.0);
        assert_eq!(Metric::L2.rank_key(&a, &b), 25.0);
    }

    #[test]
    fn test_inner_product_is_not_cosine() {
        let q = [1.0, 0.0];
        let short = [1.0, 0.0];
        let long = [10.0, 5.0];
        // cosine would prefer `short`; raw dot product prefers `long`
        let s_short = Metric::InnerProduct.score(&q, &short);
        let s_long = Metric::InnerProduct.score(&q, &long);
        assert_eq!(s_long, 10.0);
        assert!(Metric::InnerProduct.is_better(s_long, s_short));
        assert!(
            Metric::InnerProduct.rank_key(&q, &long) < Metric::InnerProduct.rank_key(&q, &short)
        );
    }

    #[test]
    fn test_topk_keeps_smallest_keys() {
        let mut top = TopK::new(3);
        for (id, key) in [(0, 5.0), (1, 1.0), (2, 4.0), (3, 0.5), (4, 9.0)] {
            top.push(id, key);
        }
        let ids: Vec<_> = top.into_neighbors(Metric::L2).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_topk_ties_prefer_lower_id() {
        let mut top = TopK::new(2);
        for id in [7, 3, 5, 1] {
            top.push(id, 1.0);
        }
        let ids: Vec<_> = top.into_neighbors(Metric::L2).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_topk_inner_product_reports_dot() {
        let mut top = TopK::new(2);
        top.push(0, Metric::InnerProduct.key_from_score(3.0));
        top.push(1, Metric::InnerProduct.key_from_score(7.0));
        top.push(2, Metric::InnerProduct.key_from_score(-1.0));
        let result = top.into_neighbors(Metric::InnerProduct);
        assert_eq!(result[0], Neighbor { id: 1, distance: 7.0 });
        assert_eq!(result[1], Neighbor { id: 0, distance: 3.0 });
    }

    #[test]
    fn test_topk_zero_k() {
        let mut top = TopK::new(0);
        assert!(!top.push(0, 1.0));
        assert!(top.into_neighbors(Metric::L2).is_empty());
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&Metric::InnerProduct).unwrap(), "\"inner_product\"");
        assert_eq!(serde_json::from_str::<Metric>("\"l2\"").unwrap(), Metric::L2);
    }
}
