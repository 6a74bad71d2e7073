//! HNSW Index Implementation
//!
//! - Random layer assignment (exponential distribution, `ml = 1/ln(M)`)
//! - Diversity-preserving neighbor selection heuristic
//! - Greedy beam search with epoch-based visited tracking
//!
//! # Algorithm Overview
//!
//! **Insert**: Draw a top layer L, descend greedily from the entry point to
//! L + 1, then on each layer from L down to 0 collect `ef_construction`
//! candidates, keep up to M diverse ones (2M on layer 0), and add reverse
//! edges, pruning any neighbor whose degree overflows.
//!
//! **Search**: Greedy descent to layer 1, then beam search on layer 0 with
//! `max(ef, k)` candidates.
//!
//! All comparisons use `(rank key, id)`, so a given seed and insertion order
//! always produce the same graph and the same results.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::Rng;

use super::node::Node;
use super::visited::VisitedGuard;
use crate::config::{validate_dimension, HnswParams};
use crate::error::{check_dimension, Result};
use crate::metric::{cmp_ranked, Metric, Neighbor};
use crate::store::{VectorId, VectorStore};
use crate::training::seeded_rng;

/// Graph vertex paired with its ranking key relative to the current query.
#[derive(Clone, Copy)]
struct Candidate {
    id: VectorId,
    key: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ranked(self.key, self.id, other.key, other.id)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// HNSW Index
///
/// Owns its vectors; node `i` of the graph is vector `i` of the store.
#[derive(Debug, Clone)]
pub struct Hnsw {
    metric: Metric,
    params: HnswParams,
    store: VectorStore,
    nodes: Vec<Node>,

    /// Node on the highest layer
    entry_point: Option<VectorId>,

    /// Highest layer currently in the graph
    max_layer: usize,

    /// Max neighbors for layer 0 (2 * M)
    m0: usize,

    /// Level multiplier for random layer assignment (1/ln(M))
    ml: f64,

    rng: StdRng,
}

impl Hnsw {
    pub fn new(dim: usize, metric: Metric, params: HnswParams) -> Result<Self> {
        validate_dimension(dim)?;
        params.validate()?;
        let m = params.connection_count;
        Ok(Self {
            metric,
            store: VectorStore::with_dimension(dim),
            nodes: Vec::new(),
            entry_point: None,
            max_layer: 0,
            m0: m * 2,
            ml: 1.0 / (m as f64).ln(),
            rng: seeded_rng(params.seed),
            params,
        })
    }

    /// No-op: the graph is built incrementally by `add`. Samples are only
    /// checked for dimension.
    pub fn train<V: AsRef<[f32]>>(&mut self, samples: &[V]) -> Result<()> {
        for s in samples {
            check_dimension(self.dimension(), s.as_ref().len())?;
        }
        Ok(())
    }

    /// Store and link each vector in order.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<std::ops::Range<VectorId>> {
        let range = self.store.extend(vectors)?;
        for id in range.clone() {
            self.insert(id);
        }
        tracing::debug!(
            "HNSW add: {} vectors, total {}, max layer {}",
            vectors.len(),
            self.nodes.len(),
            self.max_layer
        );
        Ok(range)
    }

    #[inline]
    fn key(&self, query: &[f32], id: VectorId) -> f32 {
        self.metric.rank_key(query, self.store.row(id))
    }

    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m0
        } else {
            self.params.connection_count
        }
    }

    /// Assign a random layer based on exponential distribution
    fn random_layer(&mut self) -> usize {
        // (0, 1]: keeps ln() finite
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        (-r.ln() * self.ml).floor() as usize
    }

    /// Link `id`, whose vector is already in the store, into the graph.
    fn insert(&mut self, id: VectorId) {
        debug_assert_eq!(id, self.nodes.len());
        let node_layer = self.random_layer();
        let mut node = Node::new(node_layer);

        let Some(entry_point) = self.entry_point else {
            self.nodes.push(node);
            self.entry_point = Some(id);
            self.max_layer = node_layer;
            return;
        };

        let query = self.store.row(id).to_vec();
        let mut current = entry_point;

        // Phase 1: greedy descent through layers above the node's top layer
        for layer in (node_layer + 1..=self.max_layer).rev() {
            if let Some(nearest) = self.search_layer(&query, current, 1, layer).first() {
                current = nearest.id;
            }
        }

        // Phase 2: pick neighbors on every shared layer, top-down
        let mut links: Vec<(usize, Vec<VectorId>)> = Vec::new();
        for layer in (0..=node_layer.min(self.max_layer)).rev() {
            let candidates =
                self.search_layer(&query, current, self.params.ef_construction, layer);
            let selected = self.select_neighbors(&candidates, self.max_connections(layer));
            node.set_neighbors(layer, selected.clone());
            links.push((layer, selected));

            if let Some(best) = candidates.first() {
                current = best.id;
            }
        }
        self.nodes.push(node);

        // Reverse edges, shrinking any neighbor that now has too many
        for (layer, neighbors) in links {
            let cap = self.max_connections(layer);
            for neighbor in neighbors {
                if self.nodes[neighbor].add_neighbor(layer, id) > cap {
                    let pruned = self.prune(neighbor, layer, cap);
                    self.nodes[neighbor].set_neighbors(layer, pruned);
                }
            }
        }

        if node_layer > self.max_layer {
            self.max_layer = node_layer;
            self.entry_point = Some(id);
        }
    }

    /// Re-select `cap` neighbors of `id` on `layer` from its current list.
    fn prune(&self, id: VectorId, layer: usize, cap: usize) -> Vec<VectorId> {
        let base = self.store.row(id);
        let mut candidates: Vec<Candidate> = self.nodes[id]
            .neighbors(layer)
            .iter()
            .map(|&n| Candidate { id: n, key: self.key(base, n) })
            .collect();
        candidates.sort_unstable();
        self.select_neighbors(&candidates, cap)
    }

    /// Beam search of width `ef` on one layer.
    ///
    /// Returns up to `ef` candidates, best first.
    fn search_layer(
        &self,
        query: &[f32],
        entry: VectorId,
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited = VisitedGuard::new(self.nodes.len());

        // frontier (min-heap) and best-so-far (max-heap, worst on top)
        let reserve = ef.min(self.nodes.len());
        let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(reserve);
        let mut results: BinaryHeap<Candidate> = BinaryHeap::with_capacity(reserve + 1);

        visited.insert(entry);
        let start = Candidate { id: entry, key: self.key(query, entry) };
        frontier.push(Reverse(start));
        results.push(start);

        while let Some(Reverse(current)) = frontier.pop() {
            if let Some(worst) = results.peek() {
                if results.len() >= ef && current > *worst {
                    break;
                }
            }

            for &neighbor in self.nodes[current.id].neighbors(layer) {
                if !visited.insert(neighbor) {
                    continue;
                }
                let candidate = Candidate { id: neighbor, key: self.key(query, neighbor) };
                let promising = match results.peek() {
                    Some(worst) => results.len() < ef || candidate < *worst,
                    None => true,
                };
                if promising {
                    frontier.push(Reverse(candidate));
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Select neighbors using diversity-preserving heuristic
    ///
    /// `candidates` must be sorted best first. A candidate is kept only if it
    /// is closer to the base vector than to every neighbor already kept;
    /// remaining slots are filled with the closest leftovers.
    fn select_neighbors(&self, candidates: &[Candidate], m: usize) -> Vec<VectorId> {
        let mut selected: Vec<VectorId> = Vec::with_capacity(m);
        let mut skipped: Vec<VectorId> = Vec::new();

        for candidate in candidates {
            if selected.len() >= m {
                break;
            }
            let vector = self.store.row(candidate.id);
            let diverse = selected
                .iter()
                .all(|&kept| self.key(vector, kept) >= candidate.key);
            if diverse {
                selected.push(candidate.id);
            } else {
                skipped.push(candidate.id);
            }
        }

        for id in skipped {
            if selected.len() >= m {
                break;
            }
            selected.push(id);
        }
        selected
    }

    /// Approximate top-k. `ef` defaults to the construction-time
    /// `ef_search`, is raised to at least `k` and capped at the node count.
    ///
    /// Layers above 0 are descended greedily (beam width 1); only layer 0
    /// is searched with width `ef`.
    pub fn search(&self, query: &[f32], k: usize, ef: Option<usize>) -> Result<Vec<Neighbor>> {
        check_dimension(self.dimension(), query.len())?;
        let Some(entry_point) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        let ef = ef.unwrap_or(self.params.ef_search).max(k).min(self.nodes.len());

        let mut current = entry_point;
        for layer in (1..=self.max_layer).rev() {
            if let Some(nearest) = self.search_layer(query, current, 1, layer).first() {
                current = nearest.id;
            }
        }

        Ok(self
            .search_layer(query, current, ef, 0)
            .into_iter()
            .take(k)
            .map(|c| Neighbor {
                id: c.id,
                distance: self.metric.score_from_key(c.key),
            })
            .collect())
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> HnswStats {
        let mut layer_counts = vec![0usize; self.max_layer + 1];
        let mut total_edges = 0;
        for node in &self.nodes {
            for (layer, neighbors) in node.layers.iter().enumerate() {
                layer_counts[layer] += 1;
                total_edges += neighbors.len();
            }
        }
        HnswStats {
            num_nodes: self.nodes.len(),
            max_layer: self.max_layer,
            layer_counts,
            total_edges,
            connection_count: self.params.connection_count,
            ef_construction: self.params.ef_construction,
        }
    }

    pub fn entry_point(&self) -> Option<VectorId> {
        self.entry_point
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
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

    #[cfg(test)]
    pub(crate) fn node(&self, id: VectorId) -> &Node {
        &self.nodes[id]
    }
}

/// Statistics about the HNSW graph
#[derive(Debug, Clone, PartialEq)]
pub struct HnswStats {
    pub num_nodes: usize,
    pub max_layer: usize,
    /// Nodes present on each layer
    pub layer_counts: Vec<usize>,
    /// Directed edges across all layers
    pub total_edges: usize,
    pub connection_count: usize,
    pub ef_construction: usize,
}
