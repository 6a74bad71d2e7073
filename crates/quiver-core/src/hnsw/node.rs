//! Adjacency of one graph node

use crate::store::VectorId;

/// Neighbor lists of one vector, one per layer it lives on.
///
/// A node's position in the graph equals its `VectorId`, so only the edges
/// are stored here.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    /// `layers[0]` is the base layer; `layers[l]` exists for `l <= top layer`
    pub layers: Vec<Vec<VectorId>>,
}

impl Node {
    pub fn new(top_layer: usize) -> Self {
        Self {
            layers: vec![Vec::new(); top_layer + 1],
        }
    }

    pub fn top_layer(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Empty when the node does not reach `layer`.
    pub fn neighbors(&self, layer: usize) -> &[VectorId] {
        self.layers.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add an edge; returns the new degree on that layer.
    pub fn add_neighbor(&mut self, layer: usize, id: VectorId) -> usize {
        match self.layers.get_mut(layer) {
            Some(list) => {
                if !list.contains(&id) {
                    list.push(id);
                }
                list.len()
            }
            None => 0,
        }
    }

    pub fn set_neighbors(&mut self, layer: usize, ids: Vec<VectorId>) {
        if let Some(list) = self.layers.get_mut(layer) {
            *list = ids;
        }
    }
}
