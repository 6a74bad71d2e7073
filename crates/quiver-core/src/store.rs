//! Append-only in-memory vector storage
//!
//! Vectors live in one contiguous `Vec<f32>` (row-major, `dim` floats per
//! row), so `get` is a bounds check plus a slice. The dimension is either
//! fixed up front with [`VectorStore::with_dimension`] or by the first
//! append into a store created with [`VectorStore::new`].
//!
//! Reads take `&self` and writes take `&mut self`, so the borrow checker
//! enforces "concurrent readers, never concurrent with `append`".

use crate::error::{check_dimension, IndexError, Result};

/// Zero-based id assigned in insertion order; never reused.
pub type VectorId = usize;

#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    data: Vec<f32>,
    dim: Option<usize>,
    count: usize,
}

impl VectorStore {
    /// An empty store whose dimension is fixed by the first append.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store with a fixed dimension.
    pub fn with_dimension(dim: usize) -> Self {
        Self {
            data: Vec::new(),
            dim: Some(dim),
            count: 0,
        }
    }

    /// Build a store from an initial bulk set.
    pub fn from_vectors<V: AsRef<[f32]>>(vectors: &[V]) -> Result<Self> {
        let mut store = Self::new();
        store.extend(vectors)?;
        Ok(store)
    }

    /// Append a vector and return its id.
    pub fn append(&mut self, vector: &[f32]) -> Result<VectorId> {
        match self.dim {
            Some(dim) => check_dimension(dim, vector.len())?,
            None => {
                if vector.is_empty() {
                    return Err(IndexError::InvalidConfig(
                        "vectors must have at least one component".into(),
                    ));
                }
                self.dim = Some(vector.len());
            }
        }
        self.data.extend_from_slice(vector);
        let id = self.count;
        self.count += 1;
        Ok(id)
    }

    /// Append many vectors; either all are appended or none are.
    pub fn extend<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<std::ops::Range<VectorId>> {
        let start = self.count;
        let Some(first) = vectors.first() else {
            return Ok(start..start);
        };
        let dim = self.dim.unwrap_or(first.as_ref().len());
        for v in vectors {
            check_dimension(dim, v.as_ref().len())?;
        }
        self.data.reserve(vectors.len() * dim);
        for v in vectors {
            self.append(v.as_ref())?;
        }
        Ok(start..self.count)
    }

    /// Vector by id.
    pub fn get(&self, id: VectorId) -> Result<&[f32]> {
        if id >= self.count {
            return Err(IndexError::OutOfRange {
                id,
                count: self.count,
            });
        }
        Ok(self.row(id))
    }

    /// Unchecked-by-`Result` access for ids the caller already owns.
    #[inline]
    pub(crate) fn row(&self, id: VectorId) -> &[f32] {
        let dim = self.dimension();
        &self.data[id * dim..(id + 1) * dim]
    }

    pub fn size(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Dimension, or 0 while it is still unset.
    pub fn dimension(&self) -> usize {
        self.dim.unwrap_or(0)
    }

    /// Bytes held by vector data.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (VectorId, &[f32])> + '_ {
        (0..self.count).map(move |id| (id, self.row(id)))
    }
}
