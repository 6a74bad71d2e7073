//! Reusable visited markers for graph traversal.
//!
//! Each marker array stores the epoch in which an id was last seen, so
//! resetting between queries is a counter bump instead of an O(n) clear.
//! Arrays are pooled per thread and handed out through [`VisitedGuard`].

use std::cell::RefCell;

const MIN_CAPACITY: usize = 1024;
const POOL_SIZE: usize = 4;

thread_local! {
    static POOL: RefCell<Vec<EpochMarks>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
struct EpochMarks {
    marks: Vec<u32>,
    epoch: u32,
}

impl EpochMarks {
    fn reset(&mut self, capacity: usize) {
        if self.marks.len() < capacity {
            self.marks.resize(capacity.max(MIN_CAPACITY), 0);
        }
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.marks.fill(0);
            self.epoch = 1;
        }
    }
}

/// Visited set borrowed from the thread-local pool; returned on drop.
pub(crate) struct VisitedGuard {
    inner: EpochMarks,
}

impl VisitedGuard {
    /// A cleared set able to hold ids `< capacity` without growing.
    pub fn new(capacity: usize) -> Self {
        let mut inner = POOL
            .with(|pool| pool.borrow_mut().pop())
            .unwrap_or_default();
        inner.reset(capacity);
        Self { inner }
    }

    /// Mark `id`; returns `false` if it was already marked.
    #[inline]
    pub fn insert(&mut self, id: usize) -> bool {
        if id >= self.inner.marks.len() {
            let len = (id + 1).next_power_of_two().max(MIN_CAPACITY);
            self.inner.marks.resize(len, 0);
        }
        let slot = &mut self.inner.marks[id];
        if *slot == self.inner.epoch {
            false
        } else {
            *slot = self.inner.epoch;
            true
        }
    }

    #[cfg(test)]
    pub fn contains(&self, id: usize) -> bool {
        self.inner.marks.get(id) == Some(&self.inner.epoch)
    }
}

impl Drop for VisitedGuard {
    fn drop(&mut self) {
        let marks = std::mem::take(&mut self.inner);
        POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < POOL_SIZE {
                pool.push(marks);
            }
        });
    }
}
