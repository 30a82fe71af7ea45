//! Bounded free lists for scratch buffers.
//!
//! Grid cells come and go every tick as entities cross boundaries, and the
//! repulsion pass needs fresh neighbor buffers per participant. Recycling the
//! backing `Vec`s keeps the steady state allocation-free.

/// Values that can be reset for reuse.
pub trait Recycle {
    /// Return to an empty state, keeping any allocation.
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// Pool usage counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquires served from the free list.
    pub hits: u64,
    /// Acquires that had to construct a new value.
    pub misses: u64,
    /// Releases discarded because the free list was full.
    pub dropped: u64,
    /// Values currently on the free list.
    pub free: usize,
}

/// A free list holding at most `bound` values.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    bound: usize,
    hits: u64,
    misses: u64,
    dropped: u64,
}

impl<T: Default + Recycle> Pool<T> {
    #[must_use]
    pub const fn new(bound: usize) -> Self {
        Self {
            free: Vec::new(),
            bound,
            hits: 0,
            misses: 0,
            dropped: 0,
        }
    }

    /// Take a value from the free list, or build a new one.
    pub fn acquire(&mut self) -> T {
        if let Some(value) = self.free.pop() {
            self.hits += 1;
            value
        } else {
            self.misses += 1;
            T::default()
        }
    }

    /// Give a value back. It is recycled, or dropped if the pool is full.
    pub fn release(&mut self, mut value: T) {
        if self.free.len() >= self.bound {
            self.dropped += 1;
            return;
        }
        value.recycle();
        self.free.push(value);
    }

    #[must_use]
    pub const fn bound(&self) -> usize {
        self.bound
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits,
            misses: self.misses,
            dropped: self.dropped,
            free: self.free.len(),
        }
    }
}
