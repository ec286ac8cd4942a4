//! Reservoir sampling
//!
//! Keeps a uniform random sample of fixed capacity from a stream whose length
//! is not known in advance (Algorithm R). After `m >= k` items have been
//! offered, every one of them is present in the `k` slots with probability
//! exactly `k / m`.
//!
//! Slot assignment and value storage are split into two calls so a caller can
//! skip building a value that would be discarded anyway:
//!
//! ```
//! use drng_reservoir::Reservoir;
//! use rand::SeedableRng;
//!
//! let rng = rand::rngs::StdRng::seed_from_u64(7);
//! let mut reservoir = Reservoir::new(2, rng);
//! for line in ["a", "b", "c", "d"] {
//!     if let Some(slot) = reservoir.offer() {
//!         reservoir.load(slot, line.to_string()).unwrap();
//!     }
//! }
//! assert_eq!(reservoir.items().count(), 2);
//! ```

use rand::Rng;
use thiserror::Error;

/// Error type for reservoir operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservoirError {
    /// `load` was called with an index that the last `offer` did not hand out
    #[error("Stale slot: index {index} was not returned by the last offer")]
    StaleSlot { index: usize },

    /// `load` was called with an index outside of the reservoir
    #[error("Slot out of range: index {index} for capacity {capacity}")]
    OutOfRange { index: usize, capacity: usize },
}

/// Fixed-capacity uniform sample of a stream.
///
/// Slots are allocated as items arrive, so memory follows the number of items
/// actually kept rather than the capacity.
#[derive(Debug)]
pub struct Reservoir<T, R> {
    capacity: usize,
    seen: u64,
    slots: Vec<Option<T>>,
    pending: Option<usize>,
    rng: R,
}

impl<T, R: Rng> Reservoir<T, R> {
    /// Create an empty reservoir holding at most `capacity` items.
    pub fn new(capacity: usize, rng: R) -> Self {
        Self {
            capacity,
            seen: 0,
            slots: Vec::new(),
            pending: None,
            rng,
        }
    }

    /// Register one more stream item and decide where it goes.
    ///
    /// Returns the slot the item should be loaded into, or `None` if the item
    /// is not part of the sample. The first `capacity` items always get a slot,
    /// in arrival order. Afterwards item `m` (1-based) replaces a uniformly
    /// chosen slot with probability `capacity / m`.
    pub fn offer(&mut self) -> Option<usize> {
        self.seen += 1;
        let slot = if self.seen <= self.capacity as u64 {
            Some((self.seen - 1) as usize)
        } else {
            let j = self.rng.gen_range(0..self.seen);
            (j < self.capacity as u64).then_some(j as usize)
        };
        self.pending = slot;
        slot
    }

    /// Store `value` into the slot handed out by the preceding `offer`.
    pub fn load(&mut self, index: usize, value: T) -> Result<(), ReservoirError> {
        if index >= self.capacity {
            return Err(ReservoirError::OutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        if self.pending != Some(index) {
            return Err(ReservoirError::StaleSlot { index });
        }
        self.store(index, value);
        Ok(())
    }

    /// Offer an item and build it with `make` only if it gets a slot.
    pub fn add_with<F: FnOnce() -> T>(&mut self, make: F) {
        if let Some(slot) = self.offer() {
            self.store(slot, make());
        }
    }

    // `index` is below `seen`, so growing to it stays bounded by the stream
    fn store(&mut self, index: usize, value: T) {
        self.pending = None;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
    }

    /// Current contents in slot order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Consume the reservoir, returning its contents in slot order.
    pub fn into_items(self) -> Vec<T> {
        self.slots.into_iter().flatten().collect()
    }

    /// Number of items offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
