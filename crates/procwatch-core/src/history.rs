//! Fixed-capacity circular history buffers for scalar metric samples.
//!
//! One [`RingBuffer`] instance exists per tracked metric (CPU%, memory%).
//! Eviction is purely count-based: pushing into a full buffer drops the
//! single oldest element, so memory stays bounded regardless of stream
//! duration and irregular sampling intervals never expire data early.

use chrono::NaiveDateTime;
use thiserror::Error;

/// A timestamped scalar sample owned by one history buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    /// Capture time of the snapshot this sample came from.
    pub at: NaiveDateTime,
    /// Metric value (a percentage for both tracked metrics).
    pub value: f64,
}

impl HistorySample {
    #[must_use]
    pub const fn new(at: NaiveDateTime, value: f64) -> Self {
        Self { at, value }
    }
}

/// Construction-time misconfiguration: a buffer needs room for at least one
/// element. Fatal at startup, never recoverable at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("ring buffer capacity must be greater than zero")]
pub struct InvalidCapacity;

/// Fixed-capacity ring: explicit backing storage plus head/length indices.
///
/// `push` is O(1) and never reallocates after construction. Read views
/// ([`iter`](Self::iter), [`snapshot`](Self::snapshot)) never mutate the
/// buffer, so a renderer can walk the contents while ingestion continues
/// between frames.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    /// Index of the oldest element. Slots `head..head + len` (mod capacity)
    /// are occupied; all others are `None`.
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` elements.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidCapacity`] when `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        if capacity == 0 {
            return Err(InvalidCapacity);
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            head: 0,
            len: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append an element, evicting the oldest one first when full.
    ///
    /// With `capacity == 1` this always replaces the sole element.
    pub fn push(&mut self, item: T) {
        let capacity = self.capacity();
        if self.len == capacity {
            self.slots[self.head] = Some(item);
            self.head = (self.head + 1) % capacity;
        } else {
            let tail = (self.head + self.len) % capacity;
            self.slots[tail] = Some(item);
            self.len += 1;
        }
    }

    /// Iterate the contents oldest first.
    ///
    /// The iterator borrows the buffer immutably; it is finite, restartable,
    /// and cannot observe a half-applied push.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + DoubleEndedIterator + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |i| {
            self.slots[(self.head + i) % capacity]
                .as_ref()
                .expect("slot within len is occupied")
        })
    }

    /// Owned copy of the current contents, oldest first.
    ///
    /// The renderer's read view: decoupled from the ingestion path, so later
    /// pushes never shift data under a chart mid-draw.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}
