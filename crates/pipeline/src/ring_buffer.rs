//! Fixed-capacity history of the most recent frames.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::frame::Frame;

/// Recent-history window used to rebuild a clip around a detection.
pub type FrameRing = RingBuffer<Frame>;

/// FIFO that keeps the `capacity` most recent items.
///
/// Pushing onto a full buffer evicts the oldest item. Iteration and
/// [`snapshot`](Self::snapshot) yield items in push order, which is also
/// playback order for frames.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: NonZeroUsize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Append `item`, evicting the oldest item when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity.get() {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Current contents, oldest first. The buffer is left untouched.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}
