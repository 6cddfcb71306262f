// SPDX-License-Identifier: Apache-2.0

//! Fixed-capacity FIFO record queue shared by the capture path and the flush
//! loop. Overflow drops the excess instead of blocking the producer; callers
//! wrap the buffer in `Arc<Mutex<_>>` to serialize push/drain/requeue.

use std::collections::VecDeque;

use tracing::warn;

pub struct BoundedBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedBuffer {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends as many incoming records as fit. When the batch exceeds the
    /// free slots, exactly `capacity - len` records are accepted and the rest
    /// are dropped. Returns the accepted count.
    pub fn push(&mut self, incoming: Vec<T>) -> usize {
        let free_slots = self.capacity - self.items.len();
        let accepted = incoming.len().min(free_slots);
        if accepted < incoming.len() {
            warn!(
                dropped = incoming.len() - accepted,
                capacity = self.capacity,
                "record buffer full, dropping overflow"
            );
        }
        self.items.extend(incoming.into_iter().take(accepted));
        accepted
    }

    /// Removes and returns up to `n` records from the head, preserving order.
    pub fn take_up_to(&mut self, n: usize) -> Vec<T> {
        let n = n.min(self.items.len());
        self.items.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity_accepts_everything() {
        let mut buffer = BoundedBuffer::new(10);
        assert_eq!(buffer.push(vec![1, 2, 3]), 3);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn overflow_accepts_exactly_the_free_slots() {
        let mut buffer = BoundedBuffer::new(5);
        assert_eq!(buffer.push((0..7).collect()), 5);
        assert_eq!(buffer.len(), 5);
        // Oldest records are the ones retained.
        assert_eq!(buffer.take_up_to(5), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn size_never_exceeds_capacity_across_pushes() {
        let mut buffer = BoundedBuffer::new(8);
        for batch in [3usize, 6, 1, 8, 2] {
            buffer.push((0..batch).collect());
            assert!(buffer.len() <= buffer.capacity());
        }
    }

    #[test]
    fn drain_leaves_the_remainder_in_order() {
        let mut buffer = BoundedBuffer::new(10);
        buffer.push((0..6).collect());
        assert_eq!(buffer.take_up_to(4), vec![0, 1, 2, 3]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.take_up_to(10), vec![4, 5]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn requeued_records_append_at_the_tail() {
        let mut buffer = BoundedBuffer::new(10);
        buffer.push(vec![1, 2, 3, 4]);
        let batch = buffer.take_up_to(2);
        buffer.push(batch);
        assert_eq!(buffer.take_up_to(10), vec![3, 4, 1, 2]);
    }
}
