//! Fixed-capacity byte ring of recent PTY output.
//!
//! Single-writer (the session's read pump), multiple readers (an on-attach
//! snapshot). A [`Mutex`] serializes writes and snapshots so a reader always
//! observes a consistent point-in-time copy.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Default ring capacity: 64 KiB.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
struct Inner {
    capacity: usize,
    data: VecDeque<u8>,
}

/// Thread-safe fixed-capacity ring buffer over raw bytes.
#[derive(Debug)]
pub struct RingBuffer {
    inner: Mutex<Inner>,
}

impl RingBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner { capacity, data: VecDeque::with_capacity(capacity) }),
        }
    }

    /// Append `bytes`, overwriting the oldest content on overflow. A write
    /// larger than capacity retains only its own last `capacity` bytes.
    pub fn write(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().expect("ring buffer mutex poisoned");
        let capacity = inner.capacity;

        if bytes.len() >= capacity {
            inner.data.clear();
            inner.data.extend(&bytes[bytes.len() - capacity..]);
            return;
        }

        let overflow = (inner.data.len() + bytes.len()).saturating_sub(capacity);
        for _ in 0..overflow {
            inner.data.pop_front();
        }
        inner.data.extend(bytes);
    }

    /// Current contents in logical (oldest-first) order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        let inner = self.inner.lock().expect("ring buffer mutex poisoned");
        inner.data.iter().copied().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("ring buffer mutex poisoned");
        inner.data.clear();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("ring buffer mutex poisoned").capacity
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_past_capacity() {
        let ring = RingBuffer::new(8);
        ring.write(b"ABCDEFGHIJ");
        assert_eq!(ring.snapshot(), b"CDEFGHIJ");
    }

    #[test]
    fn incremental_writes_wrap_the_same_as_one_big_write() {
        let ring = RingBuffer::new(8);
        for chunk in [b"AB".as_slice(), b"CDEF", b"GHIJ"] {
            ring.write(chunk);
        }
        assert_eq!(ring.snapshot(), b"CDEFGHIJ");
    }

    #[test]
    fn snapshot_of_unfilled_ring_is_exact() {
        let ring = RingBuffer::new(16);
        ring.write(b"hi");
        assert_eq!(ring.snapshot(), b"hi");
    }

    #[test]
    fn clear_empties_the_ring() {
        let ring = RingBuffer::new(8);
        ring.write(b"abcdef");
        ring.clear();
        assert!(ring.snapshot().is_empty());
    }

    #[test]
    fn a_single_write_larger_than_capacity_keeps_only_its_tail() {
        let ring = RingBuffer::new(4);
        ring.write(b"ABCDEFGH");
        assert_eq!(ring.snapshot(), b"EFGH");
    }
}
