//! Chunk FIFO
//!
//! `FifoQueue` is the plain ordered container. `SharedQueue` wraps it with
//! the locking, capacity and overflow handling that concurrent writers and
//! readers need.
//!
//! # Sequence numbers
//!
//! Every appended chunk gets the next sequence number. Numbers of queued
//! chunks are contiguous from head to tail, which lets a cursor find the
//! successor of the chunk it last read in O(1), even after the head moved.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::config::OverflowPolicy;
use crate::error::{DeviceError, Result};

/// Position of a chunk in the order of appends
pub type Seq = u64;

#[derive(Debug)]
struct Entry {
    seq: Seq,
    chunk: Chunk,
}

/// Ordered sequence of chunks, append at tail, remove at head
///
/// Emptiness is derived from the entries, never tracked separately.
#[derive(Debug, Default)]
pub struct FifoQueue {
    entries: VecDeque<Entry>,
    next_seq: Seq,
}

impl FifoQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of queued bytes
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.entries.iter().map(|e| e.chunk.len()).sum()
    }

    /// Add a chunk at the tail and return its sequence number
    pub fn append(&mut self, chunk: Chunk) -> Seq {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Entry { seq, chunk });
        seq
    }

    /// Remove and return the head chunk
    pub fn pop_front(&mut self) -> Option<Chunk> {
        self.entries.pop_front().map(|e| e.chunk)
    }

    #[must_use]
    pub fn peek_front(&self) -> Option<(Seq, &Chunk)> {
        self.entries.front().map(|e| (e.seq, &e.chunk))
    }

    /// Swap the head chunk for `chunk`, keeping its place in the order
    ///
    /// Returns false if the queue is empty.
    pub fn replace_front(&mut self, chunk: Chunk) -> bool {
        match self.entries.front_mut() {
            Some(entry) => {
                entry.chunk = chunk;
                true
            }
            None => false,
        }
    }

    /// First queued chunk that was appended after `seq`
    #[must_use]
    pub fn next_after(&self, seq: Seq) -> Option<(Seq, Chunk)> {
        let head = self.entries.front()?.seq;
        let wanted = seq.saturating_add(1).max(head);
        let index = usize::try_from(wanted - head).ok()?;
        self.entries.get(index).map(|e| {
            debug_assert_eq!(e.seq, wanted);
            (e.seq, e.chunk.clone())
        })
    }

    /// Drop every chunk; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}

struct QueueInner {
    fifo: Mutex<FifoQueue>,
    space: Condvar,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
}

/// Thread-safe queue handle
///
/// Clones share the same underlying queue. All access goes through one
/// `parking_lot::Mutex`, so an append and a head removal never interleave.
/// The condition variable wakes blocked writers when space frees up.
#[derive(Clone)]
pub struct SharedQueue(Arc<QueueInner>);

impl SharedQueue {
    #[must_use]
    pub fn new(capacity: Option<usize>, overflow: OverflowPolicy) -> Self {
        Self(Arc::new(QueueInner {
            fifo: Mutex::new(FifoQueue::new()),
            space: Condvar::new(),
            capacity,
            overflow,
        }))
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, OverflowPolicy::Reject)
    }

    /// Append a chunk, honouring capacity and overflow policy
    ///
    /// # Errors
    /// `ResourceExhausted` if the queue is full and the policy is `Reject`.
    pub fn push(&self, chunk: Chunk) -> Result<Seq> {
        let mut fifo = self.0.fifo.lock();
        if let Some(capacity) = self.0.capacity {
            while fifo.len() >= capacity {
                match self.0.overflow {
                    OverflowPolicy::Reject => {
                        return Err(DeviceError::ResourceExhausted { capacity });
                    }
                    OverflowPolicy::Block => {
                        log::debug!("queue: full ({capacity} chunks), writer waits");
                        self.0.space.wait(&mut fifo);
                    }
                }
            }
        }
        Ok(fifo.append(chunk))
    }

    /// Lock the queue for a compound operation
    ///
    /// Call `space_freed` after removing chunks through the guard.
    #[must_use]
    pub fn lock(&self) -> MutexGuard<'_, FifoQueue> {
        self.0.fifo.lock()
    }

    /// Wake writers waiting for free space
    pub fn space_freed(&self) {
        if self.0.capacity.is_some() {
            self.0.space.notify_all();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.fifo.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.fifo.lock().is_empty()
    }

    /// Drop every chunk; returns how many were dropped
    pub fn clear(&self) -> usize {
        let n = self.0.fifo.lock().clear();
        self.space_freed();
        n
    }
}

impl fmt::Debug for SharedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fifo = self.0.fifo.lock();
        write!(
            f,
            "SharedQueue(chunks={}, bytes={}, capacity={:?}, overflow={:?})",
            fifo.len(),
            fifo.bytes(),
            self.0.capacity,
            self.0.overflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(data: &[u8]) -> Chunk {
        Chunk::from_slice(data)
    }

    #[test]
    fn test_fifo_order() {
        let mut q = FifoQueue::new();
        q.append(chunk(b"one"));
        q.append(chunk(b"two"));
        q.append(chunk(b"three"));

        assert_eq!(q.len(), 3);
        assert_eq!(&*q.pop_front().unwrap(), b"one");
        assert_eq!(&*q.pop_front().unwrap(), b"two");
        assert_eq!(&*q.pop_front().unwrap(), b"three");
        assert!(q.pop_front().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_emptiness_follows_contents() {
        let mut q = FifoQueue::new();
        assert!(q.is_empty());
        q.append(chunk(b""));
        assert!(!q.is_empty());
        q.pop_front();
        assert!(q.is_empty());
        assert!(q.peek_front().is_none());
    }

    #[test]
    fn test_next_after_skips_popped_chunks() {
        let mut q = FifoQueue::new();
        let a = q.append(chunk(b"a"));
        q.append(chunk(b"b"));
        let c = q.append(chunk(b"c"));

        let (seq, next) = q.next_after(a).unwrap();
        assert_eq!(&*next, b"b");
        assert_eq!(seq, a + 1);

        q.pop_front();
        q.pop_front();
        // "b" is gone, the successor of "a" is now the head
        let (seq, next) = q.next_after(a).unwrap();
        assert_eq!(seq, c);
        assert_eq!(&*next, b"c");

        assert!(q.next_after(c).is_none());
    }

    #[test]
    fn test_replace_front_keeps_sequence() {
        let mut q = FifoQueue::new();
        let first = q.append(chunk(b"abcdef"));
        q.append(chunk(b"next"));
        assert!(q.replace_front(chunk(b"def")));
        let (seq, head) = q.peek_front().unwrap();
        assert_eq!(seq, first);
        assert_eq!(&**head, b"def");
    }

    #[test]
    fn test_sequence_continues_after_clear() {
        let mut q = FifoQueue::new();
        q.append(chunk(b"x"));
        q.append(chunk(b"y"));
        assert_eq!(q.clear(), 2);
        let seq = q.append(chunk(b"z"));
        assert_eq!(seq, 2);
        assert_eq!(q.bytes(), 1);
    }

    #[test]
    fn test_shared_queue_rejects_when_full() {
        let q = SharedQueue::new(Some(2), OverflowPolicy::Reject);
        q.push(chunk(b"1")).unwrap();
        q.push(chunk(b"2")).unwrap();
        let err = q.push(chunk(b"3")).unwrap_err();
        assert_eq!(err, DeviceError::ResourceExhausted { capacity: 2 });
        // Existing contents untouched
        assert_eq!(q.len(), 2);
        assert_eq!(&*q.lock().pop_front().unwrap(), b"1");
    }

    #[test]
    fn test_shared_queue_clones_share_state() {
        let q1 = SharedQueue::unbounded();
        let q2 = q1.clone();
        q1.push(chunk(b"shared")).unwrap();
        assert_eq!(q2.len(), 1);
        assert_eq!(q2.clear(), 1);
        assert!(q1.is_empty());
    }
}
