//! # Command Channel
//!
//! A fixed-capacity FIFO ring between the ingress side (producer) and the
//! render side (consumer), guarded by a [`SpinLock`].
//!
//! ```text
//!   head ──► next write      tail ──► next read
//!   full  : (head + 1) % N == tail   (one slot always empty)
//!   empty : head == tail
//! ```
//!
//! A push into a full ring is dropped and counted. Nothing blocks except the
//! lock itself, and the lock is only held for one index update.

use std::sync::atomic::{AtomicU64, Ordering};

use super::SpinLock;

struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
}

impl<T> Ring<T> {
    #[inline]
    fn len(&self) -> usize {
        let capacity = self.slots.len();
        (self.head + capacity - self.tail) % capacity
    }

    #[inline]
    fn push(&mut self, record: T) -> Result<(), T> {
        let next = (self.head + 1) % self.slots.len();
        if next == self.tail {
            return Err(record);
        }
        self.slots[self.head] = Some(record);
        self.head = next;
        Ok(())
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let record = self.slots[self.tail].take();
        self.tail = (self.tail + 1) % self.slots.len();
        record
    }
}

/// Counters kept by a [`CommandChannel`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Records accepted.
    pub pushed: u64,
    /// Records rejected because the ring was full.
    pub dropped: u64,
    /// Records handed to a drain sink.
    pub drained: u64,
    /// Lock acquisitions that had to spin.
    pub contended: u64,
}

/// Bounded FIFO command channel shared by both units.
///
/// `capacity` ring slots hold at most `capacity - 1` records.
///
/// ## Usage
///
/// ```rust,ignore
/// let channel = Arc::new(CommandChannel::new(32));
///
/// // Ingress side
/// if !channel.try_push(record) { /* dropped and counted */ }
///
/// // Render side
/// channel.drain(|record| engine.execute(&record, now));
/// ```
pub struct CommandChannel<T> {
    ring: SpinLock<Ring<T>>,
    capacity: usize,
    pushed: AtomicU64,
    dropped: AtomicU64,
    drained: AtomicU64,
}

impl<T> CommandChannel<T> {
    /// Creates a ring with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` (a ring of one slot can never hold a record).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "Command channel needs at least two slots");
        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Self {
            ring: SpinLock::new(Ring { slots: slots.into_boxed_slice(), head: 0, tail: 0 }),
            capacity,
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            drained: AtomicU64::new(0),
        }
    }

    /// Number of ring slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records the ring can hold at once.
    #[inline]
    #[must_use]
    pub const fn usable_capacity(&self) -> usize {
        self.capacity - 1
    }

    /// Records currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a record. Returns false, leaving the ring untouched, if full.
    pub fn try_push(&self, record: T) -> bool {
        let result = self.ring.lock().push(record);
        match result {
            Ok(()) => {
                self.pushed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!("Command queue full, record dropped ({dropped} total)");
                false
            }
        }
    }

    /// Pops every record queued at the time of the call, oldest first, and
    /// hands each to `sink` outside the lock. Returns the number applied.
    pub fn drain(&self, mut sink: impl FnMut(T)) -> usize {
        let pending = self.ring.lock().len();
        let mut applied = 0;
        while applied < pending {
            let Some(record) = self.ring.lock().pop() else {
                break;
            };
            sink(record);
            applied += 1;
        }
        self.drained.fetch_add(applied as u64, Ordering::Relaxed);
        applied
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            contended: self.ring.contended(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_capacity_minus_one_accepted() {
        let channel = CommandChannel::new(8);
        for i in 0..7 {
            assert!(channel.try_push(i), "push {i} should fit");
        }
        assert!(!channel.try_push(7));
        assert_eq!(channel.len(), 7);

        let stats = channel.stats();
        assert_eq!(stats.pushed, 7);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_full_push_leaves_contents() {
        let channel = CommandChannel::new(3);
        assert!(channel.try_push('a'));
        assert!(channel.try_push('b'));
        assert!(!channel.try_push('c'));

        let mut out = Vec::new();
        channel.drain(|c| out.push(c));
        assert_eq!(out, vec!['a', 'b']);
    }

    #[test]
    fn test_fifo_across_wraparound() {
        let channel = CommandChannel::new(4);
        let mut out = Vec::new();

        for round in 0..5 {
            for i in 0..3 {
                assert!(channel.try_push(round * 10 + i));
            }
            assert_eq!(channel.drain(|v| out.push(v)), 3);
        }

        let expected: Vec<i32> = (0..5).flat_map(|r| (0..3).map(move |i| r * 10 + i)).collect();
        assert_eq!(out, expected);
        assert!(channel.is_empty());
        assert_eq!(channel.stats().drained, 15);
    }

    #[test]
    fn test_drain_empty() {
        let channel: CommandChannel<u8> = CommandChannel::new(2);
        assert_eq!(channel.drain(|_| panic!("nothing to drain")), 0);
    }

    #[test]
    fn test_concurrent_producer_keeps_order() {
        let channel = Arc::new(CommandChannel::new(16));
        let total = 5_000u32;

        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let mut accepted = Vec::new();
                for i in 0..total {
                    if channel.try_push(i) {
                        accepted.push(i);
                    }
                }
                accepted
            })
        };

        let mut received = Vec::new();
        while !producer.is_finished() {
            channel.drain(|v| received.push(v));
        }
        let accepted = producer.join().unwrap();
        channel.drain(|v| received.push(v));

        assert_eq!(received, accepted);
        let stats = channel.stats();
        assert_eq!(stats.pushed + stats.dropped, u64::from(total));
    }
}
