//! Fixed-capacity single-producer/single-consumer byte queue.
//!
//! [`RingBuffer`] is the only queue the driver uses: one instance carries
//! outbound bytes from the main loop to the transmit interrupt, and in the
//! ring receive policy a second one carries inbound bytes the other way.
//!
//! # Concurrency
//!
//! There is no lock. Correctness rests on roles: exactly one context calls
//! [`put`](RingBuffer::put) and exactly one calls [`get`](RingBuffer::get)
//! at any instant. The producer is the only writer of the write cursor and
//! the consumer the only writer of the read cursor, so a race between the
//! two sides can at worst make one side see the queue slightly fuller or
//! emptier than it is; the cursors themselves are never corrupted.
//!
//! Both cursors count modulo `2 * N` rather than `N`. That keeps a full
//! queue (`head - tail == N`) distinguishable from an empty one
//! (`head == tail`) without sacrificing a slot, so all `N` bytes are usable.

use core::fmt;

use crate::sync::{AtomicU8, AtomicUsize, Ordering};

/// A lock-free byte FIFO holding at most `N` bytes.
///
/// `put` and `get` run in constant time and never block. A `put` on a full
/// queue and a `get` on an empty one fail without touching any state.
///
/// # Examples
///
/// ```ignore
/// static QUEUE: RingBuffer<4> = RingBuffer::new();
///
/// QUEUE.put(b'a').unwrap();
/// assert_eq!(QUEUE.get(), Some(b'a'));
/// assert_eq!(QUEUE.get(), None);
/// ```
pub struct RingBuffer<const N: usize> {
    slots: [AtomicU8; N],
    /// Write cursor in `0..2N`. Written by the producer only.
    head: AtomicUsize,
    /// Read cursor in `0..2N`. Written by the consumer only.
    tail: AtomicUsize,
}

impl<const N: usize> RingBuffer<N> {
    const CAPACITY_CHECK: () = assert!(N > 0, "ring buffer capacity must be non-zero");

    /// Creates an empty queue. Does not allocate.
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Creates an empty queue. Does not allocate.
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            slots: core::array::from_fn(|_| AtomicU8::new(0)),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Maximum number of bytes the queue can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Advances a cursor by one slot, wrapping at `2N`.
    #[inline]
    const fn advance(cursor: usize) -> usize {
        if cursor + 1 == 2 * N { 0 } else { cursor + 1 }
    }

    /// Number of occupied slots given a pair of cursors.
    #[inline]
    const fn occupied(head: usize, tail: usize) -> usize {
        if head >= tail {
            head - tail
        } else {
            head + 2 * N - tail
        }
    }

    /// Appends `byte` at the write cursor.
    ///
    /// Producer side only.
    ///
    /// # Errors
    ///
    /// Returns the byte back if the queue is full. The queue is unchanged;
    /// the caller decides whether to retry or drop it.
    pub fn put(&self, byte: u8) -> Result<(), u8> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if Self::occupied(head, tail) == N {
            return Err(byte);
        }

        self.slots[head % N].store(byte, Ordering::Relaxed);
        // Publish the slot before the cursor that makes it visible.
        self.head.store(Self::advance(head), Ordering::Release);
        Ok(())
    }

    /// Removes the byte at the read cursor.
    ///
    /// Consumer side only. Returns `None` if the queue is empty.
    #[must_use]
    pub fn get(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let byte = self.slots[tail % N].load(Ordering::Relaxed);
        // The slot is read before the producer can see it as free.
        self.tail.store(Self::advance(tail), Ordering::Release);
        Some(byte)
    }

    /// Number of bytes currently queued.
    ///
    /// From either side this is a snapshot; the other side may change it
    /// immediately afterwards.
    #[must_use]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        Self::occupied(head, tail)
    }

    /// Returns `true` if no bytes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a `put` would currently fail.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Discards all queued bytes.
    ///
    /// Writes both cursors, so it may only be called while neither the
    /// producer nor the consumer is active, e.g. during initialisation
    /// before the peripheral's interrupts are enabled.
    pub fn reset(&self) {
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Release);
    }
}

#[cfg(not(any(loom, shuttle)))]
impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for RingBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len())
            .field("capacity", &N)
            .finish()
    }
}

#[cfg(all(test, not(any(loom, shuttle))))]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let ring = RingBuffer::<8>::new();
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 8);
    }

    #[test]
    fn get_on_empty_fails() {
        let ring = RingBuffer::<4>::new();
        assert_eq!(ring.get(), None);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn put_then_get_returns_same_byte() {
        let ring = RingBuffer::<4>::new();
        ring.put(0x5A).unwrap();
        assert_eq!(ring.get(), Some(0x5A));
        assert!(ring.is_empty());
    }

    #[test]
    fn every_slot_is_usable() {
        let ring = RingBuffer::<4>::new();
        for byte in 1..=4 {
            assert!(ring.put(byte).is_ok());
        }
        assert!(ring.is_full());
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn put_on_full_fails_without_mutation() {
        let ring = RingBuffer::<3>::new();
        ring.put(1).unwrap();
        ring.put(2).unwrap();
        ring.put(3).unwrap();

        assert_eq!(ring.put(4), Err(4));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get(), Some(1));
        assert_eq!(ring.get(), Some(2));
        assert_eq!(ring.get(), Some(3));
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn fifo_order_across_wraparound() {
        let ring = RingBuffer::<3>::new();
        let mut expected = 0u8;
        let mut next = 0u8;
        // Odd capacity, many laps: exercises both the N and 2N wrap points.
        for _ in 0..50 {
            while ring.put(next).is_ok() {
                next = next.wrapping_add(1);
            }
            assert!(ring.is_full());
            for _ in 0..2 {
                assert_eq!(ring.get(), Some(expected));
                expected = expected.wrapping_add(1);
            }
        }
        while let Some(byte) = ring.get() {
            assert_eq!(byte, expected);
            expected = expected.wrapping_add(1);
        }
        assert_eq!(expected, next);
    }

    #[test]
    fn occupancy_stays_within_bounds() {
        let ring = RingBuffer::<5>::new();
        // Deterministic pseudo-random put/get mix.
        let mut state = 0x1234_5678u32;
        for _ in 0..10_000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let before = ring.len();
            if state & 1 == 0 {
                match ring.put(state as u8) {
                    Ok(()) => assert_eq!(ring.len(), before + 1),
                    Err(_) => assert_eq!(before, 5),
                }
            } else {
                match ring.get() {
                    Some(_) => assert_eq!(ring.len(), before - 1),
                    None => assert_eq!(before, 0),
                }
            }
            assert!(ring.len() <= ring.capacity());
        }
    }

    #[test]
    fn single_slot_ring() {
        let ring = RingBuffer::<1>::new();
        ring.put(7).unwrap();
        assert!(ring.is_full());
        assert_eq!(ring.put(8), Err(8));
        assert_eq!(ring.get(), Some(7));
        ring.put(9).unwrap();
        assert_eq!(ring.get(), Some(9));
    }

    #[test]
    fn reset_discards_contents() {
        let ring = RingBuffer::<4>::new();
        ring.put(1).unwrap();
        ring.put(2).unwrap();
        let _ = ring.get();
        ring.reset();
        assert!(ring.is_empty());
        ring.put(3).unwrap();
        assert_eq!(ring.get(), Some(3));
    }

    #[test]
    fn usable_from_static() {
        static RING: RingBuffer<2> = RingBuffer::new();
        RING.put(b'x').unwrap();
        assert_eq!(RING.get(), Some(b'x'));
    }

    #[test]
    fn concurrent_producer_and_consumer() {
        const TOTAL: usize = 100_000;
        let ring = RingBuffer::<16>::new();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..TOTAL {
                    let mut byte = i as u8;
                    while let Err(back) = ring.put(byte) {
                        byte = back;
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0;
            while received < TOTAL {
                if let Some(byte) = ring.get() {
                    assert_eq!(byte, received as u8);
                    received += 1;
                }
            }
        });

        assert!(ring.is_empty());
    }
}

#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn spsc_preserves_order_under_all_interleavings() {
        loom::model(|| {
            let ring = Arc::new(RingBuffer::<2>::new());
            let producer = {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    for byte in 1..=3u8 {
                        while ring.put(byte).is_err() {
                            thread::yield_now();
                        }
                    }
                })
            };

            let mut seen = 0u8;
            while seen < 3 {
                match ring.get() {
                    Some(byte) => {
                        seen += 1;
                        assert_eq!(byte, seen);
                    }
                    None => thread::yield_now(),
                }
            }

            producer.join().unwrap();
            assert!(ring.is_empty());
        });
    }
}
