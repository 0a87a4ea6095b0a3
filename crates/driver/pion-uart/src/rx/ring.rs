//! Ring-buffer receive policy.

use core::fmt;

use super::{CR, RxHandler};
use crate::ringbuf::RingBuffer;
use crate::sync::{AtomicU32, Ordering};

/// Pushes every received byte into an `N`-byte ring for the main loop to
/// drain.
///
/// The interrupt handler is the ring's producer, the main loop its
/// consumer. Nothing is filtered; a carriage return is queued like any
/// other byte and additionally wakes the main loop. Bytes that arrive while
/// the ring is full are dropped and counted.
pub struct RingReceiver<const N: usize> {
    ring: RingBuffer<N>,
    dropped: AtomicU32,
}

impl<const N: usize> RingReceiver<N> {
    /// Creates a receiver with an empty ring.
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: RingBuffer::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Creates a receiver with an empty ring.
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new() -> Self {
        Self {
            ring: RingBuffer::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Takes the oldest received byte. Main loop only.
    #[must_use]
    pub fn read_byte(&self) -> Option<u8> {
        self.ring.get()
    }

    /// Drains up to `buf.len()` bytes into `buf`, returning how many were
    /// copied. Main loop only.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = self.ring.get() else { break };
            *slot = byte;
            n += 1;
        }
        n
    }

    /// Bytes waiting to be read.
    #[must_use]
    pub fn available(&self) -> usize {
        self.ring.len()
    }

    /// Bytes dropped because the ring was full.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(not(any(loom, shuttle)))]
impl<const N: usize> Default for RingReceiver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for RingReceiver<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingReceiver")
            .field("ring", &self.ring)
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl<const N: usize> RxHandler for RingReceiver<N> {
    fn on_byte(&self, byte: u8) -> bool {
        if self.ring.put(byte).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        byte == CR
    }

    fn reset(&self) {
        self.ring.reset();
        self.dropped.store(0, Ordering::Relaxed);
    }

    fn overruns(&self) -> u32 {
        self.dropped()
    }
}

#[cfg(all(test, not(any(loom, shuttle))))]
mod tests {
    use super::*;
    use crate::rx::LF;

    #[test]
    fn every_byte_is_queued() {
        let rx = RingReceiver::<8>::new();
        assert!(!rx.on_byte(b'a'));
        assert!(!rx.on_byte(LF));
        assert!(rx.on_byte(CR));

        let mut buf = [0; 8];
        assert_eq!(rx.read(&mut buf), 3);
        assert_eq!(&buf[..3], &[b'a', LF, CR]);
        assert_eq!(rx.read_byte(), None);
    }

    #[test]
    fn full_ring_drops_and_counts() {
        let rx = RingReceiver::<2>::new();
        rx.on_byte(1);
        rx.on_byte(2);
        // Dropped, but a terminator still wakes the main loop.
        assert!(rx.on_byte(CR));
        assert_eq!(rx.dropped(), 1);
        assert_eq!(rx.available(), 2);
        assert_eq!(rx.read_byte(), Some(1));
        assert_eq!(rx.read_byte(), Some(2));
    }

    #[test]
    fn read_stops_at_buffer_len() {
        let rx = RingReceiver::<8>::new();
        for &b in b"abcdef" {
            rx.on_byte(b);
        }
        let mut buf = [0; 4];
        assert_eq!(rx.read(&mut buf), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(rx.available(), 2);
    }

    #[test]
    fn reset_clears_ring_and_counter() {
        let rx = RingReceiver::<1>::new();
        rx.on_byte(1);
        rx.on_byte(2);
        rx.reset();
        assert_eq!(rx.dropped(), 0);
        assert_eq!(rx.read_byte(), None);
    }
}
