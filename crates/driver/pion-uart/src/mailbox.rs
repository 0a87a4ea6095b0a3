//! Event mailbox: the one signalling channel from interrupt to main loop.
//!
//! The interrupt dispatcher only ever ORs bits in; the main loop only ever
//! reads and clears. Flags accumulate between polls, so no event kind is
//! lost, but repeated events of one kind coalesce into a single bit: the
//! mailbox reports presence, not count.

use core::fmt;

use bitflags::bitflags;

use crate::sync::{AtomicU8, Ordering};

bitflags! {
    /// Event bits posted by the interrupt dispatcher.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Event: u8 {
        /// A receive handler reported a completed line.
        const RX = 0x01;
        /// The interrupt-driven transmitter drained its queue and went idle.
        const TX = 0x02;
    }
}

/// Bitmask shared between the interrupt handler (writer of set bits) and
/// the main loop (reader, and sole clearer).
pub struct EventMailbox {
    bits: AtomicU8,
}

impl fmt::Debug for EventMailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventMailbox").field(&self.get()).finish()
    }
}

impl EventMailbox {
    /// Creates an empty mailbox.
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Creates an empty mailbox.
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Sets `events`. Interrupt context.
    pub fn post(&self, events: Event) {
        self.bits.fetch_or(events.bits(), Ordering::Release);
    }

    /// Returns the pending events without clearing them.
    #[must_use]
    pub fn get(&self) -> Event {
        Event::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    /// Clears every pending event.
    ///
    /// An event posted between a [`get`](Self::get) and this call is cleared
    /// too; use [`take`](Self::take) where that matters.
    pub fn clear(&self) {
        self.bits.store(0, Ordering::Release);
    }

    /// Returns the pending events and clears them in one atomic step.
    #[must_use]
    pub fn take(&self) -> Event {
        Event::from_bits_truncate(self.bits.swap(0, Ordering::AcqRel))
    }
}

#[cfg(not(any(loom, shuttle)))]
impl Default for EventMailbox {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn take_never_loses_a_post() {
        loom::model(|| {
            let mailbox = Arc::new(EventMailbox::new());
            let isr = {
                let mailbox = Arc::clone(&mailbox);
                thread::spawn(move || {
                    mailbox.post(Event::RX);
                    mailbox.post(Event::TX);
                })
            };

            let first = mailbox.take();
            isr.join().unwrap();
            let second = mailbox.take();

            assert_eq!(first | second, Event::RX | Event::TX);
            assert!((first & second).is_empty());
        });
    }
}
