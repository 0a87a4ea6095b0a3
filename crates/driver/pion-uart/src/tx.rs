//! Transmit paths.
//!
//! A [`TxPath`] is the port's transmit-completion slot: it accepts bytes
//! from the main loop and, when interrupt driven, moves them into the
//! hardware one at a time from the transmit interrupt.
//!
//! - [`IrqTx`] queues bytes in a [`RingBuffer`] and lets the transmit
//!   interrupt drain it.
//! - [`PolledTx`] writes each byte directly after busy-waiting for the
//!   transmit buffer. It keeps no state and never enables the transmit
//!   interrupt.
//!
//! Both block the caller until every byte is accepted; neither ever
//! reports a failure.

use crate::hw::UartHw;
use crate::regs::Ie;
use crate::ringbuf::RingBuffer;
use crate::sync::{AtomicBool, Ordering, fence, spin_hint};

/// Engine state reported by [`TxPath::on_transmit_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Another byte was handed to the hardware.
    Busy,
    /// The queue ran dry and the engine went idle.
    Drained,
    /// The engine was not transmitting; nothing was done.
    Idle,
}

/// Outbound half of a serial port.
pub trait TxPath {
    /// Interrupt sources this path needs enabled.
    const INTERRUPTS: Ie;

    /// Returns the path to idle with nothing queued.
    ///
    /// Initialisation only, while the peripheral's interrupts are disabled.
    fn reset(&self);

    /// Queues (or writes) all of `bytes`, spinning while the hardware
    /// catches up. Returns the number of bytes accepted, which is always
    /// `bytes.len()`.
    ///
    /// Main loop only. Must not be called from the interrupt handler: the
    /// spin would wait for an interrupt that cannot run.
    fn send<H: UartHw + ?Sized>(&self, hw: &H, bytes: &[u8]) -> usize;

    /// Transmit-buffer-empty interrupt. Interrupt context only.
    fn on_transmit_complete<H: UartHw + ?Sized>(&self, hw: &H) -> TxStatus;

    /// Spins until everything accepted so far has been handed to the
    /// hardware. Main loop only.
    fn flush<H: UartHw + ?Sized>(&self, hw: &H);

    /// Returns `true` if no byte is being transmitted.
    fn is_idle(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Interrupt-driven
// ---------------------------------------------------------------------------

/// Interrupt-driven transmitter with an `N`-byte queue.
///
/// # States
///
/// - **Idle** (`busy == false`): no byte in the hardware. The main loop owns
///   the consumer side of the queue.
/// - **Busy** (`busy == true`): a byte is being clocked out. The transmit
///   interrupt owns the consumer side and, on each completion, either
///   writes the next byte (stays busy) or clears the flag (goes idle).
///
/// The busy flag is therefore also the token for the queue's single
/// consumer role, and only the holder writes it. The idle-to-busy
/// transition (the *kick*) is a compare-and-swap from the main loop after
/// it queues a byte; the busy-to-idle transition is a store from the
/// interrupt followed by one re-check of the queue, so a byte queued while
/// the interrupt was giving up the token is never stranded.
pub struct IrqTx<const N: usize> {
    queue: RingBuffer<N>,
    busy: AtomicBool,
}

impl<const N: usize> IrqTx<N> {
    /// Creates an idle transmitter with an empty queue.
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: RingBuffer::new(),
            busy: AtomicBool::new(false),
        }
    }

    /// Creates an idle transmitter with an empty queue.
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: RingBuffer::new(),
            busy: AtomicBool::new(false),
        }
    }

    /// The outbound queue.
    #[must_use]
    pub fn queue(&self) -> &RingBuffer<N> {
        &self.queue
    }

    /// Moves the engine from idle to busy if it is idle and has something
    /// to send. Main loop.
    fn kick<H: UartHw + ?Sized>(&self, hw: &H) {
        // Pairs with the fence in `on_transmit_complete`: either we see the
        // token released, or the interrupt sees the byte we just queued.
        fence(Ordering::SeqCst);
        if self.busy.load(Ordering::Relaxed) {
            return;
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        match self.queue.get() {
            Some(byte) => hw.write_tx(byte),
            None => self.busy.store(false, Ordering::Release),
        }
    }
}

#[cfg(not(any(loom, shuttle)))]
impl<const N: usize> Default for IrqTx<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TxPath for IrqTx<N> {
    const INTERRUPTS: Ie = Ie::TX;

    fn reset(&self) {
        self.queue.reset();
        self.busy.store(false, Ordering::Release);
    }

    fn send<H: UartHw + ?Sized>(&self, hw: &H, bytes: &[u8]) -> usize {
        for &byte in bytes {
            while self.queue.put(byte).is_err() {
                // Full: the interrupt is draining; wait for a free slot.
                self.kick(hw);
                spin_hint();
            }
            self.kick(hw);
        }
        bytes.len()
    }

    fn on_transmit_complete<H: UartHw + ?Sized>(&self, hw: &H) -> TxStatus {
        // A completion while idle belongs to nobody (e.g. the flag that is
        // set when interrupts are first enabled).
        if !self.busy.load(Ordering::Acquire) {
            return TxStatus::Idle;
        }

        if let Some(byte) = self.queue.get() {
            hw.write_tx(byte);
            return TxStatus::Busy;
        }

        self.busy.store(false, Ordering::Release);
        fence(Ordering::SeqCst);
        if !self.queue.is_empty()
            && self
                .busy
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            if let Some(byte) = self.queue.get() {
                hw.write_tx(byte);
                return TxStatus::Busy;
            }
            self.busy.store(false, Ordering::Release);
        }
        TxStatus::Drained
    }

    fn flush<H: UartHw + ?Sized>(&self, hw: &H) {
        while !self.queue.is_empty() || self.busy.load(Ordering::Acquire) {
            self.kick(hw);
            spin_hint();
        }
    }

    fn is_idle(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Polled
// ---------------------------------------------------------------------------

/// Polled transmitter: busy-waits on the transmit-ready flag for every
/// byte. No queue, no interrupt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolledTx;

impl PolledTx {
    /// Creates the polled transmitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TxPath for PolledTx {
    const INTERRUPTS: Ie = Ie::empty();

    fn reset(&self) {}

    fn send<H: UartHw + ?Sized>(&self, hw: &H, bytes: &[u8]) -> usize {
        for &byte in bytes {
            while !hw.tx_ready() {
                spin_hint();
            }
            hw.write_tx(byte);
        }
        bytes.len()
    }

    fn on_transmit_complete<H: UartHw + ?Sized>(&self, _hw: &H) -> TxStatus {
        TxStatus::Idle
    }

    fn flush<H: UartHw + ?Sized>(&self, hw: &H) {
        while !hw.tx_ready() {
            spin_hint();
        }
    }

    fn is_idle(&self) -> bool {
        true
    }
}

#[cfg(all(test, not(any(loom, shuttle))))]
mod tests {
    use super::*;
    use crate::regs::{BaudRate, ClockSource};
    use crate::sim::SimUart;

    fn sim() -> SimUart {
        let sim = SimUart::new();
        let div = BaudRate::Baud115200.divisors(ClockSource::Smclk).unwrap();
        sim.configure(ClockSource::Smclk, div);
        sim
    }

    fn wire(sim: &SimUart) -> Vec<u8> {
        core::iter::from_fn(|| sim.wire_byte()).collect()
    }

    #[test]
    fn first_byte_kicks_the_engine() {
        let hw = sim();
        let tx = IrqTx::<8>::new();
        assert!(tx.is_idle());

        assert_eq!(tx.send(&hw, b"ab"), 2);
        assert!(!tx.is_idle());
        // 'a' is in the hardware, 'b' waits in the queue.
        assert_eq!(tx.queue().len(), 1);
        assert_eq!(hw.complete_tx(), Some(b'a'));
    }

    #[test]
    fn completions_drain_in_order_then_go_idle() {
        let hw = sim();
        let tx = IrqTx::<8>::new();
        tx.send(&hw, b"xyz");

        let mut statuses = Vec::new();
        while hw.complete_tx().is_some() {
            statuses.push(tx.on_transmit_complete(&hw));
        }

        assert_eq!(
            statuses,
            [TxStatus::Busy, TxStatus::Busy, TxStatus::Drained]
        );
        assert!(tx.is_idle());
        assert_eq!(wire(&hw), b"xyz");
        assert_eq!(hw.tx_overwrites(), 0);
    }

    #[test]
    fn completion_while_idle_is_ignored() {
        let hw = sim();
        let tx = IrqTx::<4>::new();
        assert_eq!(tx.on_transmit_complete(&hw), TxStatus::Idle);
        assert!(tx.is_idle());
    }

    #[test]
    fn send_after_drain_kicks_again() {
        let hw = sim();
        let tx = IrqTx::<4>::new();
        tx.send(&hw, b"1");
        hw.complete_tx();
        assert_eq!(tx.on_transmit_complete(&hw), TxStatus::Drained);

        tx.send(&hw, b"2");
        assert_eq!(hw.complete_tx(), Some(b'2'));
    }

    #[test]
    fn reset_returns_to_idle() {
        let hw = sim();
        let tx = IrqTx::<4>::new();
        tx.send(&hw, b"abc");
        tx.reset();
        assert!(tx.is_idle());
        assert!(tx.queue().is_empty());
    }

    #[test]
    fn more_bytes_than_queue_capacity_all_arrive_in_order() {
        let hw = sim();
        let tx = IrqTx::<4>::new();
        let message: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut received = Vec::with_capacity(message.len());

        std::thread::scope(|s| {
            s.spawn(|| assert_eq!(tx.send(&hw, &message), message.len()));

            while received.len() < message.len() {
                if hw.complete_tx().is_some() {
                    tx.on_transmit_complete(&hw);
                }
                received.extend(core::iter::from_fn(|| hw.wire_byte()));
                std::hint::spin_loop();
            }
        });

        assert_eq!(received, message);
        assert_eq!(hw.tx_overwrites(), 0);
        assert!(tx.is_idle());
    }

    #[test]
    fn flush_waits_for_the_interrupt_to_drain() {
        let hw = sim();
        let tx = IrqTx::<16>::new();
        tx.send(&hw, b"flush me");

        std::thread::scope(|s| {
            s.spawn(|| {
                while hw.complete_tx().is_some() {
                    tx.on_transmit_complete(&hw);
                }
            });
            tx.flush(&hw);
        });

        assert!(tx.is_idle());
        assert_eq!(wire(&hw), b"flush me");
    }

    #[test]
    fn polled_writes_directly() {
        let hw = sim();
        hw.set_instant_tx(true);
        let tx = PolledTx::new();

        assert_eq!(tx.send(&hw, b"poll"), 4);
        assert_eq!(wire(&hw), b"poll");
        assert!(tx.is_idle());
        assert_eq!(tx.on_transmit_complete(&hw), TxStatus::Idle);
        assert!(PolledTx::INTERRUPTS.is_empty());
    }

    #[test]
    fn polled_waits_for_tx_ready() {
        let hw = sim();
        let tx = PolledTx::new();

        std::thread::scope(|s| {
            s.spawn(|| {
                let mut clocked = 0;
                while clocked < 3 {
                    if hw.complete_tx().is_some() {
                        clocked += 1;
                    }
                    std::hint::spin_loop();
                }
            });
            tx.send(&hw, b"abc");
        });

        assert_eq!(wire(&hw), b"abc");
        assert_eq!(hw.tx_overwrites(), 0);
    }
}

#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use crate::regs::{ClockSource, Divisors, Statw};
    use crate::sync::{AtomicU8, AtomicU32};
    use loom::sync::Arc;
    use loom::thread;

    /// One-register transmitter: `slot` holds the in-flight byte (0 = empty).
    struct Wire {
        slot: AtomicU8,
        overwrites: AtomicU32,
    }

    impl UartHw for Wire {
        fn configure(&self, _clock: ClockSource, _divisors: Divisors) {}
        fn enable_interrupts(&self, _ie: Ie) {}
        fn disable_interrupts(&self, _ie: Ie) {}
        fn interrupt_vector(&self) -> u16 {
            0
        }
        fn status(&self) -> Statw {
            Statw::empty()
        }
        fn read_rx(&self) -> u8 {
            0
        }
        fn write_tx(&self, byte: u8) {
            if self.slot.swap(byte, Ordering::AcqRel) != 0 {
                self.overwrites.fetch_add(1, Ordering::Relaxed);
            }
        }
        fn tx_ready(&self) -> bool {
            self.slot.load(Ordering::Acquire) == 0
        }
    }

    #[test]
    fn token_handoff_delivers_every_byte_once() {
        loom::model(|| {
            let hw = Arc::new(Wire {
                slot: AtomicU8::new(0),
                overwrites: AtomicU32::new(0),
            });
            let tx = Arc::new(IrqTx::<1>::new());

            let main = {
                let (hw, tx) = (Arc::clone(&hw), Arc::clone(&tx));
                thread::spawn(move || {
                    tx.send(&*hw, &[1, 2]);
                })
            };

            // The "interrupt": clock out whatever is in flight.
            let mut delivered = Vec::new();
            while delivered.len() < 2 {
                let byte = hw.slot.swap(0, Ordering::AcqRel);
                if byte == 0 {
                    thread::yield_now();
                    continue;
                }
                delivered.push(byte);
                tx.on_transmit_complete(&*hw);
            }

            main.join().unwrap();
            assert_eq!(delivered, [1, 2]);
            assert_eq!(hw.overwrites.load(Ordering::Relaxed), 0);
        });
    }
}
