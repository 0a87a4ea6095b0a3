//! Simulated eUSCI_A peripheral.
//!
//! [`SimUart`] implements [`UartHw`] over atomics, so a test (or the
//! `pion-term` host tool) can drive the driver from two threads: the main
//! loop calls the port API while a bench thread plays the hardware with
//! [`inject_rx`](SimUart::inject_rx) / [`complete_tx`](SimUart::complete_tx)
//! and calls the port's interrupt entry point whenever
//! [`pending`](SimUart::pending) reports an enabled flag.
//!
//! Register behaviour follows the real block where the driver can observe
//! it: reading IV acknowledges the highest-priority enabled flag, reading
//! RXBUF clears the receive flag and error bits, writing TXBUF clears the
//! transmit flag, and releasing reset clears the interrupt enables.

use crate::hw::UartHw;
use crate::regs::{ClockSource, Ctlw0, Divisors, Ie, Ifg, IntVector, Statw};
use crate::ringbuf::RingBuffer;
use crate::sync::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

/// Bytes the simulated line can hold before the bench reads them.
pub const WIRE_CAPACITY: usize = 512;

/// An eUSCI_A peripheral living in host memory.
pub struct SimUart {
    ctlw0: AtomicU16,
    brw: AtomicU16,
    mctlw: AtomicU16,
    ie: AtomicU16,
    ifg: AtomicU16,
    statw: AtomicU16,
    rxbuf: AtomicU8,
    txbuf: AtomicU8,
    /// TXBUF holds a byte the bench has not clocked out yet.
    tx_in_flight: AtomicBool,
    /// Bytes leave TXBUF the moment they are written.
    instant_tx: AtomicBool,
    /// Everything that left the transmitter, in order.
    wire: RingBuffer<WIRE_CAPACITY>,
    wire_dropped: AtomicU32,
    /// TXBUF writes that clobbered a byte still in flight.
    tx_overwrites: AtomicU32,
    wakeups: AtomicU32,
    routed: AtomicBool,
}

macro_rules! sim_uart {
    () => {
        SimUart {
            ctlw0: AtomicU16::new(Ctlw0::SWRST.bits()),
            brw: AtomicU16::new(0),
            mctlw: AtomicU16::new(0),
            ie: AtomicU16::new(0),
            ifg: AtomicU16::new(Ifg::TX.bits()),
            statw: AtomicU16::new(0),
            rxbuf: AtomicU8::new(0),
            txbuf: AtomicU8::new(0),
            tx_in_flight: AtomicBool::new(false),
            instant_tx: AtomicBool::new(false),
            wire: RingBuffer::new(),
            wire_dropped: AtomicU32::new(0),
            tx_overwrites: AtomicU32::new(0),
            wakeups: AtomicU32::new(0),
            routed: AtomicBool::new(false),
        }
    };
}

impl SimUart {
    /// Creates a peripheral in its power-on state (held in reset).
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new() -> Self {
        sim_uart!()
    }

    /// Creates a peripheral in its power-on state (held in reset).
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new() -> Self {
        sim_uart!()
    }

    // -----------------------------------------------------------------------
    // Bench side
    // -----------------------------------------------------------------------

    /// When enabled, written bytes go straight onto the wire and TXBUF is
    /// immediately ready again. Otherwise the bench clocks each byte out
    /// with [`complete_tx`](Self::complete_tx).
    pub fn set_instant_tx(&self, instant: bool) {
        self.instant_tx.store(instant, Ordering::Release);
    }

    /// A character arrives on the line.
    ///
    /// If the previous character was never read, the hardware overrun bits
    /// are raised, as on the real block.
    pub fn inject_rx(&self, byte: u8) {
        let prev = Ifg::from_bits_truncate(self.ifg.load(Ordering::Acquire));
        if prev.contains(Ifg::RX) {
            self.statw
                .fetch_or((Statw::OE | Statw::RXERR).bits(), Ordering::AcqRel);
        }
        self.rxbuf.store(byte, Ordering::Relaxed);
        self.ifg.fetch_or(Ifg::RX.bits(), Ordering::Release);
    }

    /// A character arrives with a framing error.
    pub fn inject_rx_error(&self, byte: u8) {
        self.statw
            .fetch_or((Statw::FE | Statw::RXERR).bits(), Ordering::AcqRel);
        self.rxbuf.store(byte, Ordering::Relaxed);
        self.ifg.fetch_or(Ifg::RX.bits(), Ordering::Release);
    }

    /// Clocks the byte in TXBUF out onto the wire and raises the transmit
    /// flag. Returns the byte, or `None` if nothing was in flight.
    pub fn complete_tx(&self) -> Option<u8> {
        if !self.tx_in_flight.swap(false, Ordering::AcqRel) {
            return None;
        }
        let byte = self.txbuf.load(Ordering::Relaxed);
        self.push_wire(byte);
        self.ifg.fetch_or(Ifg::TX.bits(), Ordering::Release);
        Some(byte)
    }

    /// Returns `true` if an enabled interrupt flag is raised.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.ifg.load(Ordering::Acquire) & self.ie.load(Ordering::Acquire) != 0
    }

    /// Calls `isr` until no enabled flag is left. Returns how many times it
    /// ran.
    pub fn service(&self, mut isr: impl FnMut()) -> usize {
        let mut runs = 0;
        while self.pending() {
            isr();
            runs += 1;
        }
        runs
    }

    /// Next byte that left the transmitter, oldest first.
    #[must_use]
    pub fn wire_byte(&self) -> Option<u8> {
        self.wire.get()
    }

    /// Bytes that left the transmitter while the wire buffer was full.
    #[must_use]
    pub fn wire_dropped(&self) -> u32 {
        self.wire_dropped.load(Ordering::Relaxed)
    }

    /// TXBUF writes that replaced a byte still being transmitted.
    #[must_use]
    pub fn tx_overwrites(&self) -> u32 {
        self.tx_overwrites.load(Ordering::Relaxed)
    }

    /// Times the driver asked the CPU to leave low-power mode.
    #[must_use]
    pub fn wakeups(&self) -> u32 {
        self.wakeups.load(Ordering::Relaxed)
    }

    /// Whether [`UartHw::route_pins`] was called.
    #[must_use]
    pub fn routed(&self) -> bool {
        self.routed.load(Ordering::Relaxed)
    }

    /// Current interrupt enables.
    #[must_use]
    pub fn ie(&self) -> Ie {
        Ie::from_bits_truncate(self.ie.load(Ordering::Acquire))
    }

    /// Current control word 0.
    #[must_use]
    pub fn ctlw0(&self) -> Ctlw0 {
        Ctlw0::from_bits_truncate(self.ctlw0.load(Ordering::Acquire))
    }

    /// Currently programmed divisors.
    #[must_use]
    pub fn divisors(&self) -> Divisors {
        Divisors {
            brw: self.brw.load(Ordering::Acquire),
            mctlw: self.mctlw.load(Ordering::Acquire),
        }
    }

    fn push_wire(&self, byte: u8) {
        if self.wire.put(byte).is_err() {
            self.wire_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(not(any(loom, shuttle)))]
impl Default for SimUart {
    fn default() -> Self {
        Self::new()
    }
}

impl UartHw for SimUart {
    fn configure(&self, clock: ClockSource, divisors: Divisors) {
        self.ctlw0.store(Ctlw0::SWRST.bits(), Ordering::Release);
        self.ie.store(0, Ordering::Release);
        self.ifg.store(Ifg::TX.bits(), Ordering::Release);
        self.statw.store(0, Ordering::Release);
        self.tx_in_flight.store(false, Ordering::Release);

        self.ctlw0.fetch_or(clock.select_bits().bits(), Ordering::AcqRel);
        self.brw.store(divisors.brw, Ordering::Release);
        self.mctlw.store(divisors.mctlw, Ordering::Release);
        self.ctlw0.fetch_and(!Ctlw0::SWRST.bits(), Ordering::AcqRel);
    }

    fn enable_interrupts(&self, ie: Ie) {
        self.ie.fetch_or(ie.bits(), Ordering::AcqRel);
    }

    fn disable_interrupts(&self, ie: Ie) {
        self.ie.fetch_and(!ie.bits(), Ordering::AcqRel);
    }

    fn interrupt_vector(&self) -> u16 {
        let pending = Ifg::from_bits_truncate(
            self.ifg.load(Ordering::Acquire) & self.ie.load(Ordering::Acquire),
        );
        let (flag, vector) = if pending.contains(Ifg::RX) {
            (Ifg::RX, IntVector::RxReady)
        } else if pending.contains(Ifg::TX) {
            (Ifg::TX, IntVector::TxReady)
        } else if pending.contains(Ifg::START) {
            (Ifg::START, IntVector::StartBit)
        } else if pending.contains(Ifg::TX_COMPLETE) {
            (Ifg::TX_COMPLETE, IntVector::TxComplete)
        } else {
            return 0;
        };
        self.ifg.fetch_and(!flag.bits(), Ordering::AcqRel);
        vector.raw()
    }

    fn status(&self) -> Statw {
        Statw::from_bits_truncate(self.statw.load(Ordering::Acquire))
    }

    fn read_rx(&self) -> u8 {
        let byte = self.rxbuf.load(Ordering::Relaxed);
        self.statw.fetch_and(
            !(Statw::RXERR | Statw::FE | Statw::OE | Statw::PE).bits(),
            Ordering::AcqRel,
        );
        self.ifg.fetch_and(!Ifg::RX.bits(), Ordering::AcqRel);
        byte
    }

    fn write_tx(&self, byte: u8) {
        if self.tx_in_flight.load(Ordering::Acquire) {
            self.tx_overwrites.fetch_add(1, Ordering::Relaxed);
        }
        self.txbuf.store(byte, Ordering::Relaxed);
        self.ifg.fetch_and(!Ifg::TX.bits(), Ordering::AcqRel);

        if self.instant_tx.load(Ordering::Acquire) {
            self.push_wire(byte);
            self.ifg.fetch_or(Ifg::TX.bits(), Ordering::Release);
        } else {
            self.tx_in_flight.store(true, Ordering::Release);
        }
    }

    fn tx_ready(&self) -> bool {
        Ifg::from_bits_truncate(self.ifg.load(Ordering::Acquire)).contains(Ifg::TX)
    }

    fn exit_low_power(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    fn route_pins(&self) {
        self.routed.store(true, Ordering::Relaxed);
    }
}

#[cfg(all(test, not(any(loom, shuttle))))]
mod tests {
    use super::*;
    use crate::regs::BaudRate;

    fn configured() -> SimUart {
        let sim = SimUart::new();
        let div = BaudRate::Baud9600.divisors(ClockSource::Smclk).unwrap();
        sim.configure(ClockSource::Smclk, div);
        sim
    }

    #[test]
    fn configure_releases_reset_and_clears_enables() {
        let sim = SimUart::new();
        sim.enable_interrupts(Ie::RX);
        let div = BaudRate::Baud9600.divisors(ClockSource::Smclk).unwrap();
        sim.configure(ClockSource::Smclk, div);

        assert!(!sim.ctlw0().contains(Ctlw0::SWRST));
        assert_eq!(sim.divisors(), div);
        assert!(sim.ie().is_empty());
        assert!(sim.tx_ready());
    }

    #[test]
    fn vector_reports_rx_before_tx_and_acknowledges() {
        let sim = configured();
        sim.enable_interrupts(Ie::RX | Ie::TX);
        sim.inject_rx(b'q');

        assert_eq!(sim.interrupt_vector(), IntVector::RxReady.raw());
        assert_eq!(sim.interrupt_vector(), IntVector::TxReady.raw());
        assert_eq!(sim.interrupt_vector(), 0);
        assert!(!sim.pending());
    }

    #[test]
    fn disabled_sources_are_not_reported() {
        let sim = configured();
        sim.enable_interrupts(Ie::RX);
        assert!(!sim.pending());
        assert_eq!(sim.interrupt_vector(), 0);
    }

    #[test]
    fn unread_character_raises_overrun() {
        let sim = configured();
        sim.inject_rx(b'a');
        sim.inject_rx(b'b');
        assert!(sim.status().contains(Statw::RXERR | Statw::OE));
        assert_eq!(sim.read_rx(), b'b');
        assert!(sim.status().is_empty());
    }

    #[test]
    fn tx_in_flight_until_completed() {
        let sim = configured();
        sim.write_tx(b'1');
        assert!(!sim.tx_ready());
        assert_eq!(sim.wire_byte(), None);

        assert_eq!(sim.complete_tx(), Some(b'1'));
        assert!(sim.tx_ready());
        assert_eq!(sim.complete_tx(), None);
        assert_eq!(sim.wire_byte(), Some(b'1'));
    }

    #[test]
    fn overwrite_is_counted() {
        let sim = configured();
        sim.write_tx(b'1');
        sim.write_tx(b'2');
        assert_eq!(sim.tx_overwrites(), 1);
    }

    #[test]
    fn instant_tx_goes_straight_to_the_wire() {
        let sim = configured();
        sim.set_instant_tx(true);
        sim.write_tx(b'x');
        assert!(sim.tx_ready());
        assert_eq!(sim.wire_byte(), Some(b'x'));
    }
}
