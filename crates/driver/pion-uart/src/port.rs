//! The serial port: interrupt dispatcher plus main-loop API.
//!
//! A [`SerialPort`] ties one peripheral to one [`TxPath`] and one
//! [`RxHandler`] and owns the [`EventMailbox`] between them. It is meant to
//! live in a `static` so both contexts can reach it:
//!
//! ```ignore
//! static PORT: SerialPort<EusciA, IrqTx<64>, LineAssembler<32>> = SerialPort::new(
//!     unsafe { EusciA::new(EusciA::A0_BASE) },
//!     IrqTx::new(),
//!     LineAssembler::new(),
//! );
//!
//! // EUSCI_A0 vector:
//! fn usci_a0_isr() {
//!     PORT.on_interrupt();
//! }
//!
//! fn main() {
//!     PORT.init(&SerialConfig::default()).unwrap();
//!     loop {
//!         if PORT.wait_event(enter_low_power).contains(Event::RX) {
//!             if let Some(line) = PORT.completed_line() {
//!                 PORT.send(line.as_bytes());
//!             }
//!             PORT.rearm();
//!         }
//!     }
//! }
//! ```
//!
//! # Contexts
//!
//! [`on_interrupt`](SerialPort::on_interrupt) is the only method that may
//! run in interrupt context. Everything else belongs to the main loop.
//! [`init`](SerialPort::init) and [`set_baud`](SerialPort::set_baud) must
//! not race with the interrupt handler; they mask the peripheral's
//! interrupts while they reset state.

use core::fmt;

use pion_core::{pdebug, pinfo, ptrace};

use crate::config::SerialConfig;
use crate::error::InitError;
use crate::hw::UartHw;
use crate::mailbox::{Event, EventMailbox};
use crate::regs::{BaudRate, ClockSource, Ie, IntVector, Statw};
use crate::rx::{Line, LineAssembler, RingReceiver, RxHandler};
use crate::sync::{AtomicU32, Ordering};
use crate::tx::{TxPath, TxStatus};

/// Counters describing everything the driver absorbed instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortStats {
    /// Bytes discarded because the peripheral flagged a receive error.
    pub hw_errors: u32,
    /// Bytes the receive handler rejected or dropped.
    pub rx_overruns: u32,
    /// Whether the transmitter was idle when sampled.
    pub tx_idle: bool,
}

impl fmt::Display for PortStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hw_errors={} rx_overruns={} tx={}",
            self.hw_errors,
            self.rx_overruns,
            if self.tx_idle { "idle" } else { "busy" }
        )
    }
}

/// One UART peripheral driven by interrupts.
pub struct SerialPort<H, T, R> {
    hw: H,
    tx: T,
    rx: R,
    events: EventMailbox,
    hw_errors: AtomicU32,
}

impl<H, T, R> SerialPort<H, T, R> {
    /// Assembles a port. Does not touch hardware; call
    /// [`init`](Self::init) before enabling interrupts globally.
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new(hw: H, tx: T, rx: R) -> Self {
        Self {
            hw,
            tx,
            rx,
            events: EventMailbox::new(),
            hw_errors: AtomicU32::new(0),
        }
    }

    /// Assembles a port. Does not touch hardware; call
    /// [`init`](Self::init) before enabling interrupts globally.
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new(hw: H, tx: T, rx: R) -> Self {
        Self {
            hw,
            tx,
            rx,
            events: EventMailbox::new(),
            hw_errors: AtomicU32::new(0),
        }
    }

    /// The hardware backend.
    #[must_use]
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// The transmit path.
    #[must_use]
    pub fn tx(&self) -> &T {
        &self.tx
    }

    /// The receive handler.
    #[must_use]
    pub fn rx(&self) -> &R {
        &self.rx
    }
}

impl<H: UartHw, T: TxPath, R: RxHandler> SerialPort<H, T, R> {
    /// Configures the peripheral and resets all driver state.
    ///
    /// Masks the port's interrupts, routes the pins, programs the clock
    /// and divisors, empties the transmit queue, re-arms reception, clears
    /// the mailbox and finally enables the receive interrupt (and the
    /// transmit interrupt if the transmit path wants it).
    ///
    /// # Errors
    ///
    /// Returns [`InitError::UnsupportedBaud`] if the clock cannot generate
    /// the requested rate. The peripheral is left untouched in that case.
    pub fn init(&self, config: &SerialConfig) -> Result<(), InitError> {
        self.apply(config)?;
        pinfo!("uart: {config}, interrupts {:?}", Ie::RX | T::INTERRUPTS);
        Ok(())
    }

    /// Re-programs the line rate from SMCLK.
    ///
    /// Like [`init`](Self::init), this discards queued output and any
    /// partially received line; [`flush`](Self::flush) first to keep the
    /// output.
    ///
    /// # Errors
    ///
    /// See [`init`](Self::init).
    pub fn set_baud(&self, baud: BaudRate) -> Result<(), InitError> {
        let config = SerialConfig::new()
            .with_baud(baud)
            .with_clock(ClockSource::Smclk);
        self.apply(&config)?;
        pdebug!("uart: baud rate changed to {baud}");
        Ok(())
    }

    fn apply(&self, config: &SerialConfig) -> Result<(), InitError> {
        let divisors = config.divisors()?;

        self.hw.disable_interrupts(Ie::all());
        self.hw.route_pins();
        self.hw.configure(config.clock, divisors);

        self.tx.reset();
        self.rx.reset();
        self.events.clear();
        self.hw_errors.store(0, Ordering::Relaxed);

        self.hw.enable_interrupts(Ie::RX | T::INTERRUPTS);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Interrupt context
    // -----------------------------------------------------------------------

    /// Interrupt entry point. Call from the peripheral's vector.
    ///
    /// Reads the interrupt vector once and services exactly that cause:
    ///
    /// - **Receive**: the byte is always read (which clears the flag). If the
    ///   peripheral flagged a receive error the byte is discarded and
    ///   counted; otherwise it goes to the receive handler, and a completed
    ///   line posts [`Event::RX`] and wakes the CPU.
    /// - **Transmit**: the transmit path moves the next queued byte out; if
    ///   the queue just drained, [`Event::TX`] is posted.
    ///
    /// Other causes are ignored.
    pub fn on_interrupt(&self) {
        match IntVector::from_raw(self.hw.interrupt_vector()) {
            Some(IntVector::RxReady) => self.on_receive(),
            Some(IntVector::TxReady) => {
                if self.tx.on_transmit_complete(&self.hw) == TxStatus::Drained {
                    self.events.post(Event::TX);
                }
            }
            Some(IntVector::StartBit | IntVector::TxComplete) | None => {}
        }
    }

    fn on_receive(&self) {
        // STATW first: reading RXBUF clears the error bits.
        let status = self.hw.status();
        let byte = self.hw.read_rx();
        if status.contains(Statw::RXERR) {
            self.hw_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if self.rx.on_byte(byte) {
            self.events.post(Event::RX);
            self.hw.exit_low_power();
        }
    }

    // -----------------------------------------------------------------------
    // Main loop: transmit
    // -----------------------------------------------------------------------

    /// Transmits `bytes`, spinning while the transmit path is full.
    ///
    /// Always accepts every byte and returns `bytes.len()`. Never call from
    /// interrupt context.
    pub fn send(&self, bytes: &[u8]) -> usize {
        self.tx.send(&self.hw, bytes)
    }

    /// Transmits `text` verbatim. See [`send`](Self::send).
    pub fn print(&self, text: &str) -> usize {
        self.send(text.as_bytes())
    }

    /// Spins until all accepted output has been handed to the hardware.
    pub fn flush(&self) {
        self.tx.flush(&self.hw);
    }

    // -----------------------------------------------------------------------
    // Main loop: events
    // -----------------------------------------------------------------------

    /// Pending events, without clearing them.
    #[must_use]
    pub fn get_event(&self) -> Event {
        self.events.get()
    }

    /// Clears all pending events.
    pub fn clear_event(&self) {
        self.events.clear();
    }

    /// Pending events, cleared in the same atomic step.
    #[must_use]
    pub fn take_event(&self) -> Event {
        self.events.take()
    }

    /// Waits for at least one event, then takes and returns all pending
    /// events.
    ///
    /// `idle` runs between polls. On hardware it should enter a low-power
    /// mode with interrupts enabled in a single instruction, so an
    /// interrupt arriving between the poll and the sleep still wakes it.
    pub fn wait_event(&self, mut idle: impl FnMut()) -> Event {
        loop {
            let events = self.events.take();
            if !events.is_empty() {
                return events;
            }
            idle();
        }
    }

    /// Snapshot of the driver's counters.
    #[must_use]
    pub fn stats(&self) -> PortStats {
        PortStats {
            hw_errors: self.hw_errors(),
            rx_overruns: self.rx.overruns(),
            tx_idle: self.tx.is_idle(),
        }
    }

    /// Received bytes discarded because the peripheral flagged an error.
    #[must_use]
    pub fn hw_errors(&self) -> u32 {
        self.hw_errors.load(Ordering::Relaxed)
    }

    /// Formats `args` onto the line, translating `\n` to `\r\n`.
    pub fn write_fmt(&self, args: fmt::Arguments<'_>) {
        let mut out = self;
        // `write_str` never fails.
        let _ = fmt::Write::write_fmt(&mut out, args);
    }
}

impl<H: UartHw, T: TxPath, const N: usize> SerialPort<H, T, LineAssembler<N>> {
    /// The pending completed line, if any. See
    /// [`LineAssembler::completed_line`].
    #[must_use]
    pub fn completed_line(&self) -> Option<Line<N>> {
        self.rx.completed_line()
    }

    /// Re-enables line reception after the pending line was consumed.
    pub fn rearm(&self) {
        self.rx.rearm();
        ptrace!("uart: rx re-armed");
    }
}

impl<H: UartHw, T: TxPath, const N: usize> SerialPort<H, T, RingReceiver<N>> {
    /// Takes the oldest received byte.
    #[must_use]
    pub fn read_byte(&self) -> Option<u8> {
        self.rx.read_byte()
    }

    /// Drains received bytes into `buf`, returning how many were copied.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        self.rx.read(buf)
    }
}

impl<H: UartHw, T: TxPath, R: RxHandler> fmt::Write for &SerialPort<H, T, R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.send(b"\r");
            }
            self.send(&[byte]);
        }
        Ok(())
    }
}

impl<H, T: TxPath, R: RxHandler> fmt::Debug for SerialPort<H, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort")
            .field("events", &self.events)
            .field("hw_errors", &self.hw_errors.load(Ordering::Relaxed))
            .field("rx_overruns", &self.rx.overruns())
            .field("tx_idle", &self.tx.is_idle())
            .finish_non_exhaustive()
    }
}
