//! Hardware access seam.
//!
//! The driver logic never touches registers directly; it goes through
//! [`UartHw`]. [`EusciA`](crate::eusci::EusciA) implements it over the real
//! memory-mapped block and [`SimUart`](crate::sim::SimUart) over atomics for
//! host tests. Methods take `&self` because the registers are shared between
//! the main loop and the interrupt handler; the driver's single-writer rules
//! decide who may call what.

use crate::regs::{ClockSource, Divisors, Ie, Statw};

/// Register-level operations on one UART peripheral.
pub trait UartHw {
    /// Holds the peripheral in reset, selects `clock` and programs the baud
    /// divisors, then releases reset.
    ///
    /// Releasing reset clears all interrupt enables on real hardware;
    /// callers re-enable them afterwards.
    fn configure(&self, clock: ClockSource, divisors: Divisors);

    /// Sets the given interrupt enable bits.
    fn enable_interrupts(&self, ie: Ie);

    /// Clears the given interrupt enable bits.
    fn disable_interrupts(&self, ie: Ie);

    /// Reads the interrupt vector register, acknowledging the
    /// highest-priority pending source. Returns 0 if nothing is pending.
    fn interrupt_vector(&self) -> u16;

    /// Reads the status word. Must be read before [`read_rx`](Self::read_rx)
    /// since reading the receive buffer clears the error bits.
    fn status(&self) -> Statw;

    /// Reads the receive buffer, clearing the receive flag and any receive
    /// error condition.
    fn read_rx(&self) -> u8;

    /// Writes the transmit buffer.
    fn write_tx(&self, byte: u8);

    /// Returns `true` if the transmit buffer can take a byte.
    fn tx_ready(&self) -> bool;

    /// Asks the CPU to stay awake after the current interrupt returns, so a
    /// main loop sleeping in a low-power mode observes the new event.
    fn exit_low_power(&self) {}

    /// Routes the RX/TX pins to the peripheral.
    ///
    /// Pin multiplexing is board specific; the default does nothing.
    fn route_pins(&self) {}
}

impl<H: UartHw + ?Sized> UartHw for &H {
    fn configure(&self, clock: ClockSource, divisors: Divisors) {
        (**self).configure(clock, divisors);
    }

    fn enable_interrupts(&self, ie: Ie) {
        (**self).enable_interrupts(ie);
    }

    fn disable_interrupts(&self, ie: Ie) {
        (**self).disable_interrupts(ie);
    }

    fn interrupt_vector(&self) -> u16 {
        (**self).interrupt_vector()
    }

    fn status(&self) -> Statw {
        (**self).status()
    }

    fn read_rx(&self) -> u8 {
        (**self).read_rx()
    }

    fn write_tx(&self, byte: u8) {
        (**self).write_tx(byte);
    }

    fn tx_ready(&self) -> bool {
        (**self).tx_ready()
    }

    fn exit_low_power(&self) {
        (**self).exit_low_power();
    }

    fn route_pins(&self) {
        (**self).route_pins();
    }
}
