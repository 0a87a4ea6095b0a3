//! Memory-mapped eUSCI_A peripheral.

use core::ptr;

use crate::hw::UartHw;
use crate::regs::{ClockSource, Ctlw0, Divisors, Ie, Ifg, Statw, offset};

/// Handle to one eUSCI_A register block.
///
/// Carries nothing but the base address (and an optional pin-mux hook), so
/// it is cheap to copy into a `static` or construct in a panic path.
#[derive(Debug, Clone, Copy)]
pub struct EusciA {
    base: usize,
    pin_mux: Option<fn()>,
}

impl EusciA {
    /// eUSCI_A0 base address on MSP430FR5xx/6xx parts.
    pub const A0_BASE: usize = 0x05C0;
    /// eUSCI_A1 base address on MSP430FR5xx/6xx parts.
    pub const A1_BASE: usize = 0x05E0;
    /// eUSCI_A2 base address on MSP430FR5xx/6xx parts.
    pub const A2_BASE: usize = 0x0600;
    /// eUSCI_A3 base address on MSP430FR5xx/6xx parts.
    pub const A3_BASE: usize = 0x0620;

    /// Creates a handle for the block at `base`. Does not touch hardware.
    ///
    /// # Safety
    ///
    /// `base` must be the address of an eUSCI_A register block (or of at
    /// least 32 bytes of 2-byte-aligned memory standing in for one) that
    /// stays valid for the lifetime of the handle, and no other code may
    /// drive the same block.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base, pin_mux: None }
    }

    /// Installs the board function that routes the UART pins, called from
    /// [`UartHw::route_pins`].
    #[must_use]
    pub const fn with_pin_mux(mut self, pin_mux: fn()) -> Self {
        self.pin_mux = Some(pin_mux);
        self
    }

    /// The base address.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    fn read(&self, off: usize) -> u16 {
        // SAFETY: `new` requires a valid register block at `base`, and every
        // offset used is inside it.
        unsafe { ptr::read_volatile((self.base + off) as *const u16) }
    }

    #[inline]
    fn write(&self, off: usize, value: u16) {
        // SAFETY: see `read`.
        unsafe { ptr::write_volatile((self.base + off) as *mut u16, value) }
    }

    #[inline]
    fn modify(&self, off: usize, f: impl FnOnce(u16) -> u16) {
        let value = self.read(off);
        self.write(off, f(value));
    }
}

impl UartHw for EusciA {
    fn configure(&self, clock: ClockSource, divisors: Divisors) {
        self.write(offset::CTLW0, Ctlw0::SWRST.bits());
        self.modify(offset::CTLW0, |v| v | clock.select_bits().bits());
        self.write(offset::BRW, divisors.brw);
        self.write(offset::MCTLW, divisors.mctlw);
        self.modify(offset::CTLW0, |v| v & !Ctlw0::SWRST.bits());
    }

    fn enable_interrupts(&self, ie: Ie) {
        self.modify(offset::IE, |v| v | ie.bits());
    }

    fn disable_interrupts(&self, ie: Ie) {
        self.modify(offset::IE, |v| v & !ie.bits());
    }

    fn interrupt_vector(&self) -> u16 {
        self.read(offset::IV)
    }

    fn status(&self) -> Statw {
        Statw::from_bits_truncate(self.read(offset::STATW))
    }

    fn read_rx(&self) -> u8 {
        (self.read(offset::RXBUF) & 0xFF) as u8
    }

    fn write_tx(&self, byte: u8) {
        self.write(offset::TXBUF, u16::from(byte));
    }

    fn tx_ready(&self) -> bool {
        Ifg::from_bits_truncate(self.read(offset::IFG)).contains(Ifg::TX)
    }

    fn route_pins(&self) {
        if let Some(pin_mux) = self.pin_mux {
            pin_mux();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::BaudRate;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Register block stand-in: 16 half-words cover offsets 0x00..0x20.
    struct FakeBlock {
        words: Box<[u16; 16]>,
    }

    impl FakeBlock {
        fn new() -> Self {
            Self { words: Box::new([0; 16]) }
        }

        fn uart(&mut self) -> EusciA {
            // SAFETY: the boxed block outlives every handle made in a test.
            unsafe { EusciA::new(self.words.as_mut_ptr() as usize) }
        }

        fn peek(uart: &EusciA, off: usize) -> u16 {
            uart.read(off)
        }
    }

    #[test]
    fn configure_programs_divisors_and_releases_reset() {
        let mut block = FakeBlock::new();
        let uart = block.uart();
        let div = BaudRate::Baud115200.divisors(ClockSource::Smclk).unwrap();

        uart.configure(ClockSource::Smclk, div);

        assert_eq!(FakeBlock::peek(&uart, offset::BRW), 4);
        assert_eq!(FakeBlock::peek(&uart, offset::MCTLW), 0x5551);
        let ctlw0 = Ctlw0::from_bits_truncate(FakeBlock::peek(&uart, offset::CTLW0));
        assert!(!ctlw0.contains(Ctlw0::SWRST));
        assert!(ctlw0.contains(Ctlw0::SSEL_SMCLK));
    }

    #[test]
    fn interrupt_enable_bits() {
        let mut block = FakeBlock::new();
        let uart = block.uart();

        uart.enable_interrupts(Ie::RX | Ie::TX);
        assert_eq!(FakeBlock::peek(&uart, offset::IE), 0b11);
        uart.disable_interrupts(Ie::TX);
        assert_eq!(FakeBlock::peek(&uart, offset::IE), 0b01);
    }

    #[test]
    fn data_registers() {
        let mut block = FakeBlock::new();
        let uart = block.uart();

        uart.write_tx(b'Z');
        assert_eq!(FakeBlock::peek(&uart, offset::TXBUF), u16::from(b'Z'));

        uart.write(offset::RXBUF, 0x0141);
        assert_eq!(uart.read_rx(), 0x41);

        uart.write(offset::STATW, (Statw::RXERR | Statw::FE).bits());
        assert!(uart.status().contains(Statw::RXERR));

        assert!(!uart.tx_ready());
        uart.write(offset::IFG, Ifg::TX.bits());
        assert!(uart.tx_ready());

        uart.write(offset::IV, 0x04);
        assert_eq!(uart.interrupt_vector(), 0x04);
    }

    #[test]
    fn pin_mux_hook_runs() {
        static ROUTED: AtomicBool = AtomicBool::new(false);
        fn route() {
            ROUTED.store(true, Ordering::Relaxed);
        }

        let mut block = FakeBlock::new();
        let uart = block.uart().with_pin_mux(route);
        uart.route_pins();
        assert!(ROUTED.load(Ordering::Relaxed));
    }
}
