//! Receive policies.
//!
//! The interrupt dispatcher hands every good byte to the port's
//! [`RxHandler`]. Which handler is installed decides how input is
//! buffered:
//!
//! - [`LineAssembler`] collects one carriage-return terminated line at a
//!   time and holds it until the main loop re-arms it.
//! - [`RingReceiver`] pushes every byte into a ring and leaves framing to
//!   the main loop.
//!
//! Any other type implementing [`RxHandler`] can be installed instead.

pub mod line;
pub mod ring;

pub use line::{Line, LineAssembler};
pub use ring::RingReceiver;

/// Carriage return: terminates a line.
pub const CR: u8 = 0x0D;
/// Line feed: ignored by the line policy.
pub const LF: u8 = 0x0A;

/// Receive-byte callback slot.
pub trait RxHandler {
    /// Consumes one received byte. Interrupt context only.
    ///
    /// Returns `true` if the main loop should be woken up because a line is
    /// complete.
    fn on_byte(&self, byte: u8) -> bool;

    /// Returns the handler to its initial state.
    ///
    /// Called by port initialisation before receive interrupts are enabled.
    fn reset(&self) {}

    /// Bytes this handler rejected or dropped since it was last reset.
    fn overruns(&self) -> u32 {
        0
    }
}

impl<R: RxHandler + ?Sized> RxHandler for &R {
    fn on_byte(&self, byte: u8) -> bool {
        (**self).on_byte(byte)
    }

    fn reset(&self) {
        (**self).reset();
    }

    fn overruns(&self) -> u32 {
        (**self).overruns()
    }
}
