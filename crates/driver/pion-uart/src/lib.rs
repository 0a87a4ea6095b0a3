//! Interrupt-driven, line-oriented UART driver for the eUSCI_A peripheral.
//!
//! The driver moves bytes between the peripheral and a cooperative main loop
//! without locks. Two execution contexts share it: the main loop, which
//! sends bytes and consumes received lines, and the peripheral's interrupt
//! handler, which feeds and drains the hardware. Every piece of shared state
//! has exactly one writer at any instant, and all of it is atomic.
//!
//! # Layout
//!
//! - [`ringbuf`]: the SPSC byte queue both directions build on.
//! - [`tx`]: transmit paths ([`IrqTx`] queued and interrupt-driven,
//!   [`PolledTx`] busy-waiting).
//! - [`rx`]: receive policies ([`LineAssembler`], [`RingReceiver`]).
//! - [`mailbox`]: the event bitmask from interrupt to main loop.
//! - [`port`]: [`SerialPort`], the interrupt dispatcher and main-loop API.
//! - [`regs`], [`hw`], [`eusci`]: register definitions, the hardware seam
//!   and the memory-mapped backend.
//! - `sim` (feature `sim`): a simulated peripheral for host tools and
//!   tests.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod eusci;
pub mod hw;
pub mod mailbox;
pub mod port;
pub mod regs;
pub mod ringbuf;
pub mod rx;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod tx;

mod sync;

pub use config::SerialConfig;
pub use error::InitError;
pub use eusci::EusciA;
pub use hw::UartHw;
pub use mailbox::{Event, EventMailbox};
pub use port::{PortStats, SerialPort};
pub use regs::{BaudRate, ClockSource};
pub use ringbuf::RingBuffer;
pub use rx::{Line, LineAssembler, RingReceiver, RxHandler};
pub use tx::{IrqTx, PolledTx, TxPath, TxStatus};
