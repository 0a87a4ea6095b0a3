//! Command-line interface definitions for pion-term.

use clap::{Parser, ValueEnum};
use pion_core::log::LogLevel;
use pion_uart::ClockSource;

/// Echo terminal over a simulated eUSCI_A UART.
///
/// Lines read from stdin arrive on the simulated RX pin; the driver's main
/// loop echoes every completed line, and whatever the driver transmits is
/// written to stdout.
#[derive(Parser)]
#[command(name = "pion-term", version, about)]
pub struct Cli {
    /// Line rate in bits per second.
    #[arg(long, short = 'b', default_value_t = 115_200)]
    pub baud: u32,

    /// Clock feeding the baud rate generator.
    #[arg(long, value_enum, default_value_t = Clock::Smclk)]
    pub clock: Clock,

    /// Receive policy.
    #[arg(long, value_enum, default_value_t = Policy::Line)]
    pub policy: Policy,

    /// Transmit mode.
    #[arg(long, value_enum, default_value_t = TxMode::Irq)]
    pub tx: TxMode,

    /// Log debug and trace messages to stderr.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Run-time log level selected by `--verbose`.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Trace
        } else {
            LogLevel::Info
        }
    }
}

/// Baud clock selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Clock {
    /// 32768 Hz crystal (9600 baud only).
    Aclk,
    /// 8 MHz sub-main clock.
    Smclk,
}

impl From<Clock> for ClockSource {
    fn from(clock: Clock) -> Self {
        match clock {
            Clock::Aclk => ClockSource::Aclk,
            Clock::Smclk => ClockSource::Smclk,
        }
    }
}

/// How received bytes are buffered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// One carriage-return terminated line at a time.
    Line,
    /// Every byte through a ring; the main loop splits lines.
    Ring,
}

/// How bytes are transmitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TxMode {
    /// Queued, drained by the transmit interrupt.
    Irq,
    /// Busy-wait on the transmit-ready flag per byte.
    Polled,
}
