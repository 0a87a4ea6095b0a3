//! Run-time port configuration.

use core::fmt;

use crate::error::InitError;
use crate::regs::{BaudRate, ClockSource, Divisors};

/// Line settings applied by [`SerialPort::init`](crate::SerialPort::init).
///
/// Framing is fixed at 8N1 with no flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line rate.
    pub baud: BaudRate,
    /// Clock feeding the baud rate generator.
    pub clock: ClockSource,
}

impl SerialConfig {
    /// 115200 baud from SMCLK.
    pub const DEFAULT: Self = Self {
        baud: BaudRate::Baud115200,
        clock: ClockSource::Smclk,
    };

    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Sets the line rate.
    #[must_use]
    pub const fn with_baud(mut self, baud: BaudRate) -> Self {
        self.baud = baud;
        self
    }

    /// Sets the clock source.
    #[must_use]
    pub const fn with_clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }

    /// Resolves the divisor settings for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::UnsupportedBaud`] if the clock cannot generate
    /// the requested rate.
    pub const fn divisors(&self) -> Result<Divisors, InitError> {
        match self.baud.divisors(self.clock) {
            Some(divisors) => Ok(divisors),
            None => Err(InitError::UnsupportedBaud {
                baud: self.baud,
                clock: self.clock,
            }),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} baud 8N1 from {}", self.baud, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_115200_on_smclk() {
        let config = SerialConfig::default();
        assert_eq!(config.baud, BaudRate::Baud115200);
        assert_eq!(config.clock, ClockSource::Smclk);
        assert_eq!(config, SerialConfig::new());
    }

    #[test]
    fn builder() {
        let config = SerialConfig::new()
            .with_baud(BaudRate::Baud9600)
            .with_clock(ClockSource::Aclk);
        assert_eq!(config.divisors().unwrap().brw, 3);
    }

    #[test]
    fn unsupported_combination() {
        let config = SerialConfig::new().with_clock(ClockSource::Aclk);
        assert_eq!(
            config.divisors(),
            Err(InitError::UnsupportedBaud {
                baud: BaudRate::Baud115200,
                clock: ClockSource::Aclk,
            })
        );
    }

    #[test]
    fn display() {
        let text = std::format!("{}", SerialConfig::DEFAULT);
        assert_eq!(text, "115200 baud 8N1 from SMCLK");
    }
}
