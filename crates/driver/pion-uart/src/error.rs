//! Driver error types.
//!
//! Only initialisation can fail. Run-time anomalies (full queues, receive
//! overruns, hardware receive errors) are absorbed and counted; see
//! [`PortStats`](crate::PortStats).

use core::fmt;

use crate::regs::{BaudRate, ClockSource};

/// Error returned when a port cannot be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The clock source cannot generate the requested baud rate.
    UnsupportedBaud {
        /// Requested rate.
        baud: BaudRate,
        /// Selected clock.
        clock: ClockSource,
    },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBaud { baud, clock } => {
                write!(f, "{baud} baud is not supported on {clock}")
            }
        }
    }
}

impl core::error::Error for InitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = InitError::UnsupportedBaud {
            baud: BaudRate::Baud57600,
            clock: ClockSource::Aclk,
        };
        assert_eq!(std::format!("{err}"), "57600 baud is not supported on ACLK");
    }
}
