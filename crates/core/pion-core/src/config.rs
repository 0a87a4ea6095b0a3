//! Build-time configuration.
//!
//! Values are fixed when the firmware is compiled. The log ceiling comes
//! from the `PION_LOG_LEVEL` environment variable (`fatal`, `error`, `warn`,
//! `info`, `debug` or `trace`); anything else, including an unset variable,
//! selects `trace`, leaving the choice to
//! [`set_log_level`](crate::log::set_log_level) at run time. Firmware that
//! wants the verbose messages compiled out sets a lower ceiling.

use crate::log::LogLevel;

const LOG_LEVEL: &str = match option_env!("PION_LOG_LEVEL") {
    Some(level) => level,
    None => "trace",
};

/// Most verbose level that can ever reach the registered sinks.
pub const MAX_LOG_LEVEL: LogLevel = match LOG_LEVEL.as_bytes() {
    b"fatal" => LogLevel::Fatal,
    b"error" => LogLevel::Error,
    b"warn" => LogLevel::Warn,
    b"info" => LogLevel::Info,
    b"debug" => LogLevel::Debug,
    _ => LogLevel::Trace,
};

/// Default transmit ring capacity in bytes.
pub const DEFAULT_TX_CAPACITY: usize = 64;

/// Default receive line (or ring) capacity in bytes.
pub const DEFAULT_RX_CAPACITY: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacities_are_usable() {
        assert!(DEFAULT_TX_CAPACITY > 0);
        assert!(DEFAULT_RX_CAPACITY > 1);
    }

    #[test]
    fn ceiling_has_a_name() {
        assert_eq!(MAX_LOG_LEVEL.name().len(), 5);
    }
}
