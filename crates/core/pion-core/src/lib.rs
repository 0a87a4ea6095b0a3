//! Core support code shared by the pion firmware crates.
//!
//! Holds the pieces every driver needs but none of them owns: the
//! leveled logging facade and the build-time configuration constants.
//! Everything here is `no_std` and allocation-free so it can be linked
//! into an interrupt-driven target; under `cargo test` the standard
//! library is available for the test harness.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod config;
pub mod log;
