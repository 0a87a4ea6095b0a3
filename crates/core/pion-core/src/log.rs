//! Logging facade for firmware code.
//!
//! Two sinks can be registered at run time:
//!
//! - a raw print sink, fed by [`pprint!`] / [`pprintln!`] (no level, no
//!   filtering), and
//! - a leveled sink, fed by [`plog!`] and the per-level shorthands
//!   ([`perr!`], [`pinfo!`], ...).
//!
//! Both start out as no-ops, so logging before the board code wires up an
//! output (usually the serial port itself) is silently discarded.
//!
//! Leveled messages pass two filters. [`MAX_LOG_LEVEL`](crate::config::MAX_LOG_LEVEL)
//! is fixed at build time; [`set_log_level`] narrows it further at run time
//! and defaults to [`LogLevel::Info`].
//!
//! Sinks are plain function pointers stored in atomics: registering one is
//! a single store and calling one takes no lock, so the macros are safe to
//! use from any main-loop context. Interrupt handlers should not log when
//! the sink writes to the same peripheral the handler services.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use crate::config::MAX_LOG_LEVEL;

/// Severity of a log message. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// The firmware cannot continue.
    Fatal = 0,
    /// An operation failed.
    Error = 1,
    /// Something unexpected that the firmware recovered from.
    Warn = 2,
    /// Progress messages.
    Info = 3,
    /// Diagnostic detail.
    Debug = 4,
    /// Very verbose tracing.
    Trace = 5,
}

impl LogLevel {
    /// Fixed-width tag for aligned output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN ",
            Self::Info => "INFO ",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Fatal,
            1 => Self::Error,
            2 => Self::Warn,
            3 => Self::Info,
            4 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Returns `true` if messages at this level pass both the build-time
    /// ceiling and the run-time level.
    #[inline]
    #[must_use]
    pub fn enabled(self) -> bool {
        self <= MAX_LOG_LEVEL && self <= log_level()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().trim_end())
    }
}

// ---------------------------------------------------------------------------
// Run-time level
// ---------------------------------------------------------------------------

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Sets the most verbose level forwarded to the leveled sink.
///
/// Levels above [`MAX_LOG_LEVEL`] stay compiled out whatever is set here.
pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// The current run-time level.
#[must_use]
pub fn log_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

// ---------------------------------------------------------------------------
// Raw print sink
// ---------------------------------------------------------------------------

/// Signature of the raw print sink.
pub type PrintFn = fn(fmt::Arguments<'_>);

fn discard_print(_args: fmt::Arguments<'_>) {}

static PRINT_FN: AtomicPtr<()> = AtomicPtr::new(discard_print as *mut ());

/// Installs the raw print sink, replacing any previous one.
pub fn set_print_fn(f: PrintFn) {
    PRINT_FN.store(f as *mut (), Ordering::Release);
}

#[inline]
fn print_fn() -> PrintFn {
    let ptr = PRINT_FN.load(Ordering::Acquire);
    // SAFETY: PRINT_FN only ever holds `discard_print` or a pointer stored by
    // `set_print_fn`, both valid `PrintFn`s.
    unsafe { core::mem::transmute::<*mut (), PrintFn>(ptr) }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments<'_>) {
    print_fn()(args);
}

/// Unleveled output, e.g. a banner or a prompt.
///
/// Goes straight to the print sink. Never filtered, so keep it out of
/// interrupt paths.
#[macro_export]
macro_rules! pprint {
    ($($arg:tt)*) => { $crate::log::_print(format_args!($($arg)*)) };
}

/// [`pprint!`] plus a trailing `\n`.
#[macro_export]
macro_rules! pprintln {
    () => { $crate::pprint!("\n") };
    ($($arg:tt)*) => { $crate::pprint!("{}\n", format_args!($($arg)*)) };
}

// ---------------------------------------------------------------------------
// Leveled sink
// ---------------------------------------------------------------------------

/// Signature of the leveled log sink.
pub type LogFn = fn(LogLevel, fmt::Arguments<'_>);

fn discard_log(_level: LogLevel, _args: fmt::Arguments<'_>) {}

static LOG_FN: AtomicPtr<()> = AtomicPtr::new(discard_log as *mut ());

/// Installs the leveled log sink, replacing any previous one.
pub fn set_log_fn(f: LogFn) {
    LOG_FN.store(f as *mut (), Ordering::Release);
}

#[inline]
fn log_fn() -> LogFn {
    let ptr = LOG_FN.load(Ordering::Acquire);
    // SAFETY: LOG_FN only ever holds `discard_log` or a pointer stored by
    // `set_log_fn`, both valid `LogFn`s.
    unsafe { core::mem::transmute::<*mut (), LogFn>(ptr) }
}

#[doc(hidden)]
pub fn _log(level: LogLevel, args: fmt::Arguments<'_>) {
    log_fn()(level, args);
}

/// Leveled output with the level chosen at the call site.
///
/// The arguments are only formatted if the level passes both filters.
#[macro_export]
macro_rules! plog {
    ($level:expr, $($arg:tt)*) => {{
        let level: $crate::log::LogLevel = $level;
        if level.enabled() {
            $crate::log::_log(level, format_args!($($arg)*));
        }
    }};
}

/// The firmware is about to stop; nothing in the driver emits this.
#[macro_export]
macro_rules! pfatal {
    ($($arg:tt)*) => { $crate::plog!($crate::log::LogLevel::Fatal, $($arg)*) };
}

/// A main-loop operation failed and the caller sees the error.
#[macro_export]
macro_rules! perr {
    ($($arg:tt)*) => { $crate::plog!($crate::log::LogLevel::Error, $($arg)*) };
}

/// Input or output the driver absorbed, such as receive overruns.
#[macro_export]
macro_rules! pwarn {
    ($($arg:tt)*) => { $crate::plog!($crate::log::LogLevel::Warn, $($arg)*) };
}

/// One-off port events: initialisation and the resulting configuration.
#[macro_export]
macro_rules! pinfo {
    ($($arg:tt)*) => { $crate::plog!($crate::log::LogLevel::Info, $($arg)*) };
}

/// Reconfiguration and per-line receive detail.
#[macro_export]
macro_rules! pdebug {
    ($($arg:tt)*) => { $crate::plog!($crate::log::LogLevel::Debug, $($arg)*) };
}

/// Per-event detail from the main loop, e.g. re-arming and drained output.
/// Never emitted from interrupt context.
#[macro_export]
macro_rules! ptrace {
    ($($arg:tt)*) => { $crate::plog!($crate::log::LogLevel::Trace, $($arg)*) };
}
