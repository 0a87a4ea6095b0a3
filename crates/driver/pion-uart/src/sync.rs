//! Atomic primitives used by the driver, swappable for model checkers.
//!
//! With `cfg(loom)` the types come from loom, with `cfg(shuttle)` from
//! shuttle, otherwise from `core`. Every piece of state shared between the
//! main loop and the interrupt handler goes through these re-exports so the
//! same code runs under the deterministic schedulers in tests.
//!
//! Under either checker the atomics lose their `const` constructors, so
//! types that want to live in a `static` provide a `const fn new` only in
//! the normal build.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{
    AtomicBool, AtomicU8, AtomicU16, AtomicU32, AtomicUsize, Ordering, fence,
};

#[cfg(all(shuttle, not(loom)))]
pub(crate) use shuttle::sync::atomic::{
    AtomicBool, AtomicU8, AtomicU16, AtomicU32, AtomicUsize, Ordering, fence,
};

#[cfg(not(any(loom, shuttle)))]
pub(crate) use core::sync::atomic::{
    AtomicBool, AtomicU8, AtomicU16, AtomicU32, AtomicUsize, Ordering, fence,
};

/// Hint issued inside every busy-wait loop.
///
/// On hardware this is the CPU's spin-loop hint. Under a model checker it
/// yields so the other context gets scheduled and the spin can make
/// progress.
#[inline]
pub(crate) fn spin_hint() {
    #[cfg(loom)]
    loom::thread::yield_now();
    #[cfg(all(shuttle, not(loom)))]
    shuttle::thread::yield_now();
    #[cfg(not(any(loom, shuttle)))]
    core::hint::spin_loop();
}
