//! Line-buffer receive policy.
//!
//! # Lifecycle
//!
//! ```text
//! armed ──byte──▶ accumulating ──CR──▶ complete ──rearm()──▶ armed
//! accumulating ──overflow──▶ rejecting ──CR──▶ armed
//! complete ──stray byte──▶ complete, error latched ──CR──▶ armed (line dropped)
//! ```
//!
//! Only one line can be outstanding: after a carriage return the assembler
//! disarms itself and rejects input until the main loop has read the line
//! and called [`rearm`](LineAssembler::rearm). A rejected byte counts as an
//! overrun and latches an error that discards input up to the next
//! carriage return, which re-arms reception. A line that never sees a
//! carriage return is never delivered.
//!
//! # Ownership
//!
//! The interrupt handler writes the storage, the cursor, the line length
//! and the error latch. The main loop reads the completed line and writes
//! the `enabled` latch only to re-arm it. While a line is pending the
//! handler touches nothing but the overrun counter and the error latch,
//! unless a carriage return re-arms reception. Each such re-arm advances a
//! generation counter, and the reader discards its copy if the generation
//! moved while it was copying. The `enabled` latch alone cannot tell: a new
//! line may have completed and disarmed it again in the meantime.

use core::fmt;

use super::{CR, LF, RxHandler};
use crate::sync::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering, fence};

/// Assembles carriage-return terminated lines into an `N`-byte buffer.
///
/// One slot is reserved for the terminator, so the longest deliverable line
/// is `N - 1` bytes.
pub struct LineAssembler<const N: usize> {
    buf: [AtomicU8; N],
    cursor: AtomicUsize,
    len: AtomicUsize,
    enabled: AtomicBool,
    error: AtomicBool,
    generation: AtomicU32,
    overruns: AtomicU32,
}

impl<const N: usize> LineAssembler<N> {
    const CAPACITY_CHECK: () = assert!(N > 1, "line buffer needs room for a terminator");

    /// Creates an armed assembler with an empty buffer.
    #[cfg(not(any(loom, shuttle)))]
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            buf: [const { AtomicU8::new(0) }; N],
            cursor: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
            enabled: AtomicBool::new(true),
            error: AtomicBool::new(false),
            generation: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Creates an armed assembler with an empty buffer.
    #[cfg(any(loom, shuttle))]
    #[must_use]
    pub fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            buf: core::array::from_fn(|_| AtomicU8::new(0)),
            cursor: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
            enabled: AtomicBool::new(true),
            error: AtomicBool::new(false),
            generation: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Returns a copy of the completed line, or `None` if no line is
    /// pending. Main loop only.
    ///
    /// The line stays pending (and reception disarmed) until
    /// [`rearm`](Self::rearm).
    #[must_use]
    pub fn completed_line(&self) -> Option<Line<N>> {
        let generation = self.generation.load(Ordering::Acquire);
        if self.enabled.load(Ordering::Acquire) {
            return None;
        }

        let len = self.len.load(Ordering::Relaxed);
        let mut line = Line::empty();
        for (dst, src) in line.bytes[..len].iter_mut().zip(&self.buf) {
            *dst = src.load(Ordering::Relaxed);
        }
        line.len = len;

        // A carriage return may have re-armed reception while we copied.
        fence(Ordering::Acquire);
        if self.enabled.load(Ordering::Relaxed)
            || self.generation.load(Ordering::Relaxed) != generation
        {
            return None;
        }
        Some(line)
    }

    /// Re-enables reception after a completed line has been consumed.
    /// Main loop only.
    ///
    /// Does nothing if reception is already armed. A latched error is not
    /// cleared: input is still discarded up to the next carriage return.
    pub fn rearm(&self) {
        if !self.enabled.load(Ordering::Relaxed) {
            self.enabled.store(true, Ordering::Release);
        }
    }

    /// Returns `true` if the assembler is accepting a new line.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns `true` while input is being discarded up to the next
    /// carriage return.
    #[must_use]
    pub fn is_resyncing(&self) -> bool {
        self.error.load(Ordering::Relaxed)
    }

    /// Maximum line length, excluding the terminator.
    #[must_use]
    pub const fn max_line(&self) -> usize {
        N - 1
    }

    /// Rejects `byte`. A carriage return resynchronises.
    fn reject(&self, byte: u8) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
        self.error.store(true, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Relaxed);

        if byte == CR {
            self.error.store(false, Ordering::Relaxed);
            self.enabled.store(true, Ordering::Relaxed);
            self.generation.fetch_add(1, Ordering::Release);
            // Orders the re-arm before any later storage write, for a
            // main loop that is copying the dropped line right now.
            fence(Ordering::Release);
        }
    }
}

#[cfg(not(any(loom, shuttle)))]
impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for LineAssembler<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineAssembler")
            .field("capacity", &N)
            .field("armed", &self.is_armed())
            .field("resyncing", &self.is_resyncing())
            .field("overruns", &self.overruns())
            .finish()
    }
}

impl<const N: usize> RxHandler for LineAssembler<N> {
    fn on_byte(&self, byte: u8) -> bool {
        if byte == LF {
            return false;
        }

        let cursor = self.cursor.load(Ordering::Relaxed);
        let accepting = self.enabled.load(Ordering::Acquire)
            && !self.error.load(Ordering::Relaxed)
            && cursor < N;
        if !accepting {
            self.reject(byte);
            return false;
        }

        if byte == CR {
            self.buf[cursor].store(0, Ordering::Relaxed);
            self.len.store(cursor, Ordering::Relaxed);
            self.cursor.store(0, Ordering::Relaxed);
            // Publishes the line and its length to `completed_line`.
            self.enabled.store(false, Ordering::Release);
            return true;
        }

        self.buf[cursor].store(byte, Ordering::Relaxed);
        self.cursor.store(cursor + 1, Ordering::Relaxed);
        false
    }

    fn reset(&self) {
        self.cursor.store(0, Ordering::Relaxed);
        self.len.store(0, Ordering::Relaxed);
        self.error.store(false, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.enabled.store(true, Ordering::Release);
    }

    fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

/// A completed line, copied out of a [`LineAssembler`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Line<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> Line<N> {
    const fn empty() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
        }
    }

    /// The line's bytes, without the terminator.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The line as text, or `None` if it is not valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Line length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a bare carriage return.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> AsRef<[u8]> for Line<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const N: usize> fmt::Debug for Line<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => write!(f, "Line({text:?})"),
            None => write!(f, "Line({:02x?})", self.as_bytes()),
        }
    }
}


#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn reader_never_sees_a_line_spliced_from_two_lines() {
        loom::model(|| {
            let rx = Arc::new(LineAssembler::<4>::new());
            for &byte in b"AAA\r" {
                rx.on_byte(byte);
            }

            // Drop the pending line and complete a shorter one while the
            // main loop copies.
            let isr = {
                let rx = Arc::clone(&rx);
                thread::spawn(move || {
                    for &byte in &[CR, b'B', CR] {
                        rx.on_byte(byte);
                    }
                })
            };

            if let Some(line) = rx.completed_line() {
                let bytes = line.as_bytes();
                assert!(bytes == b"AAA" || bytes == b"B", "spliced line: {bytes:?}");
            }
            isr.join().unwrap();

            assert_eq!(rx.completed_line().unwrap().as_bytes(), b"B");
        });
    }
}
