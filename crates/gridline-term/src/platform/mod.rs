// SPDX-License-Identifier: MIT
//
// Platform terminal layer — the only code that talks to the OS.
//
// Everything above this module sees a `Tty`: raw-mode control, a size
// query, a byte sink, and a single-byte source with a timeout. The unix
// implementation is termios + poll + SIGWINCH; other platforms get a stub
// that refuses to open.
//
// Timeouts are milliseconds as `i32`, the unit `poll()` takes:
//
//   < 0  block indefinitely
//   = 0  poll once and return
//   > 0  wait at most that long, across signal interruptions

use std::fmt;
use std::io;

use crate::error::Result;

pub mod consts;

#[cfg(unix)]
pub mod signal;
#[cfg(unix)]
pub mod unix;
#[cfg(not(unix))]
pub mod unsupported;

#[cfg(unix)]
pub use unix::{UnixTty as PlatformTty, emergency_restore};
#[cfg(not(unix))]
pub use unsupported::{UnsupportedTty as PlatformTty, emergency_restore};

// ─── ReadOutcome ─────────────────────────────────────────────────────────────

/// Result of a single-byte read or peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One byte of input.
    Byte(u8),
    /// The input stream ended.
    Eof,
    /// Nothing arrived before the timeout.
    Timeout,
}

impl ReadOutcome {
    /// Numeric code for end-of-stream.
    pub const EOF: i32 = -1;
    /// Numeric code for timeout.
    pub const TIMEOUT: i32 = -2;

    /// The numeric form: the byte value, `-1` for end-of-stream, `-2` for
    /// timeout.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Byte(b) => b as i32,
            Self::Eof => Self::EOF,
            Self::Timeout => Self::TIMEOUT,
        }
    }

    /// The inverse of [`code`](Self::code). Other negatives map to `None`.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::EOF => Some(Self::Eof),
            Self::TIMEOUT => Some(Self::Timeout),
            c => u8::try_from(c).ok().map(Self::Byte),
        }
    }

    #[inline]
    #[must_use]
    pub const fn byte(self) -> Option<u8> {
        match self {
            Self::Byte(b) => Some(b),
            Self::Eof | Self::Timeout => None,
        }
    }
}

// ─── WindowSize ──────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowSize {
    /// Number of rows.
    pub rows: u16,
    /// Number of columns.
    pub cols: u16,
}

impl WindowSize {
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { rows, cols }
    }

    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

// ─── Resize Callback ─────────────────────────────────────────────────────────

/// Called in normal context with the new size after the OS reports a
/// window change.
pub type ResizeCallback = Box<dyn FnMut(WindowSize) + Send + 'static>;

// ─── Tty ─────────────────────────────────────────────────────────────────────

/// One open terminal device.
///
/// Writes go through [`io::Write`]; the backend batches a whole frame and
/// issues one `write_all` per flush. None of these methods are reentrant:
/// one thread drives a `Tty` at a time.
pub trait Tty: io::Write {
    /// Switch the input side to raw mode, saving the current attributes.
    ///
    /// Idempotent: enabling twice keeps the attributes saved the first time.
    ///
    /// # Errors
    ///
    /// Fails if the attributes cannot be read or applied.
    fn enable_raw_mode(&mut self) -> Result<()>;

    /// Restore the attributes saved by [`enable_raw_mode`](Self::enable_raw_mode).
    /// A no-op if raw mode is not on.
    ///
    /// # Errors
    ///
    /// Fails if the attributes cannot be applied.
    fn disable_raw_mode(&mut self) -> Result<()>;

    /// Whether raw mode is currently on.
    fn is_raw(&self) -> bool;

    /// Query the window size from the OS. Never a cached or default value.
    ///
    /// # Errors
    ///
    /// Fails if the query fails or reports a zero dimension.
    fn get_size(&self) -> Result<WindowSize>;

    /// Read one byte, waiting up to `timeout_ms`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors other than interruption, or after `close`.
    fn read(&mut self, timeout_ms: i32) -> Result<ReadOutcome>;

    /// Like [`read`](Self::read) but leaves the byte in place: the next
    /// `read` or `peek` returns it again.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    fn peek(&mut self, timeout_ms: i32) -> Result<ReadOutcome>;

    /// Register the window-change callback, replacing any previous one.
    ///
    /// The callback runs from [`poll_resize`](Self::poll_resize) and from
    /// inside `read`/`peek` while they wait, never in signal context.
    ///
    /// # Errors
    ///
    /// Fails if another session in this process already owns the
    /// window-change signal.
    fn on_resize(&mut self, callback: ResizeCallback) -> Result<()>;

    /// Dispatch a pending window change, if any. Returns whether one was
    /// dispatched.
    ///
    /// # Errors
    ///
    /// Fails if the size query after the change fails.
    fn poll_resize(&mut self) -> Result<bool>;

    /// Restore the terminal and release the device. Idempotent.
    ///
    /// Every release step runs even if an earlier one failed; the first
    /// failure is returned.
    ///
    /// # Errors
    ///
    /// The first release step that failed.
    fn close(&mut self) -> Result<()>;
}

/// Open the controlling terminal.
///
/// With `use_dev_tty`, `/dev/tty` is tried first; otherwise (or if that
/// fails) the standard input/output streams are used when both are
/// terminals.
///
/// # Errors
///
/// `BackendError::NotATerminal` when no terminal is reachable,
/// `BackendError::Unsupported` on platforms without a terminal layer.
pub fn open(use_dev_tty: bool) -> Result<PlatformTty> {
    PlatformTty::open(use_dev_tty)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
