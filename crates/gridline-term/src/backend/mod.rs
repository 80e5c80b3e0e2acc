// SPDX-License-Identifier: MIT
//
// Backend contract — the sink that turns diffs into terminal bytes and the
// source of raw input.
//
// A backend is stateful and single-threaded. Per frame:
//
//   draw(updates)  encode every changed cell into an in-memory buffer
//   flush()        one write to the device, then the buffer is empty
//
// The rare lifecycle operations (clear, cursor visibility, alternate
// screen, mouse capture, scrolling) append their fixed sequence and flush
// on the spot. Cursor *movement* is the exception: it is buffered so it
// lands in the same write as the frame it belongs to.
//
// Input is one byte at a time with a timeout, through `ReadOutcome`.
// Parsing keys and mouse reports out of those bytes is not this layer's job.
//
// `close()` tears the session down best-effort and in a fixed order; see
// `TermiosBackend::close` for the sequence.

use std::time::Duration;

use crate::capability::ModeStatus;
use crate::diff::CellUpdate;
use crate::error::Result;

pub mod registry;
pub mod termios;
pub mod test;

pub use crate::platform::{ReadOutcome, ResizeCallback, WindowSize};
pub use registry::{BackendRegistry, Provider};
pub use termios::TermiosBackend;
pub use test::TestBackend;

/// A terminal the render core can drive.
///
/// Object-safe: selection through [`BackendRegistry`] hands out a
/// `Box<dyn Backend>`, and `Box<dyn Backend>` is itself a `Backend`.
pub trait Backend {
    /// Short name used in logs and for explicit selection.
    fn name(&self) -> &'static str;

    /// Encode `updates` (row-major, as produced by the diff) into the
    /// output buffer. Nothing reaches the device until [`flush`](Self::flush).
    ///
    /// # Errors
    ///
    /// Fails if the backend is closed.
    fn draw(&mut self, updates: &[CellUpdate<'_>]) -> Result<()>;

    /// Write everything buffered in one call. Returns the byte count; an
    /// empty buffer is a no-op returning 0.
    ///
    /// # Errors
    ///
    /// Any write failure.
    fn flush(&mut self) -> Result<usize>;

    /// Clear the whole screen and home the cursor.
    ///
    /// # Errors
    ///
    /// Any write failure.
    fn clear(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Any write failure.
    fn hide_cursor(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Any write failure.
    fn show_cursor(&mut self) -> Result<()>;

    /// Queue a cursor move to the 0-based cell `(x, y)`. Buffered until
    /// the next flush.
    ///
    /// # Errors
    ///
    /// Fails if the backend is closed.
    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<()>;

    /// # Errors
    ///
    /// Any write failure.
    fn enter_alternate_screen(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Any write failure.
    fn leave_alternate_screen(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Any write failure.
    fn enable_mouse_capture(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Any write failure.
    fn disable_mouse_capture(&mut self) -> Result<()>;

    /// Scroll the screen contents up by `n` lines. `n == 0` does nothing.
    ///
    /// # Errors
    ///
    /// Any write failure.
    fn scroll_up(&mut self, n: u16) -> Result<()>;

    /// Scroll the screen contents down by `n` lines. `n == 0` does nothing.
    ///
    /// # Errors
    ///
    /// Any write failure.
    fn scroll_down(&mut self, n: u16) -> Result<()>;

    /// Ask the OS for the current size. Never inferred from output.
    ///
    /// # Errors
    ///
    /// The size query failed or reported a zero dimension.
    fn size(&self) -> Result<WindowSize>;

    /// Register the window-change callback, replacing any previous one.
    ///
    /// # Errors
    ///
    /// The window-change signal is owned by another session.
    fn on_resize(&mut self, callback: ResizeCallback) -> Result<()>;

    /// Deliver a pending window change to the callback. Returns whether
    /// one was delivered. Reads also deliver while they wait.
    ///
    /// # Errors
    ///
    /// The size query after the change failed.
    fn poll_resize(&mut self) -> Result<bool>;

    /// Read one byte of input, waiting at most `timeout_ms` (negative
    /// blocks, zero polls).
    ///
    /// # Errors
    ///
    /// I/O failures other than interruption.
    fn read(&mut self, timeout_ms: i32) -> Result<ReadOutcome>;

    /// Like [`read`](Self::read) but the byte stays queued for the next
    /// `read` or `peek`.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    fn peek(&mut self, timeout_ms: i32) -> Result<ReadOutcome>;

    /// Ask whether the terminal supports grapheme-cluster mode (2027).
    ///
    /// Bytes that arrive during the wait and are not the answer are
    /// consumed, so call this before starting to read input.
    ///
    /// # Errors
    ///
    /// Only I/O failures. Silence or garbage is `NotSupported`.
    fn query_grapheme_cluster_mode(&mut self, timeout: Duration) -> Result<ModeStatus>;

    /// Turn grapheme-cluster mode on or off. No answer is awaited.
    ///
    /// # Errors
    ///
    /// Any write failure.
    fn set_grapheme_cluster_mode(&mut self, enabled: bool) -> Result<()>;

    /// Restore the terminal and release the device. Idempotent.
    ///
    /// There is no other way to cancel a blocked read. Backends are
    /// single-threaded, so a read cannot be in flight while `close` runs;
    /// after `close`, `read` and `peek` fail with `BackendError::Closed`.
    ///
    /// # Errors
    ///
    /// The platform release error if there was one, otherwise the first
    /// teardown step that failed. Every step is attempted regardless.
    fn close(&mut self) -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn draw(&mut self, updates: &[CellUpdate<'_>]) -> Result<()> {
        (**self).draw(updates)
    }

    fn flush(&mut self) -> Result<usize> {
        (**self).flush()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn hide_cursor(&mut self) -> Result<()> {
        (**self).hide_cursor()
    }

    fn show_cursor(&mut self) -> Result<()> {
        (**self).show_cursor()
    }

    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<()> {
        (**self).set_cursor_position(x, y)
    }

    fn enter_alternate_screen(&mut self) -> Result<()> {
        (**self).enter_alternate_screen()
    }

    fn leave_alternate_screen(&mut self) -> Result<()> {
        (**self).leave_alternate_screen()
    }

    fn enable_mouse_capture(&mut self) -> Result<()> {
        (**self).enable_mouse_capture()
    }

    fn disable_mouse_capture(&mut self) -> Result<()> {
        (**self).disable_mouse_capture()
    }

    fn scroll_up(&mut self, n: u16) -> Result<()> {
        (**self).scroll_up(n)
    }

    fn scroll_down(&mut self, n: u16) -> Result<()> {
        (**self).scroll_down(n)
    }

    fn size(&self) -> Result<WindowSize> {
        (**self).size()
    }

    fn on_resize(&mut self, callback: ResizeCallback) -> Result<()> {
        (**self).on_resize(callback)
    }

    fn poll_resize(&mut self) -> Result<bool> {
        (**self).poll_resize()
    }

    fn read(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        (**self).read(timeout_ms)
    }

    fn peek(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        (**self).peek(timeout_ms)
    }

    fn query_grapheme_cluster_mode(&mut self, timeout: Duration) -> Result<ModeStatus> {
        (**self).query_grapheme_cluster_mode(timeout)
    }

    fn set_grapheme_cluster_mode(&mut self, enabled: bool) -> Result<()> {
        (**self).set_grapheme_cluster_mode(enabled)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
