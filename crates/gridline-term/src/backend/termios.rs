// SPDX-License-Identifier: MIT
//
// ANSI backend over a raw terminal device.
//
// Generic over the `Tty` so the same encoder drives the real terminal,
// a pseudo-terminal in tests, or an in-memory fake.
//
// Frames are encoded by a `CellWriter` into an `OutputBuffer`, wrapped in
// synchronized-output markers, and written in one call on `flush`. The
// lifecycle operations append their sequence and flush straight away; if
// that write fails the sequence is dropped rather than resent with the
// next frame. A failed frame flush is dropped the same way.
//
// The panic hook deserves special mention: it bypasses Rust's stdout lock
// entirely and writes a pre-built restore sequence straight to the saved
// output descriptor, then puts the saved termios back, then lets the
// original hook print its message to a working terminal. Installed at most
// once per process.

use std::io::{self, Write};
use std::sync::Once;
use std::time::Duration;

use super::{Backend, ReadOutcome, ResizeCallback, WindowSize};
use crate::ansi;
use crate::capability::{self, ModeStatus};
use crate::config::TerminalOptions;
use crate::diff::CellUpdate;
use crate::error::{BackendError, Error, Result};
use crate::output::{CellWriter, OutputBuffer};
use crate::platform::{self, PlatformTty, Tty};

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Complete terminal restore sequence for emergency use.
///
/// End synchronized output, disable mouse reporting, leave grapheme-cluster
/// mode, reset SGR attributes, show the cursor, exit the alternate screen.
///
/// Alternate screen exit is last so the restored shell content appears
/// with no TUI artifacts.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l\
    \x1b[?2027l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            platform::emergency_restore(EMERGENCY_RESTORE);
            original(info);
        }));
    });
}

// ─── TermiosBackend ─────────────────────────────────────────────────────────

/// The ANSI backend for a real terminal.
///
/// Construction switches the device to raw mode. Everything else (alternate
/// screen, mouse, cursor) is opt-in through the [`Backend`] methods, and
/// everything that was turned on is turned off again by
/// [`close`](Backend::close), which also runs on drop.
pub struct TermiosBackend<T: Tty = PlatformTty> {
    tty: T,
    out: OutputBuffer,
    writer: CellWriter,
    alt_screen: bool,
    mouse: bool,
    cursor_hidden: bool,
    closed: bool,
}

impl TermiosBackend<PlatformTty> {
    /// Open the controlling terminal and take it into raw mode.
    ///
    /// # Errors
    ///
    /// `BackendError::NotATerminal` or `Unsupported` when there is no
    /// terminal to drive; I/O errors from switching to raw mode.
    pub fn open(options: &TerminalOptions) -> Result<Self> {
        Self::new(platform::open(options.use_dev_tty)?)
    }
}

impl<T: Tty> TermiosBackend<T> {
    /// Take ownership of `tty` and switch it to raw mode.
    ///
    /// # Errors
    ///
    /// Fails if raw mode cannot be enabled.
    pub fn new(mut tty: T) -> Result<Self> {
        install_panic_hook();
        tty.enable_raw_mode()?;
        Ok(Self {
            tty,
            out: OutputBuffer::new(),
            writer: CellWriter::new(),
            alt_screen: false,
            mouse: false,
            cursor_hidden: false,
            closed: false,
        })
    }

    /// The underlying device.
    #[inline]
    #[must_use]
    pub const fn tty(&self) -> &T {
        &self.tty
    }

    #[inline]
    pub const fn tty_mut(&mut self) -> &mut T {
        &mut self.tty
    }

    /// Bytes queued for the next flush.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        self.out.as_bytes()
    }

    #[inline]
    #[must_use]
    pub const fn is_alternate_screen(&self) -> bool {
        self.alt_screen
    }

    #[inline]
    #[must_use]
    pub const fn is_mouse_captured(&self) -> bool {
        self.mouse
    }

    #[inline]
    #[must_use]
    pub const fn is_cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(BackendError::Closed.into());
        }
        Ok(())
    }

    /// Append a fixed sequence and write it out now.
    fn emit(&mut self, encode: impl FnOnce(&mut OutputBuffer) -> io::Result<()>) -> Result<()> {
        self.ensure_open()?;
        self.emit_step(encode)?;
        Ok(())
    }

    fn emit_step(
        &mut self,
        encode: impl FnOnce(&mut OutputBuffer) -> io::Result<()>,
    ) -> io::Result<()> {
        encode(&mut self.out)?;
        match self.out.flush_to(&mut self.tty) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.out.clear();
                Err(e)
            }
        }
    }
}

impl<T: Tty> Backend for TermiosBackend<T> {
    fn name(&self) -> &'static str {
        "termios"
    }

    fn draw(&mut self, updates: &[CellUpdate<'_>]) -> Result<()> {
        self.ensure_open()?;
        if updates.is_empty() {
            return Ok(());
        }
        // Writing to a Vec cannot fail.
        let _ = ansi::begin_sync(&mut self.out);
        for u in updates {
            self.writer.render_cell(&mut self.out, u.x, u.y, u.cell);
        }
        self.writer.finish(&mut self.out);
        let _ = ansi::end_sync(&mut self.out);
        Ok(())
    }

    fn flush(&mut self) -> Result<usize> {
        match self.out.flush_to(&mut self.tty) {
            Ok(n) => Ok(n),
            Err(e) => {
                // Part of the frame may have landed; cursor and rendition are unknown.
                self.out.clear();
                self.writer.reset_state();
                Err(e.into())
            }
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.writer.reset_state();
        self.emit(ansi::clear_screen)?;
        self.writer.moved_to(0, 0);
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<()> {
        self.emit(ansi::cursor_hide)?;
        self.cursor_hidden = true;
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<()> {
        self.emit(ansi::cursor_show)?;
        self.cursor_hidden = false;
        Ok(())
    }

    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<()> {
        self.ensure_open()?;
        let _ = ansi::cursor_to(&mut self.out, x, y);
        self.writer.moved_to(x, y);
        Ok(())
    }

    fn enter_alternate_screen(&mut self) -> Result<()> {
        // Flagged first: if the write half-landed, close still leaves.
        self.ensure_open()?;
        self.alt_screen = true;
        self.writer.reset_state();
        self.emit(ansi::enter_alt_screen)?;
        log::debug!("entered alternate screen");
        Ok(())
    }

    fn leave_alternate_screen(&mut self) -> Result<()> {
        self.emit(ansi::exit_alt_screen)?;
        self.alt_screen = false;
        self.writer.reset_state();
        log::debug!("left alternate screen");
        Ok(())
    }

    fn enable_mouse_capture(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.mouse = true;
        self.emit(ansi::enable_mouse)
    }

    fn disable_mouse_capture(&mut self) -> Result<()> {
        self.emit(ansi::disable_mouse)?;
        self.mouse = false;
        Ok(())
    }

    fn scroll_up(&mut self, n: u16) -> Result<()> {
        self.writer.reset_state();
        self.emit(|out| ansi::scroll_up(out, n))
    }

    fn scroll_down(&mut self, n: u16) -> Result<()> {
        self.writer.reset_state();
        self.emit(|out| ansi::scroll_down(out, n))
    }

    fn size(&self) -> Result<WindowSize> {
        self.ensure_open()?;
        self.tty.get_size()
    }

    fn on_resize(&mut self, callback: ResizeCallback) -> Result<()> {
        self.ensure_open()?;
        self.tty.on_resize(callback)
    }

    fn poll_resize(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.tty.poll_resize()
    }

    fn read(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        self.ensure_open()?;
        self.tty.read(timeout_ms)
    }

    fn peek(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        self.ensure_open()?;
        self.tty.peek(timeout_ms)
    }

    fn query_grapheme_cluster_mode(&mut self, timeout: Duration) -> Result<ModeStatus> {
        self.ensure_open()?;
        // Anything queued must reach the terminal before the question.
        self.flush()?;
        capability::query_grapheme_cluster_mode(&mut self.tty, timeout)
    }

    fn set_grapheme_cluster_mode(&mut self, enabled: bool) -> Result<()> {
        self.ensure_open()?;
        self.flush()?;
        capability::set_grapheme_cluster_mode(&mut self.tty, enabled)?;
        Ok(())
    }

    /// Tear the session down in a fixed order:
    ///
    /// 1. reset style (closing any open hyperlink)
    /// 2. disable mouse capture, if enabled
    /// 3. leave the alternate screen, if entered
    /// 4. show the cursor
    /// 5. flush the device
    /// 6. close the platform terminal (restores termios, releases fds)
    ///
    /// Each step runs even if an earlier one failed. Failures are logged at
    /// `warn`. The platform close error wins if there is one; otherwise the
    /// first failed step comes back as [`Error::Teardown`].
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first: Option<(&'static str, io::Error)> = None;
        let mut record = |step: &'static str, result: io::Result<()>| {
            if let Err(e) = result {
                log::warn!("close: {step} failed: {e}");
                first.get_or_insert((step, e));
            }
        };

        let mut writer = std::mem::take(&mut self.writer);
        record("reset_style", self.emit_step(|out| {
            writer.reset_all(out);
            Ok(())
        }));
        if self.mouse {
            record("disable_mouse_capture", self.emit_step(ansi::disable_mouse));
            self.mouse = false;
        }
        if self.alt_screen {
            record("leave_alternate_screen", self.emit_step(ansi::exit_alt_screen));
            self.alt_screen = false;
        }
        record("show_cursor", self.emit_step(ansi::cursor_show));
        self.cursor_hidden = false;
        record("flush", self.tty.flush());

        if let Err(e) = self.tty.close() {
            log::warn!("close: releasing the terminal failed: {e}");
            return Err(e);
        }
        log::debug!("terminal session closed");

        match first {
            Some((step, source)) => Err(Error::Teardown { step, source }),
            None => Ok(()),
        }
    }
}

impl<T: Tty> Drop for TermiosBackend<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("terminal teardown on drop failed: {e}");
        }
    }
}

impl<T: Tty> std::fmt::Debug for TermiosBackend<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermiosBackend")
            .field("pending", &self.out.len())
            .field("alt_screen", &self.alt_screen)
            .field("mouse", &self.mouse)
            .field("cursor_hidden", &self.cursor_hidden)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
