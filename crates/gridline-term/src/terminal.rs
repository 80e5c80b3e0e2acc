// SPDX-License-Identifier: MIT
//
// Terminal — the double-buffered draw cycle.
//
// Two buffers: `previous` is what the terminal shows, `current` is the
// frame being built. Each draw:
//
//   1. autoresize: ask the backend for the size; on change, resize both
//      buffers and force a full redraw
//   2. hand the caller a Frame over `current`
//   3. diff previous → current and send the updates to the backend
//   4. place the cursor if the frame asked for it, flush once
//   5. swap, and blank the new `current` for the next frame
//
// Any backend failure ends the draw with an error. What reached the
// screen is then unknown, so the next frame starts from blank buffers
// and repaints every cell.

use crate::backend::{Backend, WindowSize};
use crate::buffer::{Buffer, Rect};
use crate::config::TerminalOptions;
use crate::diff::DiffStats;
use crate::error::Result;
use crate::frame::Frame;

/// A terminal session driving one backend.
pub struct Terminal<B: Backend> {
    backend: B,
    previous: Buffer,
    current: Buffer,
    cursor_hidden: bool,
    hide_cursor: bool,
    frame_count: u64,
}

impl<B: Backend> Terminal<B> {
    /// Start a session with default options.
    ///
    /// # Errors
    ///
    /// Fails if the size query or any setup step fails.
    pub fn new(backend: B) -> Result<Self> {
        Self::with_options(backend, &TerminalOptions::default())
    }

    /// Start a session: enter the alternate screen, capture the mouse, and
    /// hide the cursor as `options` say, then clear the screen.
    ///
    /// # Errors
    ///
    /// Fails if the size query or any setup step fails.
    pub fn with_options(mut backend: B, options: &TerminalOptions) -> Result<Self> {
        let size = backend.size()?;
        if options.alternate_screen {
            backend.enter_alternate_screen()?;
        }
        if options.mouse_capture {
            backend.enable_mouse_capture()?;
        }
        if options.hide_cursor {
            backend.hide_cursor()?;
        }
        backend.clear()?;

        let area = area_of(size);
        log::debug!("terminal session started on `{}` at {size}", backend.name());
        Ok(Self {
            backend,
            previous: Buffer::empty(area),
            current: Buffer::empty(area),
            cursor_hidden: options.hide_cursor,
            hide_cursor: options.hide_cursor,
            frame_count: 0,
        })
    }

    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The area the next frame will cover.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> Rect {
        self.current.area()
    }

    /// The size as the OS reports it now.
    ///
    /// # Errors
    ///
    /// Fails if the size query fails.
    pub fn size(&self) -> Result<WindowSize> {
        self.backend.size()
    }

    /// Frames drawn so far.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Render one frame.
    ///
    /// # Errors
    ///
    /// Any failure to query the size, draw, or flush. Nothing is retried.
    pub fn draw<F>(&mut self, render: F) -> Result<DiffStats>
    where
        F: FnOnce(&mut Frame<'_>),
    {
        self.autoresize()?;

        let mut frame = Frame::new(&mut self.current, self.frame_count);
        render(&mut frame);
        let cursor = frame.cursor_position();

        let stats = match self.present(cursor) {
            Ok(stats) => stats,
            Err(e) => {
                self.current.reset();
                self.previous.resize(Rect::default());
                return Err(e);
            }
        };

        self.swap_buffers();
        self.frame_count += 1;
        log::trace!(
            "frame {}: {} emitted, {} skipped, {} bytes",
            self.frame_count,
            stats.cells_emitted,
            stats.cells_skipped,
            stats.bytes_written
        );
        Ok(stats)
    }

    /// Match the buffers to the OS-reported size. Returns whether they
    /// changed.
    ///
    /// # Errors
    ///
    /// Fails if the size query or the screen clear fails.
    pub fn autoresize(&mut self) -> Result<bool> {
        let area = area_of(self.backend.size()?);
        if area == self.current.area() {
            return Ok(false);
        }
        self.resize(area)?;
        Ok(true)
    }

    /// Resize to `area`, clear the screen, and make the next draw repaint
    /// every cell.
    ///
    /// # Errors
    ///
    /// Fails if the screen clear fails.
    pub fn resize(&mut self, area: Rect) -> Result<()> {
        log::debug!(
            "resizing {}x{} -> {}x{}",
            self.current.area().width,
            self.current.area().height,
            area.width,
            area.height
        );
        self.current.resize(area);
        // A zero-sized previous frame makes the next diff cover everything.
        self.previous.resize(Rect::default());
        self.backend.clear()
    }

    /// Clear the screen; the next draw repaints whatever isn't blank.
    ///
    /// # Errors
    ///
    /// Fails if the screen clear fails.
    pub fn clear(&mut self) -> Result<()> {
        self.backend.clear()?;
        self.previous.reset();
        Ok(())
    }

    /// End the session. See [`Backend::close`].
    ///
    /// # Errors
    ///
    /// Whatever the backend's teardown reports.
    pub fn close(&mut self) -> Result<()> {
        self.backend.close()
    }

    /// Send the diff, place the cursor, flush, and settle cursor visibility.
    fn present(&mut self, cursor: Option<(u16, u16)>) -> Result<DiffStats> {
        let updates = self.previous.diff(&self.current);
        let mut stats = DiffStats {
            cells_emitted: updates.len(),
            cells_skipped: (self.current.area().area() as usize).saturating_sub(updates.len()),
            bytes_written: 0,
        };
        self.backend.draw(&updates)?;
        drop(updates);

        if let Some((x, y)) = cursor {
            self.backend.set_cursor_position(x, y)?;
        }
        stats.bytes_written = self.backend.flush()?;

        match cursor {
            Some(_) if self.cursor_hidden => {
                self.backend.show_cursor()?;
                self.cursor_hidden = false;
            }
            None if self.hide_cursor && !self.cursor_hidden => {
                self.backend.hide_cursor()?;
                self.cursor_hidden = true;
            }
            _ => {}
        }
        Ok(stats)
    }

    fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
        if self.current.area() == self.previous.area() {
            self.current.reset();
        } else {
            self.current.resize(self.previous.area());
        }
    }
}

fn area_of(size: WindowSize) -> Rect {
    Rect::new(0, 0, size.cols, size.rows)
}

impl<B: Backend> std::fmt::Debug for Terminal<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("backend", &self.backend.name())
            .field("area", &self.current.area())
            .field("cursor_hidden", &self.cursor_hidden)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
