// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell rendering.
//
// Two components work together to minimize terminal I/O:
//
//   OutputBuffer — accumulates all escape bytes in memory so the entire
//   frame can be written in a single write() syscall.
//
//   CellWriter — tracks what the terminal currently has (cursor position,
//   SGR rendition, open hyperlink) and skips redundant escapes. If the last
//   cell was red on black with bold and the next one is too, we output just
//   the grapheme: no cursor move, no SGR.
//
// Hyperlinks are bracketed: the open link is closed before the first cell
// that removes or changes it, and a link is opened only on entering its
// first cell. A run of cells sharing one link gets exactly one open/close.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::{Cell, Hyperlink, Style};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates escape output for a single `write()`.
///
/// Default capacity: 16 KB, enough for most frames without reallocation.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a string verbatim.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to `w` in one call and clear the buffer.
    ///
    /// Returns the number of bytes written. An empty buffer is a no-op:
    /// nothing is written and `w` is not flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails. The buffer is kept so the
    /// caller can decide whether to retry or discard.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<usize> {
        if self.buf.is_empty() {
            return Ok(0);
        }
        w.write_all(&self.buf)?;
        w.flush()?;
        let n = self.buf.len();
        self.buf.clear();
        Ok(n)
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // No-op. Real flushing goes through flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Stateful cell renderer that tracks terminal state to skip redundant escapes.
///
/// # Optimization decisions
///
/// - **Cursor**: skipped when the terminal cursor already sits at the cell,
///   which it does after drawing the cell to the left (a wide grapheme
///   advances it by two).
/// - **SGR**: emitted only when colors, modifiers, or underline color differ
///   from the last emitted rendition. Every SGR starts from a reset, so no
///   per-attribute bookkeeping is needed.
/// - **Wide graphemes**: continuation cells produce no output when their
///   owner was just drawn; the terminal already filled both columns.
#[derive(Debug, Default)]
pub struct CellWriter {
    /// Where the terminal cursor is, if known.
    cursor: Option<(u16, u16)>,
    /// Last rendition sent, if known.
    style: Option<Style>,
    /// The hyperlink currently open.
    link: Option<Hyperlink>,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: None,
            style: None,
            link: None,
        }
    }

    /// Forget all tracked state. Call after a screen clear or when anything
    /// else may have written to the terminal.
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Where the writer believes the cursor is.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Render a single cell, emitting only the escape sequences needed.
    pub fn render_cell(&mut self, out: &mut OutputBuffer, x: u16, y: u16, cell: &Cell) {
        if cell.is_continuation() {
            // The owner just drew both columns.
            if self.cursor == Some((x.saturating_add(1), y)) {
                return;
            }
            // Orphan: fill the column with a space carrying its style.
            self.move_to(out, x, y);
            self.apply_style(out, cell.style());
            out.push_str(" ");
            self.cursor = Some((x.saturating_add(1), y));
            return;
        }

        self.move_to(out, x, y);
        self.apply_style(out, cell.style());
        out.push_str(cell.symbol());

        // Width is 1 or 2 for painted graphemes; treat oddities as 1.
        let advance = if cell.width() >= 2 { 2 } else { 1 };
        self.cursor = Some((x.saturating_add(advance), y));
    }

    /// Close any open hyperlink and return to the default rendition.
    ///
    /// Called at the end of every draw so nothing written outside the
    /// frame inherits a link or colors.
    pub fn finish(&mut self, out: &mut OutputBuffer) {
        if self.link.take().is_some() {
            out.push_str(ansi::hyperlink_end());
        }
        // The link is closed on the wire; the tracked rendition must agree.
        if let Some(style) = &mut self.style {
            style.hyperlink = None;
        }
        if self.style.as_ref().is_some_and(|s| !sgr_eq(s, &Style::EMPTY)) {
            // Writing to a Vec cannot fail.
            let _ = ansi::reset(out);
            self.style = Some(Style::EMPTY);
        }
    }

    /// Close any open hyperlink, reset the rendition unconditionally, and
    /// forget all tracked state. Used on teardown.
    pub fn reset_all(&mut self, out: &mut OutputBuffer) {
        if self.link.take().is_some() {
            out.push_str(ansi::hyperlink_end());
        }
        let _ = ansi::reset(out);
        self.reset_state();
    }

    /// Note that something other than `render_cell` moved the cursor.
    pub const fn moved_to(&mut self, x: u16, y: u16) {
        self.cursor = Some((x, y));
    }

    fn move_to(&mut self, out: &mut OutputBuffer, x: u16, y: u16) {
        if self.cursor != Some((x, y)) {
            let _ = ansi::cursor_to(out, x, y);
            self.cursor = Some((x, y));
        }
    }

    /// Emit hyperlink and SGR transitions for `style`.
    fn apply_style(&mut self, out: &mut OutputBuffer, style: &Style) {
        if let Some(last) = &self.style {
            if last.same_rendition(style) && self.link == style.hyperlink {
                return;
            }
        }

        // Close the current link before anything that changes or removes it.
        let link_changed = self.link != style.hyperlink;
        if link_changed && self.link.take().is_some() {
            out.push_str(ansi::hyperlink_end());
        }

        if self.style.as_ref().is_none_or(|last| !sgr_eq(last, style)) {
            out.push_str(&ansi::style_to_sgr(style));
        }
        self.style = Some(style.clone());

        if link_changed {
            if let Some(link) = &style.hyperlink {
                out.push_str(&ansi::hyperlink_start(link));
                self.link = Some(link.clone());
            }
        }
    }
}

/// Whether two styles produce the same SGR sequence.
fn sgr_eq(a: &Style, b: &Style) -> bool {
    a.foreground == b.foreground
        && a.background == b.background
        && a.underline_color == b.underline_color
        && a.modifiers == b.modifiers
}

// ─── Tests ───────────────────────────────────────────────────────────────────
