// SPDX-License-Identifier: MIT
//
// Frame — one render cycle's view of the screen.
//
// `Terminal::draw` hands the closure a `Frame` wrapping the buffer being
// built. Widgets paint into it and never see the backend. The frame also
// carries where the hardware cursor should go once the diff is on screen;
// with no position the cursor stays hidden.

use crate::buffer::{Buffer, Rect};

/// Something that can paint itself into a rectangle of a buffer.
pub trait Widget {
    /// Paint into `area`. Writing outside it is clipped by the buffer,
    /// not prevented.
    fn render(self, area: Rect, buf: &mut Buffer);
}

impl<F> Widget for F
where
    F: FnOnce(Rect, &mut Buffer),
{
    fn render(self, area: Rect, buf: &mut Buffer) {
        self(area, buf);
    }
}

/// A single frame under construction.
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a mut Buffer,
    cursor_position: Option<(u16, u16)>,
    count: u64,
}

impl<'a> Frame<'a> {
    pub(crate) const fn new(buffer: &'a mut Buffer, count: u64) -> Self {
        Self {
            buffer,
            cursor_position: None,
            count,
        }
    }

    /// The full drawable area.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> Rect {
        self.buffer.area()
    }

    /// Direct access to the buffer for painting without a widget.
    #[inline]
    pub const fn buffer_mut(&mut self) -> &mut Buffer {
        self.buffer
    }

    /// Render `widget` into `area`, clipped to the frame.
    pub fn render_widget<W: Widget>(&mut self, widget: W, area: Rect) {
        let Some(area) = area.intersect(self.buffer.area()) else {
            return;
        };
        widget.render(area, self.buffer);
    }

    /// Show the cursor at `(x, y)` after this frame is drawn.
    pub const fn set_cursor_position(&mut self, x: u16, y: u16) {
        self.cursor_position = Some((x, y));
    }

    #[inline]
    #[must_use]
    pub const fn cursor_position(&self) -> Option<(u16, u16)> {
        self.cursor_position
    }

    /// How many frames were drawn before this one.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
