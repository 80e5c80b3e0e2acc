// SPDX-License-Identifier: MIT
//
// In-memory backend for tests.
//
// Instead of bytes, `TestBackend` keeps a screen `Buffer` that drawn cells
// land on when flushed, plus the lifecycle flags a real terminal would
// carry. Input is a queue the test fills; window changes are injected with
// `resize`, and a broken write with `fail_next_flush`. No time passes: a read with nothing queued returns `Timeout`
// immediately, whatever the timeout.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::time::Duration;

use super::{Backend, ReadOutcome, ResizeCallback, WindowSize};
use crate::buffer::{Buffer, Rect};
use crate::capability::ModeStatus;
use crate::cell::Cell;
use crate::diff::CellUpdate;
use crate::error::{BackendError, Result};

/// A backend that renders to memory.
pub struct TestBackend {
    screen: Buffer,
    /// Drawn but not yet flushed.
    pending: Vec<(u16, u16, Cell)>,
    pending_cursor: Option<(u16, u16)>,
    cursor: (u16, u16),
    cursor_visible: bool,
    alt_screen: bool,
    mouse: bool,
    grapheme_status: ModeStatus,
    input: VecDeque<u8>,
    input_closed: bool,
    peeked: Option<u8>,
    resize_callback: Option<ResizeCallback>,
    resize_pending: bool,
    calls: Vec<&'static str>,
    flushes: usize,
    fail_flush: bool,
    closed: bool,
}

impl TestBackend {
    /// A `cols × rows` screen of blanks.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            screen: Buffer::empty(Rect::new(0, 0, cols, rows)),
            pending: Vec::new(),
            pending_cursor: None,
            cursor: (0, 0),
            cursor_visible: true,
            alt_screen: false,
            mouse: false,
            grapheme_status: ModeStatus::NotSupported,
            input: VecDeque::new(),
            input_closed: false,
            peeked: None,
            resize_callback: None,
            resize_pending: false,
            calls: Vec::new(),
            flushes: 0,
            fail_flush: false,
            closed: false,
        }
    }

    /// Answer grapheme-cluster queries with `status`.
    #[must_use]
    pub fn with_grapheme_status(mut self, status: ModeStatus) -> Self {
        self.grapheme_status = status;
        self
    }

    /// What the terminal shows after the last flush.
    #[inline]
    #[must_use]
    pub const fn screen(&self) -> &Buffer {
        &self.screen
    }

    /// Where the cursor is after the last flush.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub const fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
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
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Lifecycle operations in the order they were called.
    #[must_use]
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    /// Number of flushes that actually applied something.
    #[inline]
    #[must_use]
    pub const fn flushes(&self) -> usize {
        self.flushes
    }

    /// Queue input bytes.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// After the queued input runs out, reads return `Eof`.
    pub const fn close_input(&mut self) {
        self.input_closed = true;
    }

    /// Make the next flush fail with an I/O error. What was pending is
    /// lost, as with a write that broke off.
    pub const fn fail_next_flush(&mut self) {
        self.fail_flush = true;
    }

    /// Change the window size. The screen is cleared, as a real terminal
    /// would leave it undefined, and the callback fires on the next
    /// `poll_resize` or read.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.screen.resize(Rect::new(0, 0, cols, rows));
        self.resize_pending = true;
    }

    /// Panic unless the screen shows exactly `lines`.
    ///
    /// # Panics
    ///
    /// When the screen differs; the message shows both.
    #[track_caller]
    pub fn assert_screen<S: AsRef<str>>(&self, lines: &[S]) {
        let expected = Buffer::with_lines(lines);
        assert!(
            self.screen == expected,
            "screen mismatch\nexpected: {expected:?}\nactual:   {:?}",
            self.screen
        );
    }

    /// The screen's symbols, one string per row.
    #[must_use]
    pub fn screen_lines(&self) -> Vec<String> {
        let area = self.screen.area();
        (area.y..area.bottom())
            .filter_map(|y| self.screen.row(y))
            .map(|row| row.iter().map(Cell::symbol).collect())
            .collect()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(BackendError::Closed.into());
        }
        Ok(())
    }

    fn record(&mut self, call: &'static str) -> Result<()> {
        self.ensure_open()?;
        self.calls.push(call);
        Ok(())
    }

    fn next_byte(&mut self) -> ReadOutcome {
        match self.input.pop_front() {
            Some(b) => ReadOutcome::Byte(b),
            None if self.input_closed => ReadOutcome::Eof,
            None => ReadOutcome::Timeout,
        }
    }
}

impl Backend for TestBackend {
    fn name(&self) -> &'static str {
        "test"
    }

    fn draw(&mut self, updates: &[CellUpdate<'_>]) -> Result<()> {
        self.ensure_open()?;
        self.pending
            .extend(updates.iter().map(|u| (u.x, u.y, u.cell.clone())));
        Ok(())
    }

    /// Applies pending cells to the screen. Returns the number of cells
    /// applied, standing in for a byte count.
    fn flush(&mut self) -> Result<usize> {
        self.ensure_open()?;
        if std::mem::take(&mut self.fail_flush) {
            self.pending.clear();
            self.pending_cursor = None;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "flush failed").into());
        }
        if self.pending.is_empty() && self.pending_cursor.is_none() {
            return Ok(0);
        }
        let n = self.pending.len();
        for (x, y, cell) in self.pending.drain(..) {
            self.screen.set(x, y, cell);
        }
        if let Some(pos) = self.pending_cursor.take() {
            self.cursor = pos;
        }
        self.flushes += 1;
        Ok(n)
    }

    fn clear(&mut self) -> Result<()> {
        self.record("clear")?;
        self.screen.reset();
        self.cursor = (0, 0);
        Ok(())
    }

    fn hide_cursor(&mut self) -> Result<()> {
        self.record("hide_cursor")?;
        self.cursor_visible = false;
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<()> {
        self.record("show_cursor")?;
        self.cursor_visible = true;
        Ok(())
    }

    fn set_cursor_position(&mut self, x: u16, y: u16) -> Result<()> {
        self.ensure_open()?;
        self.pending_cursor = Some((x, y));
        Ok(())
    }

    fn enter_alternate_screen(&mut self) -> Result<()> {
        self.record("enter_alternate_screen")?;
        self.alt_screen = true;
        Ok(())
    }

    fn leave_alternate_screen(&mut self) -> Result<()> {
        self.record("leave_alternate_screen")?;
        self.alt_screen = false;
        Ok(())
    }

    fn enable_mouse_capture(&mut self) -> Result<()> {
        self.record("enable_mouse_capture")?;
        self.mouse = true;
        Ok(())
    }

    fn disable_mouse_capture(&mut self) -> Result<()> {
        self.record("disable_mouse_capture")?;
        self.mouse = false;
        Ok(())
    }

    fn scroll_up(&mut self, n: u16) -> Result<()> {
        self.record("scroll_up")?;
        let area = self.screen.area();
        let n = n.min(area.height);
        let width = usize::from(area.width);
        let mut rows: Vec<Vec<Cell>> = (area.y..area.bottom())
            .filter_map(|y| self.screen.row(y).map(<[Cell]>::to_vec))
            .collect();
        rows.drain(..usize::from(n));
        rows.extend((0..n).map(|_| vec![Cell::blank(); width]));
        self.load_rows(rows);
        Ok(())
    }

    fn scroll_down(&mut self, n: u16) -> Result<()> {
        self.record("scroll_down")?;
        let area = self.screen.area();
        let n = n.min(area.height);
        let width = usize::from(area.width);
        let mut rows: Vec<Vec<Cell>> = (0..n).map(|_| vec![Cell::blank(); width]).collect();
        rows.extend(
            (area.y..area.bottom().saturating_sub(n))
                .filter_map(|y| self.screen.row(y).map(<[Cell]>::to_vec)),
        );
        self.load_rows(rows);
        Ok(())
    }

    fn size(&self) -> Result<WindowSize> {
        self.ensure_open()?;
        let area = self.screen.area();
        Ok(WindowSize::new(area.width, area.height))
    }

    fn on_resize(&mut self, callback: ResizeCallback) -> Result<()> {
        self.ensure_open()?;
        self.resize_callback = Some(callback);
        Ok(())
    }

    fn poll_resize(&mut self) -> Result<bool> {
        self.ensure_open()?;
        if !std::mem::take(&mut self.resize_pending) {
            return Ok(false);
        }
        let size = self.size()?;
        if let Some(callback) = self.resize_callback.as_mut() {
            callback(size);
        }
        Ok(true)
    }

    fn read(&mut self, _timeout_ms: i32) -> Result<ReadOutcome> {
        self.poll_resize()?;
        if let Some(b) = self.peeked.take() {
            return Ok(ReadOutcome::Byte(b));
        }
        Ok(self.next_byte())
    }

    fn peek(&mut self, _timeout_ms: i32) -> Result<ReadOutcome> {
        self.poll_resize()?;
        if let Some(b) = self.peeked {
            return Ok(ReadOutcome::Byte(b));
        }
        let outcome = self.next_byte();
        if let ReadOutcome::Byte(b) = outcome {
            self.peeked = Some(b);
        }
        Ok(outcome)
    }

    fn query_grapheme_cluster_mode(&mut self, _timeout: Duration) -> Result<ModeStatus> {
        self.record("query_grapheme_cluster_mode")?;
        Ok(self.grapheme_status)
    }

    fn set_grapheme_cluster_mode(&mut self, enabled: bool) -> Result<()> {
        self.record("set_grapheme_cluster_mode")?;
        if self.grapheme_status.is_supported() {
            self.grapheme_status = if enabled {
                ModeStatus::Enabled
            } else {
                ModeStatus::SupportedDisabled
            };
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.calls.push("reset_style");
        if self.mouse {
            self.calls.push("disable_mouse_capture");
            self.mouse = false;
        }
        if self.alt_screen {
            self.calls.push("leave_alternate_screen");
            self.alt_screen = false;
        }
        self.calls.push("show_cursor");
        self.cursor_visible = true;
        self.flush()?;
        self.calls.push("close");
        self.resize_callback = None;
        self.closed = true;
        Ok(())
    }
}

impl TestBackend {
    fn load_rows(&mut self, rows: Vec<Vec<Cell>>) {
        let area = self.screen.area();
        for (dy, row) in (0..area.height).zip(rows) {
            for (dx, cell) in (0..area.width).zip(row) {
                self.screen.set(area.x + dx, area.y + dy, cell);
            }
        }
    }
}

impl fmt::Debug for TestBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBackend")
            .field("screen", &self.screen)
            .field("cursor", &self.cursor)
            .field("cursor_visible", &self.cursor_visible)
            .field("alt_screen", &self.alt_screen)
            .field("mouse", &self.mouse)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Style;
    use std::sync::{Arc, Mutex};

    #[test]
    fn draw_lands_on_flush() {
        let mut b = TestBackend::new(4, 1);
        let prev = Buffer::empty(Rect::new(0, 0, 4, 1));
        let next = Buffer::with_lines(&["hi  "]);
        b.draw(&prev.diff(&next)).unwrap();
        b.assert_screen(&["    "]);
        assert_eq!(b.flush().unwrap(), 2);
        b.assert_screen(&["hi  "]);
        assert_eq!(b.flush().unwrap(), 0);
        assert_eq!(b.flushes(), 1);
    }

    #[test]
    fn wide_cells_survive() {
        let mut b = TestBackend::new(3, 1);
        let prev = Buffer::empty(Rect::new(0, 0, 3, 1));
        let mut next = prev.clone();
        next.set_string(0, 0, "日x", &Style::EMPTY);
        b.draw(&prev.diff(&next)).unwrap();
        b.flush().unwrap();
        assert_eq!(b.screen(), &next);
    }

    #[test]
    fn input_queue() {
        let mut b = TestBackend::new(1, 1);
        b.push_input(b"ab");
        assert_eq!(b.peek(0).unwrap(), ReadOutcome::Byte(b'a'));
        assert_eq!(b.read(0).unwrap(), ReadOutcome::Byte(b'a'));
        assert_eq!(b.read(0).unwrap(), ReadOutcome::Byte(b'b'));
        assert_eq!(b.read(10).unwrap(), ReadOutcome::Timeout);
        b.close_input();
        assert_eq!(b.read(10).unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn resize_is_delivered_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut b = TestBackend::new(10, 5);
        b.on_resize(Box::new(move |s| sink.lock().unwrap().push(s)))
            .unwrap();
        b.resize(20, 8);
        assert_eq!(b.size().unwrap(), WindowSize::new(20, 8));
        assert!(b.poll_resize().unwrap());
        assert!(!b.poll_resize().unwrap());
        assert_eq!(*seen.lock().unwrap(), vec![WindowSize::new(20, 8)]);
    }

    #[test]
    fn read_dispatches_pending_resize() {
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let mut b = TestBackend::new(10, 5);
        b.on_resize(Box::new(move |_| *counter.lock().unwrap() += 1))
            .unwrap();
        b.resize(11, 5);
        let _ = b.read(0).unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn scrolling_shifts_rows() {
        let mut b = TestBackend::new(2, 3);
        let prev = Buffer::empty(Rect::new(0, 0, 2, 3));
        let next = Buffer::with_lines(&["aa", "bb", "cc"]);
        b.draw(&prev.diff(&next)).unwrap();
        b.flush().unwrap();

        b.scroll_up(1).unwrap();
        b.assert_screen(&["bb", "cc", "  "]);
        b.scroll_down(2).unwrap();
        b.assert_screen(&["  ", "  ", "bb"]);
    }

    #[test]
    fn grapheme_status_follows_toggle() {
        let mut b = TestBackend::new(1, 1).with_grapheme_status(ModeStatus::SupportedDisabled);
        b.set_grapheme_cluster_mode(true).unwrap();
        assert_eq!(
            b.query_grapheme_cluster_mode(Duration::ZERO).unwrap(),
            ModeStatus::Enabled
        );

        let mut none = TestBackend::new(1, 1);
        none.set_grapheme_cluster_mode(true).unwrap();
        assert_eq!(
            none.query_grapheme_cluster_mode(Duration::ZERO).unwrap(),
            ModeStatus::NotSupported
        );
    }

    #[test]
    fn close_order_and_idempotence() {
        let mut b = TestBackend::new(1, 1);
        b.enter_alternate_screen().unwrap();
        b.enable_mouse_capture().unwrap();
        b.hide_cursor().unwrap();
        b.close().unwrap();
        b.close().unwrap();
        assert_eq!(
            b.calls(),
            [
                "enter_alternate_screen",
                "enable_mouse_capture",
                "hide_cursor",
                "reset_style",
                "disable_mouse_capture",
                "leave_alternate_screen",
                "show_cursor",
                "close",
            ]
        );
        assert!(b.is_cursor_visible());
        assert!(b.read(0).is_err());
    }
}
