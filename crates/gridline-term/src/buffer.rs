// SPDX-License-Identifier: MIT
//
// Buffer — the grid of cells one frame paints into.
//
// Every widget writes here; the diff engine then compares this frame
// against the previous one and hands the changed cells to the backend.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing for cache efficiency.
//     A row's cells are contiguous, so the left-to-right scan the diff
//     does is linear, and whole rows compare with one slice equality.
//
//   - The buffer covers an `area` of the screen. Coordinates passed to
//     get/set are screen coordinates inside that area; the index is
//     computed relative to the area origin. Invariant:
//     `cells.len() == area.width * area.height`.
//
//   - Wide graphemes occupy two columns: the grapheme cell, then a
//     continuation cell with an empty symbol. `set_string` and `fill`
//     repair any pair they cut in half, so a continuation never exists
//     without its owner directly to the left.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::cell::{Cell, Style};
use crate::diff::{self, CellUpdate};

// ─── Rect ───────────────────────────────────────────────────────────────────────

/// A rectangle in screen cells.
///
/// # Examples
///
/// ```
/// use gridline_term::buffer::Rect;
///
/// let r = Rect::new(10, 5, 80, 24);
/// assert!(r.contains(10, 5));    // top-left corner: inside
/// assert!(r.contains(89, 28));   // bottom-right corner: inside
/// assert!(!r.contains(9, 5));    // left of bounds: outside
/// assert!(!r.contains(90, 5));   // right of bounds: outside
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: u16,
    /// Top edge.
    pub y: u16,
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive), saturating at `u16::MAX`.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive), saturating at `u16::MAX`.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u16 {
        self.y.saturating_add(self.height)
    }

    /// Number of cells covered.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.width as u32 * self.height as u32
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// The overlap of two rectangles, or `None` if they don't overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            Some(Self::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    /// Shrink by `margin` on every side. Collapses to zero size if too small.
    #[must_use]
    pub const fn inner(self, margin: u16) -> Self {
        let doubled = margin.saturating_mul(2);
        if self.width < doubled || self.height < doubled {
            return Self::new(self.x, self.y, 0, 0);
        }
        Self::new(
            self.x + margin,
            self.y + margin,
            self.width - doubled,
            self.height - doubled,
        )
    }
}

// ─── Buffer ─────────────────────────────────────────────────────────────────────

/// A grid of cells for one frame.
///
/// # Examples
///
/// ```
/// use gridline_term::buffer::{Buffer, Rect};
/// use gridline_term::cell::{Cell, Style};
///
/// let mut buf = Buffer::empty(Rect::new(0, 0, 80, 24));
/// buf.set(5, 3, Cell::new("X"));
/// assert_eq!(buf.get(5, 3).unwrap().symbol(), "X");
///
/// let cols = buf.set_string(0, 0, "中文", &Style::EMPTY);
/// assert_eq!(cols, 4);
/// assert!(buf.get(1, 0).unwrap().is_continuation());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Buffer {
    area: Rect,
    cells: Vec<Cell>,
}

impl Buffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// A buffer of blank cells.
    #[must_use]
    pub fn empty(area: Rect) -> Self {
        Self::filled(area, &Cell::blank())
    }

    /// A buffer with every cell set to `cell`.
    #[must_use]
    pub fn filled(area: Rect, cell: &Cell) -> Self {
        let size = area.area() as usize;
        Self {
            area,
            cells: vec![cell.clone(); size],
        }
    }

    /// Build a buffer from text lines, one row per line.
    ///
    /// The width is the widest line; shorter lines are padded with blanks.
    /// Mostly useful for asserting what a backend or widget drew.
    #[must_use]
    pub fn with_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let width = lines.iter().map(|l| l.as_ref().width()).max().unwrap_or(0);
        let height = lines.len();
        let mut buf = Self::empty(Rect::new(
            0,
            0,
            u16::try_from(width).unwrap_or(u16::MAX),
            u16::try_from(height).unwrap_or(u16::MAX),
        ));
        for (y, line) in lines.iter().enumerate() {
            let Ok(y) = u16::try_from(y) else { break };
            buf.set_string(0, y, line.as_ref(), &Style::EMPTY);
        }
        buf
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn area(&self) -> Rect {
        self.area
    }

    /// The raw cell slice, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Flat index of `(x, y)`, or `None` outside the area.
    #[inline]
    #[must_use]
    pub fn index_of(&self, x: u16, y: u16) -> Option<usize> {
        if !self.area.contains(x, y) {
            return None;
        }
        let row = usize::from(y - self.area.y);
        let col = usize::from(x - self.area.x);
        Some(row * usize::from(self.area.width) + col)
    }

    /// Screen position of flat index `i`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pos_of(&self, i: usize) -> (u16, u16) {
        let w = usize::from(self.area.width).max(1);
        // Truncation is safe: col < width and row < height, both u16.
        let col = (i % w) as u16;
        let row = (i / w) as u16;
        (self.area.x + col, self.area.y + row)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index_of(x, y).map(|i| &self.cells[i])
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        self.index_of(x, y).map(|i| &mut self.cells[i])
    }

    /// One row as a slice, `y` in screen coordinates.
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        let start = self.index_of(self.area.x, y)?;
        Some(&self.cells[start..start + usize::from(self.area.width)])
    }

    /// Iterate cells with their screen coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        self.cells.iter().enumerate().map(|(i, cell)| {
            let (x, y) = self.pos_of(i);
            (x, y, cell)
        })
    }

    // ─── Direct Cell Access ──────────────────────────────────────────────

    /// Write a cell, bounds-checked, with no wide-grapheme repair.
    ///
    /// Returns `true` if `(x, y)` was inside the area.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        match self.index_of(x, y) {
            Some(i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    // ─── Reset & Resize ──────────────────────────────────────────────────

    /// Reset every cell to blank.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.reset();
        }
    }

    /// Change the covered area. All content is cleared.
    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        self.cells.clear();
        self.cells.resize(area.area() as usize, Cell::blank());
    }

    // ─── Painting ────────────────────────────────────────────────────────

    /// Set every cell in `area` to a blank grapheme with `style`.
    ///
    /// Clipped to the buffer. Wide graphemes straddling the fill edges are
    /// broken so no half pair survives.
    pub fn fill(&mut self, area: Rect, style: &Style) {
        let Some(target) = area.intersect(self.area) else {
            return;
        };

        for y in target.y..target.bottom() {
            self.break_wide_at(target.x, y);
            self.break_wide_at(target.right() - 1, y);
            for x in target.x..target.right() {
                if let Some(i) = self.index_of(x, y) {
                    let cell = &mut self.cells[i];
                    cell.set_symbol(" ");
                    cell.set_style(style.clone());
                }
            }
        }
    }

    /// Patch `style` over every cell in `area`, keeping symbols.
    pub fn set_style(&mut self, area: Rect, style: &Style) {
        let Some(target) = area.intersect(self.area) else {
            return;
        };
        for y in target.y..target.bottom() {
            for x in target.x..target.right() {
                if let Some(cell) = self.get_mut(x, y) {
                    cell.patch_style(style);
                }
            }
        }
    }

    /// Write text starting at `(x, y)`, one grapheme cluster per cell.
    ///
    /// Wide graphemes get a continuation cell at `x + 1`. Zero-width
    /// graphemes (controls) are skipped. A wide grapheme that would cross
    /// the right edge is replaced by a blank. Each written cell's style is
    /// its previous style patched with `style`.
    ///
    /// Returns the number of columns consumed.
    pub fn set_string(&mut self, x: u16, y: u16, text: &str, style: &Style) -> u16 {
        if !self.area.contains(x, y) {
            return 0;
        }

        let right = self.area.right();
        let mut col = x;

        for grapheme in text.graphemes(true) {
            if col >= right {
                break;
            }
            let width = grapheme.width().min(2);
            if width == 0 {
                continue;
            }

            if width == 2 && col + 1 >= right {
                self.put(col, y, " ", style);
                col += 1;
                break;
            }

            self.put(col, y, grapheme, style);
            if width == 2 {
                self.break_wide_at(col + 1, y);
                if let Some(i) = self.index_of(col + 1, y) {
                    let owner_style = self.cells[i - 1].style().clone();
                    self.cells[i] = Cell::continuation(owner_style);
                }
            }

            // width is 1 or 2.
            #[allow(clippy::cast_possible_truncation)]
            let w = width as u16;
            col = col.saturating_add(w);
        }

        col - x
    }

    /// Write one grapheme at `(x, y)` after breaking whatever wide pair
    /// touches that position.
    fn put(&mut self, x: u16, y: u16, symbol: &str, style: &Style) {
        self.break_wide_at(x, y);
        if let Some(cell) = self.get_mut(x, y) {
            cell.set_symbol(symbol);
            cell.patch_style(style);
        }
    }

    // ─── Wide Grapheme Repair ────────────────────────────────────────────

    /// Break any wide grapheme that touches `(x, y)`.
    ///
    /// - If `(x, y)` is a continuation, its owner at `x - 1` becomes blank.
    /// - If `(x + 1, y)` is a continuation, it was owned by `(x, y)`; it
    ///   becomes blank too.
    ///
    /// Blanks keep the style of the cell they replace.
    fn break_wide_at(&mut self, x: u16, y: u16) {
        let Some(i) = self.index_of(x, y) else {
            return;
        };

        if self.cells[i].is_continuation() {
            if x > self.area.x {
                self.cells[i - 1].set_symbol(" ");
            }
            self.cells[i].set_symbol(" ");
        }

        if let Some(next) = self.index_of(x + 1, y) {
            if self.cells[next].is_continuation() {
                self.cells[next].set_symbol(" ");
            }
        }
    }

    // ─── Diff ────────────────────────────────────────────────────────────

    /// Cells that must be redrawn to turn `self` (what the terminal shows)
    /// into `next`. See [`diff::diff`].
    #[must_use]
    pub fn diff<'a>(&self, next: &'a Self) -> Vec<CellUpdate<'a>> {
        diff::diff(self, next)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Buffer({}x{} at {},{})",
            self.area.width, self.area.height, self.area.x, self.area.y
        )?;
        for y in self.area.y..self.area.bottom() {
            let Some(row) = self.row(y) else { break };
            let line: String = row.iter().map(Cell::symbol).collect();
            writeln!(f, "  {line:?}")?;
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────────
