// SPDX-License-Identifier: MIT
//
// Diff engine — the minimal set of cells a frame has to redraw.
//
// Instead of repainting the entire screen every frame, we compare the new
// buffer against the one the terminal currently shows and hand the backend
// only the cells that differ. Typically one or two rows change per input
// event out of dozens visible.
//
// Rules:
//
//   - Updates are emitted row-major (top-to-bottom, left-to-right), so a
//     backend can track the cursor incrementally without seeking.
//
//   - Equal cells (same grapheme and same style) are skipped. Whole rows are
//     compared with a single slice equality first and skipped without
//     visiting individual cells.
//
//   - Buffers with different areas are fully dirty: every cell of the new
//     buffer is emitted. No attempt is made to diff across a resize.
//
//   - Wide graphemes are never split. If either half of a grapheme/
//     continuation pair changed, both halves are emitted, owner first.

use crate::buffer::Buffer;
use crate::cell::Cell;

// ─── CellUpdate ──────────────────────────────────────────────────────────────

/// One changed cell: where it is and what it should become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate<'a> {
    /// Screen column.
    pub x: u16,
    /// Screen row.
    pub y: u16,
    /// The new content.
    pub cell: &'a Cell,
}

// ─── DiffStats ───────────────────────────────────────────────────────────────

/// Statistics from one draw, for tracing and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    /// Cells handed to the backend.
    pub cells_emitted: usize,
    /// Cells that matched the previous frame and were skipped.
    pub cells_skipped: usize,
    /// Bytes of escape output flushed to the terminal.
    pub bytes_written: usize,
}

impl DiffStats {
    /// Total cells considered (emitted + skipped).
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_emitted + self.cells_skipped
    }
}

// ─── diff ────────────────────────────────────────────────────────────────────

/// Cells that must be redrawn to turn `previous` into `current`.
///
/// # Examples
///
/// ```
/// use gridline_term::buffer::{Buffer, Rect};
/// use gridline_term::cell::Cell;
/// use gridline_term::diff::diff;
///
/// let prev = Buffer::empty(Rect::new(0, 0, 4, 2));
/// let mut next = prev.clone();
/// next.set(2, 1, Cell::new("x"));
///
/// let updates = diff(&prev, &next);
/// assert_eq!(updates.len(), 1);
/// assert_eq!((updates[0].x, updates[0].y), (2, 1));
/// ```
#[must_use]
pub fn diff<'a>(previous: &Buffer, current: &'a Buffer) -> Vec<CellUpdate<'a>> {
    let area = current.area();
    if previous.area() != area {
        return current
            .iter()
            .map(|(x, y, cell)| CellUpdate { x, y, cell })
            .collect();
    }

    let mut updates = Vec::new();
    for y in area.y..area.bottom() {
        let (Some(prev_row), Some(curr_row)) = (previous.row(y), current.row(y)) else {
            continue;
        };
        // Row-skip: one slice comparison for an unchanged row.
        if prev_row == curr_row {
            continue;
        }
        diff_row(prev_row, curr_row, area.x, y, &mut updates);
    }
    updates
}

/// Diff one row, keeping wide pairs together.
fn diff_row<'a>(
    prev: &[Cell],
    curr: &'a [Cell],
    x0: u16,
    y: u16,
    out: &mut Vec<CellUpdate<'a>>,
) {
    // Column index of the last emitted cell, to avoid duplicates when a
    // pair's owner was already pulled in by its continuation or vice versa.
    let mut emitted_up_to: Option<usize> = None;
    let mut push = |i: usize, out: &mut Vec<CellUpdate<'a>>| {
        if emitted_up_to.is_some_and(|last| i <= last) {
            return;
        }
        // Row width fits in u16, so does i.
        #[allow(clippy::cast_possible_truncation)]
        let x = x0 + i as u16;
        out.push(CellUpdate {
            x,
            y,
            cell: &curr[i],
        });
        emitted_up_to = Some(i);
    };

    for i in 0..curr.len() {
        if prev[i] == curr[i] {
            continue;
        }

        // A changed continuation pulls in its owner first.
        if curr[i].is_continuation() && i > 0 {
            push(i - 1, out);
        }
        push(i, out);
        // A changed owner pulls in its continuation.
        if curr[i].width() > 1 && i + 1 < curr.len() {
            push(i + 1, out);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Rect;
    use crate::cell::Style;
    use crate::color::Color;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn coords(updates: &[CellUpdate<'_>]) -> Vec<(u16, u16)> {
        updates.iter().map(|u| (u.x, u.y)).collect()
    }

    fn apply(target: &mut Buffer, updates: &[CellUpdate<'_>]) {
        for u in updates {
            target.set(u.x, u.y, u.cell.clone());
        }
    }

    // ── Basics ──────────────────────────────────────────────────────────

    #[test]
    fn identical_buffers_produce_nothing() {
        let mut a = Buffer::empty(Rect::new(0, 0, 10, 3));
        a.set_string(0, 1, "hello", &Style::new().fg(Color::Indexed(3)));
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn single_change() {
        let prev = Buffer::empty(Rect::new(0, 0, 10, 3));
        let mut next = prev.clone();
        next.set(4, 2, Cell::new("z"));
        let updates = diff(&prev, &next);
        assert_eq!(coords(&updates), vec![(4, 2)]);
        assert_eq!(updates[0].cell.symbol(), "z");
    }

    #[test]
    fn style_only_change_is_emitted() {
        let prev = Buffer::empty(Rect::new(0, 0, 3, 1));
        let mut next = prev.clone();
        next.fill(Rect::new(1, 0, 1, 1), &Style::new().bg(Color::Indexed(1)));
        assert_eq!(coords(&diff(&prev, &next)), vec![(1, 0)]);
    }

    #[test]
    fn updates_are_row_major() {
        let prev = Buffer::empty(Rect::new(0, 0, 5, 3));
        let mut next = prev.clone();
        next.set(4, 2, Cell::new("c"));
        next.set(0, 1, Cell::new("b"));
        next.set(3, 0, Cell::new("a"));
        next.set(1, 0, Cell::new("a"));
        assert_eq!(
            coords(&diff(&prev, &next)),
            vec![(1, 0), (3, 0), (0, 1), (4, 2)]
        );
    }

    #[test]
    fn mismatched_area_is_fully_dirty() {
        let prev = Buffer::empty(Rect::new(0, 0, 3, 2));
        let next = Buffer::empty(Rect::new(0, 0, 4, 2));
        let updates = diff(&prev, &next);
        assert_eq!(updates.len(), 8);
        assert_eq!(updates[0].x, 0);
        assert_eq!(updates[7].x, 3);
    }

    #[test]
    fn offset_area_reports_screen_coordinates() {
        let prev = Buffer::empty(Rect::new(10, 5, 3, 2));
        let mut next = prev.clone();
        next.set(11, 6, Cell::new("q"));
        assert_eq!(coords(&diff(&prev, &next)), vec![(11, 6)]);
    }

    #[test]
    fn zero_size_buffers() {
        let a = Buffer::empty(Rect::default());
        assert!(diff(&a, &a.clone()).is_empty());
    }

    // ── Wide pairs ──────────────────────────────────────────────────────

    #[test]
    fn wide_owner_change_emits_continuation() {
        let mut prev = Buffer::empty(Rect::new(0, 0, 6, 1));
        prev.set_string(2, 0, "中", &Style::EMPTY);
        let mut next = prev.clone();
        next.set_string(2, 0, "文", &Style::EMPTY);

        let updates = diff(&prev, &next);
        assert_eq!(coords(&updates), vec![(2, 0), (3, 0)]);
        assert!(updates[1].cell.is_continuation());
    }

    #[test]
    fn continuation_change_pulls_in_owner() {
        let mut prev = Buffer::empty(Rect::new(0, 0, 6, 1));
        prev.set_string(2, 0, "中", &Style::EMPTY);
        let mut next = prev.clone();
        // Only the continuation's style changes.
        next.set(3, 0, Cell::continuation(Style::new().bg(Color::Indexed(2))));

        assert_eq!(coords(&diff(&prev, &next)), vec![(2, 0), (3, 0)]);
    }

    #[test]
    fn adjacent_changes_are_not_duplicated() {
        let prev = Buffer::empty(Rect::new(0, 0, 6, 1));
        let mut next = prev.clone();
        next.set_string(0, 0, "a中b", &Style::EMPTY);
        assert_eq!(
            coords(&diff(&prev, &next)),
            vec![(0, 0), (1, 0), (2, 0), (3, 0)]
        );
    }

    // ── Properties ──────────────────────────────────────────────────────

    fn arb_buffer(width: u16, height: u16) -> impl Strategy<Value = Buffer> {
        let cell = prop_oneof![
            Just(Cell::blank()),
            "[a-z]".prop_map(Cell::new),
            (0u8..8).prop_map(|i| Cell::styled("x", Style::new().fg(Color::Indexed(i)))),
        ];
        let size = usize::from(width) * usize::from(height);
        proptest::collection::vec(cell, size).prop_map(move |cells| {
            let mut buf = Buffer::empty(Rect::new(0, 0, width, height));
            for (i, cell) in cells.into_iter().enumerate() {
                let (x, y) = buf.pos_of(i);
                buf.set(x, y, cell);
            }
            buf
        })
    }

    fn arb_pair() -> impl Strategy<Value = (Buffer, Buffer)> {
        (1u16..12, 1u16..6).prop_flat_map(|(w, h)| (arb_buffer(w, h), arb_buffer(w, h)))
    }

    proptest! {
        #[test]
        fn diff_with_self_is_empty(buf in (1u16..12, 1u16..6).prop_flat_map(|(w, h)| arb_buffer(w, h))) {
            prop_assert!(diff(&buf, &buf).is_empty());
        }

        #[test]
        fn applying_diff_reproduces_target((a, b) in arb_pair()) {
            let updates = diff(&a, &b);
            let mut patched = a.clone();
            apply(&mut patched, &updates);
            prop_assert_eq!(patched, b);
        }

        #[test]
        fn unchanged_cells_are_never_emitted((a, b) in arb_pair()) {
            for u in diff(&a, &b) {
                prop_assert_ne!(a.get(u.x, u.y), b.get(u.x, u.y));
            }
        }

        #[test]
        fn updates_are_strictly_row_major((a, b) in arb_pair()) {
            let updates = diff(&a, &b);
            for pair in updates.windows(2) {
                prop_assert!((pair[0].y, pair[0].x) < (pair[1].y, pair[1].x));
            }
        }
    }

    proptest! {
        #[test]
        fn wide_pairs_emitted_together(text in "[a-c中文]{0,6}", at in 0u16..8) {
            let prev = Buffer::empty(Rect::new(0, 0, 8, 1));
            let mut next = prev.clone();
            next.set_string(at, 0, &text, &Style::EMPTY);

            let updates = diff(&prev, &next);
            for u in &updates {
                if u.cell.width() > 1 && u.x + 1 < 8 {
                    prop_assert!(updates.iter().any(|v| v.x == u.x + 1));
                }
                if u.cell.is_continuation() {
                    prop_assert!(updates.iter().any(|v| v.x + 1 == u.x));
                }
            }
        }
    }
}
