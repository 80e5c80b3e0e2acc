// SPDX-License-Identifier: MIT
//
// Cell and Style — the atomic unit of terminal rendering.
//
// Every character position on screen is a Cell: one grapheme cluster plus
// the Style it is drawn with. The whole rendering pipeline exists to
// produce, diff, and output these. Cells are plain values compared by full
// structural equality, which is exactly what the diff engine needs.
//
// Style is composable. `patch` layers a later style over an earlier one:
// non-null colors and hyperlinks override, modifiers union (and can be
// subtracted through `sub_modifier`), extensions merge key by key.
// `Style::EMPTY` is the identity for `patch`.
//
// Wide graphemes (CJK, most emoji) occupy two columns. The first cell holds
// the grapheme; the second is a continuation cell with an empty symbol. The
// writer skips continuation output when it just drew the owner, but still
// carries their style so the background fills correctly.

use std::collections::BTreeMap;
use std::fmt;

use unicode_width::UnicodeWidthStr;

use crate::color::Color;

// ─── Modifier ────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text modifiers, each mapping to one fixed SGR parameter.
    ///
    /// Combine with bitwise OR:
    ///
    /// ```
    /// use gridline_term::cell::Modifier;
    ///
    /// let m = Modifier::BOLD | Modifier::ITALIC;
    /// assert!(m.contains(Modifier::BOLD));
    /// assert!(!m.contains(Modifier::DIM));
    /// ```
    ///
    /// Iteration (and therefore encoding) follows declaration order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
    pub struct Modifier: u8 {
        /// SGR 1 — increased intensity.
        const BOLD        = 1 << 0;
        /// SGR 2 — decreased intensity.
        const DIM         = 1 << 1;
        /// SGR 3 — italic.
        const ITALIC      = 1 << 2;
        /// SGR 4 — single underline.
        const UNDERLINED  = 1 << 3;
        /// SGR 7 — swap foreground and background.
        const REVERSED    = 1 << 4;
        /// SGR 9 — crossed-out text.
        const CROSSED_OUT = 1 << 5;
        /// SGR 8 — invisible text.
        const HIDDEN      = 1 << 6;
    }
}

impl Modifier {
    /// The SGR parameter for a single flag.
    ///
    /// Returns `None` when `self` is empty or has more than one bit set.
    #[must_use]
    pub const fn sgr_code(self) -> Option<u8> {
        match self.bits() {
            b if b == Self::BOLD.bits() => Some(1),
            b if b == Self::DIM.bits() => Some(2),
            b if b == Self::ITALIC.bits() => Some(3),
            b if b == Self::UNDERLINED.bits() => Some(4),
            b if b == Self::REVERSED.bits() => Some(7),
            b if b == Self::CROSSED_OUT.bits() => Some(9),
            b if b == Self::HIDDEN.bits() => Some(8),
            _ => None,
        }
    }

    /// SGR parameters of every set flag, in declaration order.
    pub fn sgr_codes(self) -> impl Iterator<Item = u8> {
        self.iter().filter_map(Self::sgr_code)
    }
}

// ─── Hyperlink ───────────────────────────────────────────────────────────────

/// An OSC-8 hyperlink target.
///
/// Cells sharing the same link value are bracketed by a single
/// open/close pair when drawn contiguously. The optional `id` lets the
/// terminal group non-contiguous runs (e.g. a wrapped link) as one link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hyperlink {
    /// Target URI.
    pub url: String,
    /// Explicit link id, emitted as `id=<id>`.
    pub id: Option<String>,
}

impl Hyperlink {
    /// A link without an explicit id.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: None,
        }
    }

    /// Attach an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// ─── Extensions ──────────────────────────────────────────────────────────────

/// Key for a style extension.
///
/// Extensions carry renderer-agnostic metadata on a style (semantic tags,
/// widget hints). The ANSI encoder ignores them, but they participate in
/// equality, so changing one marks the cell dirty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtensionKey(String);

impl ExtensionKey {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExtensionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Value stored under an [`ExtensionKey`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for ExtensionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ExtensionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ExtensionValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// How a cell is drawn: colors, modifiers, hyperlink, extensions.
///
/// `None` colors mean "not specified" — the encoder emits nothing for them,
/// so after the leading SGR reset the terminal default applies.
///
/// ```
/// use gridline_term::cell::{Modifier, Style};
/// use gridline_term::color::{AnsiColor, Color};
///
/// let base = Style::new().fg(Color::Ansi(AnsiColor::Red)).add_modifier(Modifier::BOLD);
/// let over = Style::new().bg(Color::Indexed(236)).remove_modifier(Modifier::BOLD);
/// let s = base.patch(&over);
/// assert_eq!(s.foreground, Some(Color::Ansi(AnsiColor::Red)));
/// assert_eq!(s.background, Some(Color::Indexed(236)));
/// assert!(!s.modifiers.contains(Modifier::BOLD));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub underline_color: Option<Color>,
    /// Modifiers that are on.
    pub modifiers: Modifier,
    /// Modifiers this style switches off when patched onto another.
    pub sub_modifier: Modifier,
    pub hyperlink: Option<Hyperlink>,
    pub extensions: BTreeMap<ExtensionKey, ExtensionValue>,
}

impl Style {
    /// The identity for [`patch`](Self::patch).
    pub const EMPTY: Self = Self {
        foreground: None,
        background: None,
        underline_color: None,
        modifiers: Modifier::empty(),
        sub_modifier: Modifier::empty(),
        hyperlink: None,
        extensions: BTreeMap::new(),
    };

    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[must_use]
    pub fn fg(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    #[must_use]
    pub fn bg(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    #[must_use]
    pub fn underline_color(mut self, color: Color) -> Self {
        self.underline_color = Some(color);
        self
    }

    /// Turn modifiers on (and cancel any pending removal of them).
    #[must_use]
    pub fn add_modifier(mut self, m: Modifier) -> Self {
        self.sub_modifier.remove(m);
        self.modifiers.insert(m);
        self
    }

    /// Turn modifiers off, both here and when patched onto another style.
    #[must_use]
    pub fn remove_modifier(mut self, m: Modifier) -> Self {
        self.modifiers.remove(m);
        self.sub_modifier.insert(m);
        self
    }

    #[must_use]
    pub fn hyperlink(mut self, link: Hyperlink) -> Self {
        self.hyperlink = Some(link);
        self
    }

    #[must_use]
    pub fn extension(mut self, key: impl Into<ExtensionKey>, value: impl Into<ExtensionValue>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Whether this style specifies nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Layer `other` over `self`.
    ///
    /// Later non-null fields win; modifiers union after `other`'s removals
    /// are applied; extensions merge with `other` winning on key collisions.
    #[must_use]
    pub fn patch(&self, other: &Self) -> Self {
        let mut extensions = self.extensions.clone();
        extensions.extend(other.extensions.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            foreground: other.foreground.or(self.foreground),
            background: other.background.or(self.background),
            underline_color: other.underline_color.or(self.underline_color),
            modifiers: (self.modifiers - other.sub_modifier) | other.modifiers,
            sub_modifier: (self.sub_modifier - other.modifiers) | other.sub_modifier,
            hyperlink: other.hyperlink.clone().or_else(|| self.hyperlink.clone()),
            extensions,
        }
    }

    /// Whether two styles render identically on the wire.
    ///
    /// Ignores `sub_modifier` and extensions, which never reach the
    /// terminal. Used by the cell writer to suppress redundant SGR output.
    #[must_use]
    pub fn same_rendition(&self, other: &Self) -> bool {
        self.foreground == other.foreground
            && self.background == other.background
            && self.underline_color == other.underline_color
            && self.modifiers == other.modifiers
            && self.hyperlink == other.hyperlink
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// # Symbols
///
/// - `" "` — blank (the default)
/// - `""` — continuation of the wide grapheme to the left
/// - anything else — one grapheme cluster to draw
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    symbol: String,
    style: Style,
}

/// Symbol of a blank cell.
const BLANK: &str = " ";

impl Cell {
    /// A blank cell with the empty style.
    #[must_use]
    pub fn blank() -> Self {
        Self::styled(BLANK, Style::EMPTY)
    }

    /// A cell holding `symbol` with the empty style.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::styled(symbol, Style::EMPTY)
    }

    #[must_use]
    pub fn styled(symbol: impl Into<String>, style: Style) -> Self {
        Self {
            symbol: symbol.into(),
            style,
        }
    }

    /// The reserved second column of a wide grapheme.
    ///
    /// Carries the owner's style so the background fills under both columns.
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            symbol: String::new(),
            style,
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    #[must_use]
    pub const fn style(&self) -> &Style {
        &self.style
    }

    #[inline]
    #[must_use]
    pub fn is_continuation(&self) -> bool {
        self.symbol.is_empty()
    }

    /// Whether this cell is a blank with the empty style.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.symbol == BLANK && self.style.is_empty()
    }

    /// Display width in columns: 0 for continuations, 2 for wide graphemes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.symbol.width()
    }

    // ─── Mutations ────────────────────────────────────────────────────────

    pub fn set_symbol(&mut self, symbol: &str) -> &mut Self {
        symbol.clone_into(&mut self.symbol);
        self
    }

    pub fn set_style(&mut self, style: Style) -> &mut Self {
        self.style = style;
        self
    }

    /// Patch `style` over the cell's current style.
    pub fn patch_style(&mut self, style: &Style) -> &mut Self {
        self.style = self.style.patch(style);
        self
    }

    /// Reset to a blank cell with the empty style, keeping the allocation.
    pub fn reset(&mut self) {
        BLANK.clone_into(&mut self.symbol);
        self.style = Style::EMPTY;
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        write!(f, "Cell({:?}", self.symbol)?;
        if let Some(fg) = self.style.foreground {
            write!(f, ", fg={fg:?}")?;
        }
        if let Some(bg) = self.style.background {
            write!(f, ", bg={bg:?}")?;
        }
        if !self.style.modifiers.is_empty() {
            write!(f, ", {:?}", self.style.modifiers)?;
        }
        if let Some(link) = &self.style.hyperlink {
            write!(f, ", link={}", link.url)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::AnsiColor;

    // ── Modifier ─────────────────────────────────────────────────────────

    #[test]
    fn modifier_codes() {
        assert_eq!(Modifier::BOLD.sgr_code(), Some(1));
        assert_eq!(Modifier::DIM.sgr_code(), Some(2));
        assert_eq!(Modifier::ITALIC.sgr_code(), Some(3));
        assert_eq!(Modifier::UNDERLINED.sgr_code(), Some(4));
        assert_eq!(Modifier::REVERSED.sgr_code(), Some(7));
        assert_eq!(Modifier::HIDDEN.sgr_code(), Some(8));
        assert_eq!(Modifier::CROSSED_OUT.sgr_code(), Some(9));
    }

    #[test]
    fn modifier_code_needs_single_flag() {
        assert_eq!(Modifier::empty().sgr_code(), None);
        assert_eq!((Modifier::BOLD | Modifier::DIM).sgr_code(), None);
    }

    #[test]
    fn modifier_codes_follow_declaration_order() {
        let m = Modifier::HIDDEN | Modifier::BOLD | Modifier::CROSSED_OUT;
        let codes: Vec<u8> = m.sgr_codes().collect();
        assert_eq!(codes, vec![1, 9, 8]);
    }

    // ── Style::patch ────────────────────────────────────────────────────

    #[test]
    fn empty_is_patch_identity() {
        let s = Style::new()
            .fg(Color::Rgb(1, 2, 3))
            .add_modifier(Modifier::ITALIC)
            .hyperlink(Hyperlink::new("https://example.com"));
        assert_eq!(s.patch(&Style::EMPTY), s);
        assert_eq!(Style::EMPTY.patch(&s), s);
    }

    #[test]
    fn later_colors_override() {
        let a = Style::new().fg(Color::Ansi(AnsiColor::Red)).bg(Color::Indexed(1));
        let b = Style::new().fg(Color::Ansi(AnsiColor::Blue));
        let p = a.patch(&b);
        assert_eq!(p.foreground, Some(Color::Ansi(AnsiColor::Blue)));
        assert_eq!(p.background, Some(Color::Indexed(1)));
    }

    #[test]
    fn modifiers_union() {
        let a = Style::new().add_modifier(Modifier::BOLD);
        let b = Style::new().add_modifier(Modifier::ITALIC);
        assert_eq!(a.patch(&b).modifiers, Modifier::BOLD | Modifier::ITALIC);
    }

    #[test]
    fn sub_modifier_removes() {
        let a = Style::new().add_modifier(Modifier::BOLD | Modifier::DIM);
        let b = Style::new().remove_modifier(Modifier::BOLD);
        let p = a.patch(&b);
        assert_eq!(p.modifiers, Modifier::DIM);
        assert!(p.sub_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn hyperlink_overrides() {
        let a = Style::new().hyperlink(Hyperlink::new("a"));
        let b = Style::new().hyperlink(Hyperlink::new("b").with_id("x"));
        assert_eq!(a.patch(&b).hyperlink, Some(Hyperlink::new("b").with_id("x")));
        assert_eq!(a.patch(&Style::EMPTY).hyperlink, Some(Hyperlink::new("a")));
    }

    #[test]
    fn extensions_merge_later_wins() {
        let a = Style::new().extension("role", "heading").extension("level", 1_i64);
        let b = Style::new().extension("level", 2_i64);
        let p = a.patch(&b);
        assert_eq!(
            p.extensions.get(&ExtensionKey::new("level")),
            Some(&ExtensionValue::Int(2))
        );
        assert_eq!(
            p.extensions.get(&ExtensionKey::new("role")),
            Some(&ExtensionValue::Text("heading".into()))
        );
    }

    #[test]
    fn same_rendition_ignores_extensions() {
        let a = Style::new().fg(Color::Indexed(3));
        let b = a.clone().extension("tag", true);
        assert_ne!(a, b);
        assert!(a.same_rendition(&b));
    }

    // ── Cell ────────────────────────────────────────────────────────────

    #[test]
    fn default_cell_is_blank() {
        let c = Cell::default();
        assert!(c.is_blank());
        assert_eq!(c.symbol(), " ");
        assert_eq!(c.width(), 1);
    }

    #[test]
    fn continuation_has_no_width() {
        let c = Cell::continuation(Style::new().bg(Color::Indexed(4)));
        assert!(c.is_continuation());
        assert_eq!(c.width(), 0);
        assert_eq!(c.style().background, Some(Color::Indexed(4)));
    }

    #[test]
    fn wide_grapheme_width() {
        assert_eq!(Cell::new("中").width(), 2);
        assert_eq!(Cell::new("a").width(), 1);
    }

    #[test]
    fn equality_is_structural() {
        let a = Cell::styled("x", Style::new().fg(Color::Indexed(1)));
        let b = Cell::styled("x", Style::new().fg(Color::Indexed(1)));
        let c = Cell::styled("x", Style::new().fg(Color::Indexed(2)));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Cell::new("y").with_style(a.style().clone()));
    }

    #[test]
    fn reset_clears_everything() {
        let mut c = Cell::styled("Q", Style::new().add_modifier(Modifier::BOLD));
        c.reset();
        assert!(c.is_blank());
    }

    #[test]
    fn patch_style_layers() {
        let mut c = Cell::styled("Q", Style::new().fg(Color::Indexed(1)));
        c.patch_style(&Style::new().bg(Color::Indexed(2)));
        assert_eq!(c.style().foreground, Some(Color::Indexed(1)));
        assert_eq!(c.style().background, Some(Color::Indexed(2)));
    }

    #[test]
    fn debug_format() {
        let c = Cell::styled(
            "A",
            Style::new()
                .fg(Color::Rgb(255, 0, 0))
                .add_modifier(Modifier::BOLD)
                .hyperlink(Hyperlink::new("https://x.y")),
        );
        let dbg = format!("{c:?}");
        assert!(dbg.starts_with("Cell(\"A\""));
        assert!(dbg.contains("fg=#ff0000"));
        assert!(dbg.contains("BOLD"));
        assert!(dbg.contains("link=https://x.y"));
        assert_eq!(format!("{:?}", Cell::continuation(Style::EMPTY)), "Cell(continuation)");
    }
}
