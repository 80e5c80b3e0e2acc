// SPDX-License-Identifier: MIT
//
// Color — the closed set of colors a terminal cell can carry.
//
// Four variants, each with a deterministic wire encoding:
//
//   Reset       → SGR 39 / 49 (terminal default)
//   Ansi(c)     → the 16 base colors, SGR 30–37 / 90–97 and 40–47 / 100–107
//   Indexed(i)  → 256-color palette, 38;5;i / 48;5;i
//   Rgb(r,g,b)  → 24-bit TrueColor, 38;2;r;g;b / 48;2;r;g;b
//
// Only Indexed and Rgb have an underline-color form (SGR 58). The encoder
// in `ansi` owns the byte-level strings; this module owns the numbers.

use std::fmt;
use std::str::FromStr;

// ─── AnsiColor ───────────────────────────────────────────────────────────────

/// The 16 base ANSI colors.
///
/// Declaration order matches the palette index (0–15), so
/// `AnsiColor::Red as u8 == 1` and `AnsiColor::BrightRed as u8 == 9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AnsiColor {
    Black = 0,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    /// All sixteen colors in palette order.
    pub const ALL: [Self; 16] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
        Self::BrightBlack,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
        Self::BrightWhite,
    ];

    /// Palette index (0–15).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Whether this is one of the bright (8–15) variants.
    #[inline]
    #[must_use]
    pub const fn is_bright(self) -> bool {
        self.index() >= 8
    }

    /// SGR foreground code: 30–37 for normal, 90–97 for bright.
    #[inline]
    #[must_use]
    pub const fn fg_code(self) -> u8 {
        if self.is_bright() {
            82 + self.index()
        } else {
            30 + self.index()
        }
    }

    /// SGR background code: 40–47 for normal, 100–107 for bright.
    #[inline]
    #[must_use]
    pub const fn bg_code(self) -> u8 {
        self.fg_code() + 10
    }

    /// Lowercase name as accepted by [`Color::from_str`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright-black",
            Self::BrightRed => "bright-red",
            Self::BrightGreen => "bright-green",
            Self::BrightYellow => "bright-yellow",
            Self::BrightBlue => "bright-blue",
            Self::BrightMagenta => "bright-magenta",
            Self::BrightCyan => "bright-cyan",
            Self::BrightWhite => "bright-white",
        }
    }
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal color.
///
/// ```
/// use gridline_term::color::{AnsiColor, Color};
///
/// let accent: Color = "#ff8800".parse().unwrap();
/// assert_eq!(accent, Color::Rgb(0xff, 0x88, 0x00));
/// assert_eq!("red".parse::<Color>().unwrap(), Color::Ansi(AnsiColor::Red));
/// assert_eq!("200".parse::<Color>().unwrap(), Color::Indexed(200));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (inherits the user's theme).
    #[default]
    Reset,
    /// One of the 16 base colors.
    Ansi(AnsiColor),
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Parse `#rrggbb` or `#rgb`.
    ///
    /// Returns `None` on anything else.
    #[must_use]
    pub fn hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            6 => {
                let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
                let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
                let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
                Some(Self::Rgb(r, g, b))
            }
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|v| v * 17);
                Some(Self::Rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            _ => None,
        }
    }

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_reset(self) -> bool {
        matches!(self, Self::Reset)
    }

    /// Whether this color can be expressed as an SGR 58 underline color.
    ///
    /// Reset and the 16 base colors have no underline-color encoding.
    #[inline]
    #[must_use]
    pub const fn has_underline_form(self) -> bool {
        matches!(self, Self::Indexed(_) | Self::Rgb(..))
    }
}

impl From<AnsiColor> for Color {
    fn from(c: AnsiColor) -> Self {
        Self::Ansi(c)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::Rgb(r, g, b)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Ansi(c) => write!(f, "{}", c.name()),
            Self::Indexed(i) => write!(f, "indexed({i})"),
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexed(i) => write!(f, "{i}"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color `{0}`")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Accepts `reset`/`default`, the 16 names (`red`, `bright-red`, also
    /// `bright_red` and `brightred`), a palette index `0`–`255`, or hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('#') {
            return Self::hex(trimmed).ok_or_else(|| ParseColorError(s.to_owned()));
        }
        if let Ok(idx) = trimmed.parse::<u8>() {
            return Ok(Self::Indexed(idx));
        }

        let norm = trimmed.to_ascii_lowercase().replace(['_', ' '], "-");
        if matches!(norm.as_str(), "reset" | "default") {
            return Ok(Self::Reset);
        }
        let squashed = norm.replace('-', "");
        AnsiColor::ALL
            .into_iter()
            .find(|c| c.name() == norm || c.name().replace('-', "") == squashed)
            .map(Self::Ansi)
            .ok_or_else(|| ParseColorError(s.to_owned()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
