// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Two kinds of functions live here, both stateless:
//
//   - Encoders (`style_to_sgr`, `color_fg`, `color_bg`, `underline_color`,
//     `hyperlink_start`, `hyperlink_end`) turn style values into strings.
//     They know the byte-level encoding; they make no decisions about when
//     to emit. That is the `CellWriter`'s job.
//
//   - Fixed-sequence writers (`cursor_to`, `enter_alt_screen`, ...) write
//     one terminal command to any `impl Write` and propagate the writer's
//     `io::Result`. Writing to an `OutputBuffer` (a Vec) never fails.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI standard uses 1-based coordinates).

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::cell::{Hyperlink, Style};
use crate::color::Color;

/// Control Sequence Introducer.
pub const CSI: &str = "\x1b[";

/// String Terminator (ESC \), used to close OSC sequences.
pub const ST: &str = "\x1b\\";

// ─── SGR Encoding ────────────────────────────────────────────────────────────

/// Encode a full style as one SGR sequence.
///
/// Always starts from a reset (`0`) so the result is independent of what
/// the terminal had before, then appends foreground, background, every
/// modifier in declaration order, and the underline color. Underline colors
/// with no SGR 58 form (reset, the 16 base colors) are omitted entirely.
/// Hyperlinks and extensions are not part of SGR and are ignored here.
///
/// ```
/// use gridline_term::ansi::style_to_sgr;
/// use gridline_term::cell::{Modifier, Style};
/// use gridline_term::color::Color;
///
/// let style = Style::new().fg(Color::Indexed(1)).add_modifier(Modifier::BOLD);
/// assert_eq!(style_to_sgr(&style), "\x1b[0;38;5;1;1m");
/// ```
#[must_use]
pub fn style_to_sgr(style: &Style) -> String {
    let mut params = String::from("0");

    if let Some(fg) = style.foreground {
        params.push(';');
        params.push_str(&color_fg(fg));
    }
    if let Some(bg) = style.background {
        params.push(';');
        params.push_str(&color_bg(bg));
    }
    for code in style.modifiers.sgr_codes() {
        // Writing to a String cannot fail.
        let _ = write!(params, ";{code}");
    }
    if let Some(ul) = style.underline_color {
        let clause = underline_color(ul);
        if !clause.is_empty() {
            params.push(';');
            params.push_str(&clause);
        }
    }

    format!("{CSI}{params}m")
}

/// SGR parameters selecting `color` as the foreground.
///
/// Reset is `39`; base colors use `30–37`/`90–97`; palette and RGB use the
/// extended `38;5;i` and `38;2;r;g;b` forms.
#[must_use]
pub fn color_fg(color: Color) -> String {
    match color {
        Color::Reset => "39".to_owned(),
        Color::Ansi(c) => c.fg_code().to_string(),
        Color::Indexed(i) => format!("38;5;{i}"),
        Color::Rgb(r, g, b) => format!("38;2;{r};{g};{b}"),
    }
}

/// SGR parameters selecting `color` as the background.
#[must_use]
pub fn color_bg(color: Color) -> String {
    match color {
        Color::Reset => "49".to_owned(),
        Color::Ansi(c) => c.bg_code().to_string(),
        Color::Indexed(i) => format!("48;5;{i}"),
        Color::Rgb(r, g, b) => format!("48;2;{r};{g};{b}"),
    }
}

/// SGR 58 parameters for an underline color, or an empty string.
///
/// Reset and the base colors have no representation; callers must omit the
/// clause rather than emit a dangling `;`.
#[must_use]
pub fn underline_color(color: Color) -> String {
    match color {
        Color::Indexed(i) => format!("58;5;{i}"),
        Color::Rgb(r, g, b) => format!("58;2;{r};{g};{b}"),
        Color::Reset | Color::Ansi(_) => String::new(),
    }
}

/// Write the SGR sequence for `style`.
#[inline]
pub fn set_style(w: &mut impl Write, style: &Style) -> io::Result<()> {
    w.write_all(style_to_sgr(style).as_bytes())
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// The stateful writer must invalidate its tracked style after this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Hyperlinks (OSC 8) ──────────────────────────────────────────────────────

/// Backslash-escape `;` and `\` inside an OSC 8 field.
fn escape_osc_field(raw: &str, out: &mut String) {
    for ch in raw.chars() {
        if matches!(ch, ';' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Open an OSC 8 hyperlink.
///
/// The optional id is embedded as `id=<id>` in the parameter field. `;`
/// separates fields and `\` starts the string terminator, so both are
/// backslash-escaped in the id and in the URL.
///
/// ```
/// use gridline_term::ansi::hyperlink_start;
/// use gridline_term::cell::Hyperlink;
///
/// let link = Hyperlink::new("https://example.com/a;b").with_id("x");
/// assert_eq!(
///     hyperlink_start(&link),
///     "\x1b]8;id=x;https://example.com/a\\;b\x1b\\"
/// );
/// ```
#[must_use]
pub fn hyperlink_start(link: &Hyperlink) -> String {
    let mut seq = String::from("\x1b]8;");
    if let Some(id) = &link.id {
        seq.push_str("id=");
        escape_osc_field(id, &mut seq);
    }
    seq.push(';');
    escape_osc_field(&link.url, &mut seq);
    seq.push_str(ST);
    seq
}

/// Close the currently open OSC 8 hyperlink.
#[must_use]
pub const fn hyperlink_end() -> &'static str {
    "\x1b]8;;\x1b\\"
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using the CUP (Cursor Position) sequence.
///
/// Our coordinates are 0-indexed; ANSI CUP is 1-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(
        w,
        "\x1b[{};{}H",
        u32::from(y) + 1,
        u32::from(x) + 1
    )
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2) and home the cursor.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J\x1b[H")
}

/// Scroll the whole screen up by `n` lines (SU). `n == 0` writes nothing.
#[inline]
pub fn scroll_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}S")
}

/// Scroll the whole screen down by `n` lines (SD). `n == 0` writes nothing.
#[inline]
pub fn scroll_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}T")
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC Private Mode 2026).
///
/// Tells the terminal to buffer all subsequent output until [`end_sync`].
/// Terminals without support ignore it.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output; the terminal presents the buffered frame.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
///
/// The original terminal content is preserved and comes back on exit.
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// Enable mouse tracking: button events (1000), drag motion (1002), urxvt
/// extended coordinates (1015) and SGR coordinates (1006).
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h")
}

/// Disable all mouse tracking, in reverse order of enabling.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l")
}

// ─── DEC Private Modes ──────────────────────────────────────────────────────

/// Ask the terminal for the status of a private mode (DECRQM).
///
/// The terminal answers with DECRPM: `CSI ? <mode> ; <status> $ y`.
#[inline]
pub fn request_mode(w: &mut impl Write, mode: u16) -> io::Result<()> {
    write!(w, "\x1b[?{mode}$p")
}

/// Set a private mode (DECSET).
#[inline]
pub fn enable_mode(w: &mut impl Write, mode: u16) -> io::Result<()> {
    write!(w, "\x1b[?{mode}h")
}

/// Reset a private mode (DECRST).
#[inline]
pub fn disable_mode(w: &mut impl Write, mode: u16) -> io::Result<()> {
    write!(w, "\x1b[?{mode}l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
