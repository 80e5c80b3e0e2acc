// SPDX-License-Identifier: MIT
//
// gridline-term — render/I-O core for gridline.
//
// Widgets paint styled cells into a Buffer. Each frame is diffed against
// the previous one, and only the changed cells are encoded to ANSI,
// with cursor moves and SGR changes skipped wherever the terminal is
// already in the right state. The whole frame goes out in one write.
//
// Underneath sits a small platform layer that owns the terminal device:
// raw mode via termios, TIOCGWINSZ size queries, poll-based single-byte
// reads with timeouts, and SIGWINCH delivered to a normal-context callback.
// A DECRQM/DECRPM exchange detects optional terminal modes such as
// grapheme-cluster cursor movement (2027).
//
// This crate intentionally avoids external TUI frameworks (ratatui,
// crossterm) in favor of direct terminal control via ANSI escape
// sequences and raw termios. Every byte sent to the terminal is
// accounted for. Every frame is diffed. Every escape code is earned.

pub mod ansi;
pub mod backend;
pub mod buffer;
pub mod capability;
pub mod cell;
pub mod color;
pub mod config;
pub mod diff;
pub mod error;
pub mod frame;
pub mod output;
pub mod platform;
pub mod terminal;

pub use backend::{Backend, BackendRegistry, ReadOutcome, TermiosBackend, TestBackend, WindowSize};
pub use buffer::{Buffer, Rect};
pub use capability::ModeStatus;
pub use cell::{Cell, Hyperlink, Modifier, Style};
pub use color::{AnsiColor, Color};
pub use config::TerminalOptions;
pub use diff::{CellUpdate, DiffStats};
pub use error::{BackendError, Error, Result};
pub use frame::{Frame, Widget};
pub use terminal::Terminal;
