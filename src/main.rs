// SPDX-License-Identifier: MIT
//
// gridline — a live input viewer that drives the whole render/I-O core.
//
// Picks a backend through the registry (GRIDLINE_BACKEND overrides), asks
// the terminal whether it supports grapheme-cluster mode, then runs a draw
// loop: every byte read from the terminal is logged on screen, window
// changes are logged as they arrive, and `q` quits.
//
//   ┌──────────────────────────────┐
//   │ header: size, backend, 2027  │  ← 1 row
//   ├──────────────────────────────┤
//   │ input log                    │  ← h - 3 rows
//   ├──────────────────────────────┤
//   │ status: frames, last diff    │  ← 1 row
//   └──────────────────────────────┘
//
// Logging goes to stderr, which is the terminal, so it is only set up when
// RUST_LOG is set (redirect stderr to a file to read it).
//
// Usage:
//   cargo run
//   GRIDLINE_BACKEND=test cargo run     # headless, draws a few frames

use std::collections::VecDeque;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use gridline_term::backend::{Backend, BackendRegistry, ReadOutcome};
use gridline_term::buffer::{Buffer, Rect};
use gridline_term::capability::ModeStatus;
use gridline_term::cell::{Hyperlink, Modifier, Style};
use gridline_term::color::{AnsiColor, Color};
use gridline_term::config::TerminalOptions;
use gridline_term::diff::DiffStats;
use gridline_term::frame::{Frame, Widget};
use gridline_term::terminal::Terminal;

/// Maximum number of entries kept in the scrolling log.
const MAX_LOG_ENTRIES: usize = 200;

/// How long each read waits before the loop redraws anyway.
const READ_TIMEOUT_MS: i32 = 250;

/// Frames drawn by the headless test backend before exiting.
const HEADLESS_FRAMES: u64 = 3;

const PROJECT_URL: &str = "https://github.com/gridline-rs/gridline";

// ─── Viewer State ───────────────────────────────────────────────────────────

struct Viewer {
    backend: &'static str,
    grapheme: ModeStatus,
    log: VecDeque<String>,
    bytes: u64,
    last: DiffStats,
    start: Instant,
}

impl Viewer {
    fn new(backend: &'static str, grapheme: ModeStatus) -> Self {
        Self {
            backend,
            grapheme,
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            bytes: 0,
            last: DiffStats::default(),
            start: Instant::now(),
        }
    }

    fn push_log(&mut self, msg: String) {
        if self.log.len() >= MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(msg);
    }

    fn on_byte(&mut self, b: u8) {
        self.bytes += 1;
        self.push_log(format!("0x{b:02x}  {}", describe_byte(b)));
    }

    fn render(&self, f: &mut Frame<'_>) {
        let area = f.area();
        if area.width < 20 || area.height < 4 {
            return;
        }

        f.render_widget(
            Header {
                screen: area,
                backend: self.backend,
                grapheme: self.grapheme,
            },
            Rect::new(area.x, area.y, area.width, 1),
        );
        f.render_widget(
            LogView { entries: &self.log },
            Rect::new(area.x, area.y + 1, area.width, area.height - 2),
        );

        let status = format!(
            " {} bytes | last frame: {} cells, {} bytes | {:.1}s | q quits ",
            self.bytes,
            self.last.cells_emitted,
            self.last.bytes_written,
            self.start.elapsed().as_secs_f64()
        );
        let bar = Style::new()
            .fg(Color::Ansi(AnsiColor::Black))
            .bg(Color::Rgb(80, 80, 100));
        let y = area.bottom() - 1;
        let buf = f.buffer_mut();
        buf.fill(Rect::new(area.x, y, area.width, 1), &bar);
        buf.set_string(area.x, y, &status, &bar);
    }
}

/// Human-readable name for one input byte.
fn describe_byte(b: u8) -> String {
    match b {
        0x1b => "ESC".into(),
        b'\r' => "Enter".into(),
        b'\t' => "Tab".into(),
        0x7f => "Backspace".into(),
        b' ' => "Space".into(),
        0x00..=0x1f => format!("Ctrl-{}", char::from(b + b'@')),
        0x21..=0x7e => format!("'{}'", char::from(b)),
        _ => "(non-ASCII)".into(),
    }
}

// ─── Widgets ────────────────────────────────────────────────────────────────

struct Header {
    screen: Rect,
    backend: &'static str,
    grapheme: ModeStatus,
}

impl Widget for Header {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::new()
            .fg(Color::Rgb(0, 0, 0))
            .bg(Color::Rgb(100, 200, 255))
            .add_modifier(Modifier::BOLD);
        buf.fill(area, &style);

        let mode = match self.grapheme {
            ModeStatus::Enabled => "on",
            ModeStatus::SupportedDisabled => "off",
            ModeStatus::NotSupported => "n/a",
        };
        let title = format!(
            " gridline | {}x{} | backend: {} | grapheme clusters: {mode} ",
            self.screen.width, self.screen.height, self.backend
        );
        let used = buf.set_string(area.x, area.y, &title, &style);

        let link = style
            .remove_modifier(Modifier::BOLD)
            .add_modifier(Modifier::UNDERLINED)
            .hyperlink(Hyperlink::new(PROJECT_URL));
        buf.set_string(area.x + used, area.y, "source", &link);
    }
}

struct LogView<'a> {
    entries: &'a VecDeque<String>,
}

impl Widget for LogView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = usize::from(area.height);
        let skip = self.entries.len().saturating_sub(rows);
        let even = Style::new().fg(Color::Rgb(130, 220, 130));
        let odd = even.clone().bg(Color::Rgb(20, 20, 30));
        let number = Style::new().fg(Color::Indexed(244));

        for (y, (i, entry)) in (area.y..area.bottom()).zip(self.entries.iter().enumerate().skip(skip)) {
            let style = if i % 2 == 0 { &even } else { &odd };
            buf.fill(Rect::new(area.x, y, area.width, 1), style);
            let n = buf.set_string(area.x, y, &format!("{:>5} ", i + 1), &number);
            buf.set_string(area.x + n, y, entry, style);
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run() -> gridline_term::Result<()> {
    let options = TerminalOptions::from_env();
    let mut backend = BackendRegistry::with_defaults().create(&options)?;
    let name = backend.name();

    // Before the session starts: the answer must not land in the input log.
    let mut grapheme = backend.query_grapheme_cluster_mode(options.grapheme_query_timeout)?;
    if grapheme == ModeStatus::SupportedDisabled {
        backend.set_grapheme_cluster_mode(true)?;
        grapheme = ModeStatus::Enabled;
    }

    let resized = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&resized);
    backend.on_resize(Box::new(move |_| flag.store(true, Ordering::Relaxed)))?;

    let mut terminal = Terminal::with_options(backend, &options)?;
    let mut viewer = Viewer::new(name, grapheme);
    viewer.push_log(format!("backend `{name}`, grapheme-cluster mode: {grapheme:?}"));
    viewer.push_log("type anything; q quits".into());

    loop {
        let stats = terminal.draw(|f| viewer.render(f))?;
        viewer.last = stats;

        if name == "test" && terminal.frame_count() >= HEADLESS_FRAMES {
            break;
        }

        let outcome = terminal.backend_mut().read(READ_TIMEOUT_MS)?;
        if resized.swap(false, Ordering::Relaxed) {
            let size = terminal.size()?;
            viewer.push_log(format!("resize: {size} ({} cells)", size.area()));
        }
        match outcome {
            ReadOutcome::Byte(b'q') | ReadOutcome::Eof => break,
            ReadOutcome::Byte(b) => viewer.on_byte(b),
            ReadOutcome::Timeout => {}
        }
    }

    terminal.close()
}

fn main() {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    }

    if let Err(e) = run() {
        eprintln!("gridline: {e}");
        process::exit(1);
    }
}
