// SPDX-License-Identifier: MIT
//
// Session options — what a terminal session turns on at startup and which
// backend provides it.
//
// Defaults suit a full-screen app. Each field can be set in code with a
// `with_*` builder or overridden from the environment:
//
//   GRIDLINE_BACKEND            backend name (`termios`, `test`)
//   GRIDLINE_ALT_SCREEN         0/1
//   GRIDLINE_MOUSE              0/1
//   GRIDLINE_QUERY_TIMEOUT_MS   capability query budget in milliseconds
//
// A value that doesn't parse is logged and ignored; it never stops startup.

use std::time::Duration;

/// Environment variable naming the backend to use.
pub const ENV_BACKEND: &str = "GRIDLINE_BACKEND";
/// Environment variable toggling the alternate screen.
pub const ENV_ALT_SCREEN: &str = "GRIDLINE_ALT_SCREEN";
/// Environment variable toggling mouse capture.
pub const ENV_MOUSE: &str = "GRIDLINE_MOUSE";
/// Environment variable for the capability query timeout.
pub const ENV_QUERY_TIMEOUT_MS: &str = "GRIDLINE_QUERY_TIMEOUT_MS";

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(100);

/// Options for opening a terminal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    /// Backend to use by name. `None` tries the registered providers in order.
    pub backend: Option<String>,
    /// Switch to the alternate screen for the session.
    pub alternate_screen: bool,
    /// Report mouse clicks, drags, and wheel events.
    pub mouse_capture: bool,
    /// Hide the hardware cursor unless a frame places it.
    pub hide_cursor: bool,
    /// Total wait for a capability query answer.
    pub grapheme_query_timeout: Duration,
    /// Prefer `/dev/tty` over the standard streams.
    pub use_dev_tty: bool,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            backend: None,
            alternate_screen: true,
            mouse_capture: false,
            hide_cursor: true,
            grapheme_query_timeout: DEFAULT_QUERY_TIMEOUT,
            use_dev_tty: true,
        }
    }
}

impl TerminalOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from `lookup`, which maps a variable name
    /// to its value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();

        if let Some(name) = lookup(ENV_BACKEND) {
            let name = name.trim();
            if !name.is_empty() {
                opts.backend = Some(name.to_ascii_lowercase());
            }
        }
        if let Some(v) = lookup(ENV_ALT_SCREEN).and_then(|v| parse_flag(ENV_ALT_SCREEN, &v)) {
            opts.alternate_screen = v;
        }
        if let Some(v) = lookup(ENV_MOUSE).and_then(|v| parse_flag(ENV_MOUSE, &v)) {
            opts.mouse_capture = v;
        }
        if let Some(raw) = lookup(ENV_QUERY_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => opts.grapheme_query_timeout = Duration::from_millis(ms),
                Err(e) => log::warn!("ignoring {ENV_QUERY_TIMEOUT_MS}={raw:?}: {e}"),
            }
        }
        opts
    }

    #[must_use]
    pub fn with_backend(mut self, name: impl Into<String>) -> Self {
        self.backend = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_alternate_screen(mut self, on: bool) -> Self {
        self.alternate_screen = on;
        self
    }

    #[must_use]
    pub fn with_mouse_capture(mut self, on: bool) -> Self {
        self.mouse_capture = on;
        self
    }

    #[must_use]
    pub fn with_hide_cursor(mut self, on: bool) -> Self {
        self.hide_cursor = on;
        self
    }

    #[must_use]
    pub fn with_grapheme_query_timeout(mut self, timeout: Duration) -> Self {
        self.grapheme_query_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_dev_tty(mut self, on: bool) -> Self {
        self.use_dev_tty = on;
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            log::warn!("ignoring {key}={raw:?}: expected 0 or 1");
            None
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
