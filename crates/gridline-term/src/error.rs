// SPDX-License-Identifier: MIT
//
// Error taxonomy for the render/I-O core.
//
// Two families stay distinct so callers can tell "this environment cannot
// host a TUI" apart from "a write failed":
//
//   BackendError — non-I/O failures: no terminal, unsupported platform,
//   a resize handler already owned by another session, backend discovery
//   exhausted.
//
//   io::Error — anything the kernel said no to. Always propagated, except
//   inside `close()` where later teardown steps still run; the first
//   teardown failure is then reported as `Error::Teardown`.
//
// EINTR never shows up here. The platform layer retries interrupted calls
// against the remaining timeout budget.

use std::io;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure surfaced by the render/I-O core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A read, write, or size query failed at the OS level.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The backend cannot be constructed or operated in this environment.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A teardown step failed during `close()`.
    ///
    /// Only reported when the platform layer's own close succeeded; a
    /// platform close failure takes precedence and is returned instead.
    #[error("terminal teardown failed at `{step}`: {source}")]
    Teardown {
        /// Name of the first step that failed.
        step: &'static str,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Whether this is a backend (environment) failure rather than I/O.
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Non-I/O backend failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Neither `/dev/tty` nor the standard streams are a terminal.
    #[error("no terminal device available")]
    NotATerminal,

    /// The platform has no terminal layer implementation.
    #[error("terminal control is not supported on {platform}")]
    Unsupported {
        /// `std::env::consts::OS` of the running process.
        platform: &'static str,
    },

    /// Another session already owns the window-change signal handler.
    #[error("a resize signal handler is already installed for another session")]
    ResizeHandlerActive,

    /// The backend was used after `close()`.
    #[error("backend is closed")]
    Closed,

    /// Every registered provider failed (or too many failed in a row).
    #[error("no backend provider could be constructed ({attempted} attempted)")]
    NoProvider {
        /// How many providers were tried before giving up.
        attempted: usize,
    },

    /// A specific provider failed while being constructed.
    #[error("backend provider `{name}` failed: {reason}")]
    ProviderFailed {
        /// Registered provider name.
        name: String,
        /// Human-readable failure.
        reason: String,
    },

    /// The override named a backend nobody registered.
    #[error("unknown backend `{0}`")]
    UnknownBackend(String),

    /// The OS reported a zero-sized window.
    #[error("terminal reported an unusable size ({cols}x{rows})")]
    InvalidSize {
        /// Reported columns.
        cols: u16,
        /// Reported rows.
        rows: u16,
    },
}

// ─── Tests ───────────────────────────────────────────────────────────────────
