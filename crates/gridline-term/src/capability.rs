// SPDX-License-Identifier: MIT
//
// Capability negotiation — DECRQM / DECRPM.
//
// To learn whether the terminal supports an optional private mode, we send
// DECRQM (`CSI ? <mode> $ p`) and wait for the DECRPM report:
//
//   ESC [ ? <mode> ; <status> $ y
//
// The parser eats one byte at a time. Any byte that does not fit the
// shape at the current position throws away the partial match (an ESC
// restarts it), so stray input ahead of the report is harmless. A report
// for a different mode is ignored too.
//
// Silence and garbage are indistinguishable from "not supported" within a
// bounded wait, so neither is an error: the answer is simply
// `NotSupported`. The wait is one budget for the whole exchange, measured
// from when the query was sent, not a per-byte timeout.
//
// The built-in use is mode 2027, grapheme-cluster cursor movement. Enable
// and disable are fire-and-forget: no report is awaited.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::ansi;
use crate::error::Result;
use crate::platform::{ReadOutcome, Tty};

/// Private mode for grapheme-cluster-aware cursor movement.
pub const GRAPHEME_CLUSTER_MODE: u16 = 2027;

// ─── ModeStatus ──────────────────────────────────────────────────────────────

/// What the terminal reported for a private mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModeStatus {
    /// Unknown mode, no answer, or an unparseable answer.
    #[default]
    NotSupported,
    /// Set (status 1) or permanently set (status 3).
    Enabled,
    /// Reset (status 2) or permanently reset (status 4).
    SupportedDisabled,
}

impl ModeStatus {
    /// Map a DECRPM status parameter.
    #[must_use]
    pub const fn from_status(status: u32) -> Self {
        match status {
            1 | 3 => Self::Enabled,
            2 | 4 => Self::SupportedDisabled,
            _ => Self::NotSupported,
        }
    }

    /// Whether the terminal knows the mode at all.
    #[inline]
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::NotSupported)
    }
}

// ─── ModeReportParser ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    Private,
    Mode { digits: u8 },
    Status { digits: u8 },
    Dollar,
}

/// Longest numeric parameter we accept. Longer runs are garbage.
const MAX_DIGITS: u8 = 9;

/// Byte-at-a-time recognizer for `ESC [ ? <mode> ; <status> $ y`.
#[derive(Debug, Clone)]
pub struct ModeReportParser {
    expected: u16,
    state: State,
    mode: u32,
    status: u32,
}

impl ModeReportParser {
    /// A parser that only accepts reports for `mode`.
    #[must_use]
    pub const fn new(mode: u16) -> Self {
        Self {
            expected: mode,
            state: State::Ground,
            mode: 0,
            status: 0,
        }
    }

    /// Drop any partial match.
    pub const fn reset(&mut self) {
        self.state = State::Ground;
        self.mode = 0;
        self.status = 0;
    }

    /// Feed one byte. Returns the status when a complete report for the
    /// expected mode has been recognized.
    pub fn feed(&mut self, byte: u8) -> Option<ModeStatus> {
        self.state = match (self.state, byte) {
            (State::Escape, b'[') => State::Csi,
            (State::Csi, b'?') => State::Private,
            (State::Private, b'0'..=b'9') => {
                self.mode = u32::from(byte - b'0');
                State::Mode { digits: 1 }
            }
            (State::Mode { digits }, b'0'..=b'9') if digits < MAX_DIGITS => {
                self.mode = self.mode * 10 + u32::from(byte - b'0');
                State::Mode { digits: digits + 1 }
            }
            (State::Mode { .. }, b';') => State::Status { digits: 0 },
            (State::Status { digits }, b'0'..=b'9') if digits < MAX_DIGITS => {
                self.status = self.status * 10 + u32::from(byte - b'0');
                State::Status { digits: digits + 1 }
            }
            (State::Status { digits }, b'$') if digits > 0 => State::Dollar,
            (State::Dollar, b'y') => {
                let matched = self.mode == u32::from(self.expected);
                let status = ModeStatus::from_status(self.status);
                self.reset();
                return matched.then_some(status);
            }
            // Anything unexpected: start over, but an ESC may begin a report.
            (_, 0x1b) => {
                self.mode = 0;
                self.status = 0;
                State::Escape
            }
            _ => {
                self.reset();
                State::Ground
            }
        };
        None
    }
}

// ─── Negotiation ─────────────────────────────────────────────────────────────

/// The I/O a negotiation needs: send bytes, receive one byte with a timeout.
pub trait ModeChannel {
    /// Write `bytes` and flush them to the terminal.
    ///
    /// # Errors
    ///
    /// Any write failure.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Receive one byte, waiting at most `timeout_ms`.
    ///
    /// # Errors
    ///
    /// Any read failure other than a timeout.
    fn recv(&mut self, timeout_ms: i32) -> Result<ReadOutcome>;
}

impl<T: Tty + ?Sized> ModeChannel for T {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn recv(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        self.read(timeout_ms)
    }
}

/// Ask the terminal about `mode` and wait up to `timeout` for the answer.
///
/// Input bytes that arrive during the wait and are not part of the report
/// are consumed and discarded.
///
/// # Errors
///
/// Only I/O failures. No answer, end of input, or a malformed answer all
/// yield `Ok(ModeStatus::NotSupported)`.
pub fn query_mode<C: ModeChannel + ?Sized>(
    channel: &mut C,
    mode: u16,
    timeout: Duration,
) -> Result<ModeStatus> {
    let deadline = Instant::now() + timeout;

    let mut request = Vec::with_capacity(12);
    ansi::request_mode(&mut request, mode)?;
    channel.send(&request)?;

    let mut parser = ModeReportParser::new(mode);
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let wait = i32::try_from(left.as_millis()).unwrap_or(i32::MAX);

        match channel.recv(wait)? {
            ReadOutcome::Byte(b) => {
                if let Some(status) = parser.feed(b) {
                    log::debug!("mode {mode} reported {status:?}");
                    return Ok(status);
                }
            }
            ReadOutcome::Eof | ReadOutcome::Timeout => {
                log::debug!("mode {mode}: no report within {timeout:?}");
                return Ok(ModeStatus::NotSupported);
            }
        }

        if Instant::now() >= deadline {
            log::debug!("mode {mode}: no report within {timeout:?}");
            return Ok(ModeStatus::NotSupported);
        }
    }
}

/// Ask whether grapheme-cluster mode (2027) is supported.
///
/// # Errors
///
/// Only I/O failures; see [`query_mode`].
pub fn query_grapheme_cluster_mode<C: ModeChannel + ?Sized>(
    channel: &mut C,
    timeout: Duration,
) -> Result<ModeStatus> {
    query_mode(channel, GRAPHEME_CLUSTER_MODE, timeout)
}

/// Turn grapheme-cluster mode on or off. Fire-and-forget.
///
/// # Errors
///
/// Any write failure.
pub fn set_grapheme_cluster_mode<C: ModeChannel + ?Sized>(
    channel: &mut C,
    enabled: bool,
) -> io::Result<()> {
    let mut seq = Vec::with_capacity(10);
    if enabled {
        ansi::enable_mode(&mut seq, GRAPHEME_CLUSTER_MODE)?;
    } else {
        ansi::disable_mode(&mut seq, GRAPHEME_CLUSTER_MODE)?;
    }
    channel.send(&seq)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn parse(bytes: &[u8], mode: u16) -> Option<ModeStatus> {
        let mut p = ModeReportParser::new(mode);
        bytes.iter().find_map(|&b| p.feed(b))
    }

    /// A scripted terminal: records what was sent, replays a reply.
    struct Scripted {
        sent: Vec<u8>,
        reply: VecDeque<u8>,
        recv_calls: usize,
        timeouts: Vec<i32>,
    }

    impl Scripted {
        fn replying(reply: &[u8]) -> Self {
            Self {
                sent: Vec::new(),
                reply: reply.iter().copied().collect(),
                recv_calls: 0,
                timeouts: Vec::new(),
            }
        }
    }

    impl ModeChannel for Scripted {
        fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }

        fn recv(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
            self.recv_calls += 1;
            self.timeouts.push(timeout_ms);
            Ok(self
                .reply
                .pop_front()
                .map_or(ReadOutcome::Timeout, ReadOutcome::Byte))
        }
    }

    // ── Status mapping ──────────────────────────────────────────────────

    #[test]
    fn status_codes() {
        assert_eq!(ModeStatus::from_status(0), ModeStatus::NotSupported);
        assert_eq!(ModeStatus::from_status(1), ModeStatus::Enabled);
        assert_eq!(ModeStatus::from_status(2), ModeStatus::SupportedDisabled);
        assert_eq!(ModeStatus::from_status(3), ModeStatus::Enabled);
        assert_eq!(ModeStatus::from_status(4), ModeStatus::SupportedDisabled);
        assert_eq!(ModeStatus::from_status(7), ModeStatus::NotSupported);
    }

    // ── Parser ──────────────────────────────────────────────────────────

    #[test]
    fn enabled_report() {
        assert_eq!(parse(b"\x1b[?2027;1$y", 2027), Some(ModeStatus::Enabled));
    }

    #[test]
    fn disabled_report() {
        assert_eq!(
            parse(b"\x1b[?2027;2$y", 2027),
            Some(ModeStatus::SupportedDisabled)
        );
    }

    #[test]
    fn unknown_report() {
        assert_eq!(
            parse(b"\x1b[?2027;0$y", 2027),
            Some(ModeStatus::NotSupported)
        );
    }

    #[test]
    fn other_mode_is_ignored() {
        assert_eq!(parse(b"\x1b[?2026;1$y", 2027), None);
    }

    #[test]
    fn other_mode_then_ours() {
        assert_eq!(
            parse(b"\x1b[?2026;2$y\x1b[?2027;1$y", 2027),
            Some(ModeStatus::Enabled)
        );
    }

    #[test]
    fn leading_noise_is_skipped() {
        assert_eq!(
            parse(b"abc\x1b[A\x1b[?2027;2$y", 2027),
            Some(ModeStatus::SupportedDisabled)
        );
    }

    #[test]
    fn esc_mid_report_restarts() {
        assert_eq!(
            parse(b"\x1b[?20\x1b[?2027;1$y", 2027),
            Some(ModeStatus::Enabled)
        );
    }

    #[test]
    fn malformed_reports() {
        assert_eq!(parse(b"\x1b[?2027;$y", 2027), None);
        assert_eq!(parse(b"\x1b[?2027;1y", 2027), None);
        assert_eq!(parse(b"\x1b[2027;1$y", 2027), None);
        assert_eq!(parse(b"\x1b[?2027:1$y", 2027), None);
        assert_eq!(parse(b"\x1b[?99999999999;1$y", 2027), None);
    }

    #[test]
    fn parser_is_reusable() {
        let mut p = ModeReportParser::new(1049);
        let first = b"\x1b[?1049;1$y".iter().find_map(|&b| p.feed(b));
        let second = b"\x1b[?1049;4$y".iter().find_map(|&b| p.feed(b));
        assert_eq!(first, Some(ModeStatus::Enabled));
        assert_eq!(second, Some(ModeStatus::SupportedDisabled));
    }

    // ── Negotiation ─────────────────────────────────────────────────────

    #[test]
    fn query_sends_decrqm() {
        let mut term = Scripted::replying(b"\x1b[?2027;1$y");
        let status = query_grapheme_cluster_mode(&mut term, Duration::from_millis(100)).unwrap();
        assert_eq!(status, ModeStatus::Enabled);
        assert_eq!(term.sent, b"\x1b[?2027$p");
    }

    #[test]
    fn silence_is_not_supported() {
        let mut term = Scripted::replying(b"");
        let status = query_mode(&mut term, 2027, Duration::from_millis(50)).unwrap();
        assert_eq!(status, ModeStatus::NotSupported);
        assert_eq!(term.recv_calls, 1);
    }

    #[test]
    fn garbage_then_silence_is_not_supported() {
        let mut term = Scripted::replying(b"\x1b[?2027;9x");
        let status = query_mode(&mut term, 2027, Duration::from_millis(50)).unwrap();
        assert_eq!(status, ModeStatus::NotSupported);
    }

    #[test]
    fn budget_is_shared_across_bytes() {
        let mut term = Scripted::replying(b"\x1b[?2027;2$y");
        query_mode(&mut term, 2027, Duration::from_millis(80)).unwrap();
        // Each wait is what's left of the total, never more than the total.
        assert!(term.timeouts.iter().all(|&t| (0..=80).contains(&t)));
        assert!(term.timeouts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn enable_disable_are_fire_and_forget() {
        let mut term = Scripted::replying(b"");
        set_grapheme_cluster_mode(&mut term, true).unwrap();
        set_grapheme_cluster_mode(&mut term, false).unwrap();
        assert_eq!(term.sent, b"\x1b[?2027h\x1b[?2027l");
        assert_eq!(term.recv_calls, 0);
    }
}
