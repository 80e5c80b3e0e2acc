// SPDX-License-Identifier: MIT
//
// Unix terminal device — termios raw mode, TIOCGWINSZ, poll-based reads.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, poll, and raw fd reads. These
// are the standard POSIX interfaces for terminal control; there is no safe
// alternative. Each unsafe block is minimal and documented.
#![allow(unsafe_code)]
//
// A `UnixTty` owns two descriptors: one it reads input from and one it
// writes output to. Opened from `/dev/tty` both are dups of the same
// device; opened from stdio they are dups of fds 0 and 1. Tests open them
// on pipes and pseudo-terminals.
//
// Reads are one byte at a time through `poll()` with a deadline. A signal
// interrupting `poll` or `read` (EINTR) just loops with whatever budget is
// left. While waiting, each loop iteration also dispatches a pending window
// change to the resize callback, so the callback always runs in normal
// context.
//
// Every release path (close, drop, panic) puts the original termios back.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::consts::TERMIOS;
use super::signal::ResizeSignal;
use super::{ReadOutcome, ResizeCallback, Tty, WindowSize};
use crate::error::{BackendError, Error, Result};

/// Longest single `poll()` while a resize callback is registered, so a
/// window change is dispatched promptly even when the signal lands on
/// another thread.
const RESIZE_POLL_SLICE_MS: i32 = 100;

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Saved attributes for the panic hook: `(input fd, output fd, termios)`.
///
/// The owning `UnixTty` can't be reached from a panic hook, so raw mode
/// keeps a copy here. Behind a `Mutex`, not `static mut`. Cleared as soon
/// as raw mode is turned off, before the descriptors can be reused.
static RESTORE_BACKUP: Mutex<Option<(RawFd, RawFd, libc::termios)>> = Mutex::new(None);

/// Drop the backup if it belongs to `input`. Must run before `input` is
/// closed, whether or not the attributes were restored.
fn forget_restore_backup(input: RawFd) {
    if let Ok(mut guard) = RESTORE_BACKUP.lock() {
        if guard.as_ref().is_some_and(|(fd, _, _)| *fd == input) {
            *guard = None;
        }
    }
}

/// Write `sequence` to the saved output fd and restore the saved termios.
///
/// Best-effort and lock-free with respect to Rust's stdout: a raw
/// `write(2)` on the descriptor. Used only from the panic hook.
pub fn emergency_restore(sequence: &[u8]) {
    let Ok(guard) = RESTORE_BACKUP.try_lock() else {
        return;
    };
    if let Some((input, output, ref original)) = *guard {
        // SAFETY: both fds were valid when stored and are cleared from the
        // backup before being closed.
        unsafe {
            let _ = libc::write(output, sequence.as_ptr().cast::<libc::c_void>(), sequence.len());
            let _ = libc::tcsetattr(input, libc::TCSANOW, original);
        }
    }
}

// ─── Syscall Wrappers ───────────────────────────────────────────────────────

fn is_tty(fd: RawFd) -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(fd) == 1 }
}

fn get_attributes(fd: RawFd) -> io::Result<libc::termios> {
    // SAFETY: termios is plain old data; tcgetattr fills it in.
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &raw mut termios) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(termios)
    }
}

fn set_attributes(fd: RawFd, termios: &libc::termios) -> io::Result<()> {
    // SAFETY: `termios` is a valid, initialized structure.
    if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn window_size(fd: RawFd) -> io::Result<libc::winsize> {
    // SAFETY: winsize is plain old data; TIOCGWINSZ fills it in.
    unsafe {
        let mut ws: libc::winsize = std::mem::zeroed();
        if libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ws)
    }
}

/// Wait until `fd` is readable (or hung up) for at most `timeout_ms`.
///
/// Returns `Ok(false)` on timeout. EINTR surfaces as an `Interrupted` error
/// for the caller to retry.
fn poll_readable(fd: RawFd, timeout_ms: i32) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: one valid pollfd.
    let n = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    if pfd.revents & libc::POLLNVAL != 0 {
        return Err(io::Error::from_raw_os_error(libc::EBADF));
    }
    // POLLHUP/POLLERR count as ready: the read reports EOF or the error.
    Ok(n > 0 && pfd.revents != 0)
}

/// Milliseconds until `deadline`, rounded up, clamped to `i32`.
fn remaining_ms(deadline: Instant) -> i32 {
    let left = deadline.saturating_duration_since(Instant::now());
    let ms = left.as_nanos().div_ceil(1_000_000);
    i32::try_from(ms).unwrap_or(i32::MAX)
}

/// Close an owned descriptor, reporting the error `File`'s drop would hide.
fn close_file(file: File) -> io::Result<()> {
    let fd = file.into_raw_fd();
    // SAFETY: we own `fd` and close it exactly once.
    if unsafe { libc::close(fd) } != 0 {
        let err = io::Error::last_os_error();
        // The descriptor is released even on EINTR.
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
    Ok(())
}

fn closed() -> Error {
    BackendError::Closed.into()
}

// ─── UnixTty ────────────────────────────────────────────────────────────────

/// A terminal device on a unix system.
///
/// # Example
///
/// ```no_run
/// use gridline_term::platform::{self, ReadOutcome, Tty};
///
/// let mut tty = platform::open(true)?;
/// tty.enable_raw_mode()?;
/// if let ReadOutcome::Byte(b) = tty.read(1000)? {
///     println!("got {b}");
/// }
/// tty.close()?;
/// # Ok::<(), gridline_term::Error>(())
/// ```
pub struct UnixTty {
    input: Option<File>,
    output: Option<File>,
    /// Attributes captured by `enable_raw_mode`, restored by `disable`.
    saved: Option<libc::termios>,
    /// A byte returned by `peek` and not yet consumed.
    peeked: Option<u8>,
    resize_callback: Option<ResizeCallback>,
    signal: Option<ResizeSignal>,
}

impl UnixTty {
    /// Open `/dev/tty` (when `use_dev_tty`) or fall back to stdio.
    ///
    /// # Errors
    ///
    /// `BackendError::NotATerminal` if neither is a terminal.
    pub fn open(use_dev_tty: bool) -> Result<Self> {
        if use_dev_tty {
            match OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_NOCTTY | libc::O_CLOEXEC)
                .open("/dev/tty")
            {
                Ok(file) => {
                    let output = file.try_clone()?;
                    log::debug!("opened /dev/tty");
                    return Ok(Self::from_files(file, output));
                }
                Err(e) => log::debug!("/dev/tty unavailable ({e}), trying stdio"),
            }
        }

        if !is_tty(libc::STDIN_FILENO) || !is_tty(libc::STDOUT_FILENO) {
            return Err(BackendError::NotATerminal.into());
        }
        let input = io::stdin().as_fd().try_clone_to_owned()?;
        let output = io::stdout().as_fd().try_clone_to_owned()?;
        log::debug!("using stdin/stdout as the terminal");
        Ok(Self::from_fds(input, output))
    }

    /// Wrap already-open descriptors. Nothing is checked until used.
    #[must_use]
    pub fn from_fds(input: OwnedFd, output: OwnedFd) -> Self {
        Self::from_files(File::from(input), File::from(output))
    }

    const fn from_files(input: File, output: File) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
            saved: None,
            peeked: None,
            resize_callback: None,
            signal: None,
        }
    }

    fn input_fd(&self) -> Result<RawFd> {
        self.input.as_ref().map(AsRawFd::as_raw_fd).ok_or_else(closed)
    }

    fn output_fd(&self) -> Result<RawFd> {
        self.output.as_ref().map(AsRawFd::as_raw_fd).ok_or_else(closed)
    }

    /// The input side's current termios.
    ///
    /// # Errors
    ///
    /// Fails if the input is not a terminal or the device is closed.
    pub fn attributes(&self) -> Result<libc::termios> {
        Ok(get_attributes(self.input_fd()?)?)
    }

    /// Whether the device has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.input.is_none()
    }

    /// Read one byte from the device, looping over interruptions.
    fn wait_byte(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        let fd = self.input_fd()?;
        let deadline = u64::try_from(timeout_ms)
            .ok()
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        loop {
            self.poll_resize()?;

            let mut slice = deadline.map_or(-1, remaining_ms);
            if self.resize_callback.is_some() && (slice < 0 || slice > RESIZE_POLL_SLICE_MS) {
                slice = RESIZE_POLL_SLICE_MS;
            }

            match poll_readable(fd, slice) {
                Ok(true) => {}
                Ok(false) => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Ok(ReadOutcome::Timeout);
                    }
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            let mut byte = [0u8; 1];
            let Some(input) = self.input.as_mut() else {
                return Err(closed());
            };
            match input.read(&mut byte) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(_) => return Ok(ReadOutcome::Byte(byte[0])),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) => {}
                // A pty whose other side is gone reports EIO: end of stream.
                Err(e) if e.raw_os_error() == Some(libc::EIO) => return Ok(ReadOutcome::Eof),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Tty for UnixTty {
    fn enable_raw_mode(&mut self) -> Result<()> {
        if self.saved.is_some() {
            return Ok(());
        }
        let fd = self.input_fd()?;
        let original = get_attributes(fd)?;
        set_attributes(fd, &TERMIOS.make_raw(original))?;
        self.saved = Some(original);

        if let (Ok(out), Ok(mut guard)) = (self.output_fd(), RESTORE_BACKUP.lock()) {
            *guard = Some((fd, out, original));
        }
        log::debug!("raw mode enabled on fd {fd}");
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        let Some(original) = self.saved else {
            return Ok(());
        };
        let fd = self.input_fd()?;
        set_attributes(fd, &original)?;
        self.saved = None;
        forget_restore_backup(fd);
        log::debug!("raw mode disabled on fd {fd}");
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.saved.is_some()
    }

    fn get_size(&self) -> Result<WindowSize> {
        let ws = window_size(self.output_fd()?)?;
        if ws.ws_col == 0 || ws.ws_row == 0 {
            return Err(BackendError::InvalidSize {
                cols: ws.ws_col,
                rows: ws.ws_row,
            }
            .into());
        }
        Ok(WindowSize::new(ws.ws_col, ws.ws_row))
    }

    fn read(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        if let Some(b) = self.peeked.take() {
            return Ok(ReadOutcome::Byte(b));
        }
        self.wait_byte(timeout_ms)
    }

    fn peek(&mut self, timeout_ms: i32) -> Result<ReadOutcome> {
        if let Some(b) = self.peeked {
            return Ok(ReadOutcome::Byte(b));
        }
        let outcome = self.wait_byte(timeout_ms)?;
        if let ReadOutcome::Byte(b) = outcome {
            self.peeked = Some(b);
        }
        Ok(outcome)
    }

    fn on_resize(&mut self, callback: ResizeCallback) -> Result<()> {
        if self.is_closed() {
            return Err(closed());
        }
        if self.signal.is_none() {
            self.signal = Some(ResizeSignal::install()?);
        }
        self.resize_callback = Some(callback);
        Ok(())
    }

    fn poll_resize(&mut self) -> Result<bool> {
        if self.signal.is_none() || !ResizeSignal::take_pending() {
            return Ok(false);
        }
        let size = self.get_size()?;
        log::debug!("window changed to {size}");
        if let Some(callback) = self.resize_callback.as_mut() {
            callback(size);
        }
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        let mut first: Option<Error> = None;

        if let Err(e) = self.disable_raw_mode() {
            log::warn!("close: restoring terminal attributes failed: {e}");
            first.get_or_insert(e);
        }
        if let Some(mut signal) = self.signal.take() {
            if let Err(e) = signal.restore() {
                log::warn!("close: restoring SIGWINCH handler failed: {e}");
                first.get_or_insert(e.into());
            }
        }
        self.resize_callback = None;
        self.peeked = None;

        if let Ok(fd) = self.input_fd() {
            forget_restore_backup(fd);
        }
        for file in [self.input.take(), self.output.take()].into_iter().flatten() {
            if let Err(e) = close_file(file) {
                log::warn!("close: releasing descriptor failed: {e}");
                first.get_or_insert(e.into());
            }
        }

        first.map_or(Ok(()), Err)
    }
}

impl Write for UnixTty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.output.as_mut() {
            Some(out) => out.write(buf),
            None => Err(io::Error::other(BackendError::Closed)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.output.as_mut() {
            Some(out) => out.flush(),
            None => Err(io::Error::other(BackendError::Closed)),
        }
    }
}

impl Drop for UnixTty {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("terminal release on drop failed: {e}");
        }
    }
}

impl std::fmt::Debug for UnixTty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixTty")
            .field("input", &self.input.as_ref().map(AsRawFd::as_raw_fd))
            .field("output", &self.output.as_ref().map(AsRawFd::as_raw_fd))
            .field("raw", &self.saved.is_some())
            .field("resize_handler", &self.resize_callback.is_some())
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
