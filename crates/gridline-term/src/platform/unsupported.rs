// SPDX-License-Identifier: MIT
//
// Stand-in for platforms without a terminal layer.
//
// `UnsupportedTty` has no values: `open` always fails with
// `BackendError::Unsupported`, so the `Tty` methods can never be called.
// The rest of the crate (buffers, diffing, encoding, the test backend)
// still works everywhere.

use std::io;

use super::{ReadOutcome, ResizeCallback, Tty, WindowSize};
use crate::error::{BackendError, Result};

/// A terminal that cannot exist on this platform.
#[derive(Debug)]
pub enum UnsupportedTty {}

impl UnsupportedTty {
    /// Always fails.
    ///
    /// # Errors
    ///
    /// `BackendError::Unsupported` naming the running OS.
    pub fn open(_use_dev_tty: bool) -> Result<Self> {
        Err(BackendError::Unsupported {
            platform: std::env::consts::OS,
        }
        .into())
    }
}

/// Emergency restore has nothing to restore here.
pub const fn emergency_restore(_sequence: &[u8]) {}

impl Tty for UnsupportedTty {
    fn enable_raw_mode(&mut self) -> Result<()> {
        match *self {}
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        match *self {}
    }

    fn is_raw(&self) -> bool {
        match *self {}
    }

    fn get_size(&self) -> Result<WindowSize> {
        match *self {}
    }

    fn read(&mut self, _timeout_ms: i32) -> Result<ReadOutcome> {
        match *self {}
    }

    fn peek(&mut self, _timeout_ms: i32) -> Result<ReadOutcome> {
        match *self {}
    }

    fn on_resize(&mut self, _callback: ResizeCallback) -> Result<()> {
        match *self {}
    }

    fn poll_resize(&mut self) -> Result<bool> {
        match *self {}
    }

    fn close(&mut self) -> Result<()> {
        match *self {}
    }
}

impl io::Write for UnsupportedTty {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        match *self {}
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {}
    }
}
