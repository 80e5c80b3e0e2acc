// SPDX-License-Identifier: MIT
//
// Shared helpers for integration tests: a pseudo-terminal pair and a
// reader for whatever the code under test wrote to it.
#![allow(unsafe_code, dead_code)]

use std::ffi::CStr;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use gridline_term::platform::unix::UnixTty;

/// `ptsname` uses a static buffer.
static PTY_LOCK: Mutex<()> = Mutex::new(());

/// A pseudo-terminal pair. The code under test gets the slave side; the
/// test plays the terminal emulator on the master side.
pub struct Pty {
    pub master: File,
    pub slave: OwnedFd,
}

impl Pty {
    pub fn open(cols: u16, rows: u16) -> Self {
        let _guard = PTY_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let pty = unsafe {
            let m = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(m >= 0, "posix_openpt: {}", io::Error::last_os_error());
            let master = File::from_raw_fd(m);
            assert_eq!(libc::grantpt(m), 0);
            assert_eq!(libc::unlockpt(m), 0);
            let name = libc::ptsname(m);
            assert!(!name.is_null());
            let path = CStr::from_ptr(name).to_owned();
            let s = libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NOCTTY);
            assert!(s >= 0, "open slave: {}", io::Error::last_os_error());
            Self {
                master,
                slave: OwnedFd::from_raw_fd(s),
            }
        };
        pty.set_size(cols, rows);
        pty
    }

    pub fn set_size(&self, cols: u16, rows: u16) {
        let ws = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let rc = unsafe { libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ, &raw const ws) };
        assert_eq!(rc, 0, "TIOCSWINSZ: {}", io::Error::last_os_error());
    }

    /// A device reading and writing the slave side.
    pub fn tty(&self) -> UnixTty {
        UnixTty::from_fds(
            self.slave.try_clone().unwrap(),
            self.slave.try_clone().unwrap(),
        )
    }

    /// The slave side's current termios.
    pub fn slave_attributes(&self) -> libc::termios {
        unsafe {
            let mut t: libc::termios = std::mem::zeroed();
            assert_eq!(libc::tcgetattr(self.slave.as_raw_fd(), &raw mut t), 0);
            t
        }
    }

    /// Everything the slave side wrote within `timeout`, stopping early
    /// after a quiet 50 ms once something has arrived.
    pub fn drain(&mut self, timeout: Duration) -> Vec<u8> {
        read_available(&mut self.master, timeout)
    }
}

/// Read from `file` until `timeout` passes, or until it goes quiet after
/// producing output.
pub fn read_available(file: &mut File, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];

    while Instant::now() < deadline {
        let wait = if out.is_empty() { 100 } else { 50 };
        if !readable(file.as_raw_fd(), wait) {
            if out.is_empty() {
                continue;
            }
            break;
        }
        match file.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
        }
    }
    out
}

fn readable(fd: i32, timeout_ms: i32) -> bool {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) > 0 }
}

pub fn same_attributes(a: &libc::termios, b: &libc::termios) -> bool {
    a.c_iflag == b.c_iflag
        && a.c_oflag == b.c_oflag
        && a.c_cflag == b.c_cflag
        && a.c_lflag == b.c_lflag
        && a.c_cc == b.c_cc
}
