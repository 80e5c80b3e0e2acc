// SPDX-License-Identifier: MIT
//
// Window-change signal (SIGWINCH) handling.
//
// Safety: installing a signal handler and chaining to a previous one
// requires `sigaction` and function-pointer transmutes. Each unsafe block
// is minimal and documented.
#![allow(unsafe_code)]
//
// The handler runs in signal context, where almost nothing is allowed: no
// allocation, no locks, no terminal I/O. It only sets `PENDING` and
// forwards the signal to whatever handler was installed before us. The
// platform layer's read loop (normal context) swaps the flag back and
// invokes the application's resize callback.
//
// One session per process owns the signal. A second `install` fails with
// `ResizeHandlerActive` instead of silently replacing the first session's
// handler. Dropping (or `restore`-ing) the registration puts back exactly
// the sigaction that was there before.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use crate::error::{BackendError, Result};

/// Set by the handler, cleared by [`ResizeSignal::take_pending`].
static PENDING: AtomicBool = AtomicBool::new(false);

/// Whether some session currently owns the handler.
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// The handler we replaced, as read by the signal context.
static PREV_KIND: AtomicU8 = AtomicU8::new(KIND_NONE);
static PREV_ADDR: AtomicUsize = AtomicUsize::new(0);

const KIND_NONE: u8 = 0;
const KIND_SIMPLE: u8 = 1;
const KIND_INFO: u8 = 2;

type SimpleFn = extern "C" fn(libc::c_int);
type InfoFn = extern "C" fn(libc::c_int, *mut libc::siginfo_t, *mut libc::c_void);

// ─── SignalHandler ───────────────────────────────────────────────────────────

/// The disposition a `sigaction` holds, one arm per representation.
///
/// `sa_sigaction` is a single address field whose meaning depends on
/// `SA_SIGINFO`: a one-argument handler, a three-argument handler, or the
/// `SIG_DFL`/`SIG_IGN` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalHandler {
    /// `SIG_DFL`.
    Default,
    /// `SIG_IGN`.
    Ignore,
    /// `void handler(int)`.
    Simple(SimpleFn),
    /// `void handler(int, siginfo_t *, void *)`, installed with `SA_SIGINFO`.
    Info(InfoFn),
}

impl SignalHandler {
    /// Decode the handler stored in `sa`.
    #[must_use]
    pub fn from_sigaction(sa: &libc::sigaction) -> Self {
        let addr = sa.sa_sigaction;
        if addr == libc::SIG_DFL {
            Self::Default
        } else if addr == libc::SIG_IGN {
            Self::Ignore
        } else if sa.sa_flags & libc::SA_SIGINFO != 0 {
            // SAFETY: with SA_SIGINFO set, the kernel calls this address
            // with the three-argument signature.
            Self::Info(unsafe { std::mem::transmute::<libc::sighandler_t, InfoFn>(addr) })
        } else {
            // SAFETY: without SA_SIGINFO the address is a one-argument handler.
            Self::Simple(unsafe { std::mem::transmute::<libc::sighandler_t, SimpleFn>(addr) })
        }
    }

    /// Build a `sigaction` that installs this handler with `extra_flags`.
    ///
    /// `SA_SIGINFO` is added for [`Info`](Self::Info) handlers. The mask is
    /// empty. Fields beyond handler/mask/flags (`sa_restorer` on Linux) are
    /// left zeroed for the C library to fill in.
    #[must_use]
    pub fn to_sigaction(self, extra_flags: libc::c_int) -> libc::sigaction {
        // SAFETY: sigaction is plain old data; all-zero is a valid value
        // on every unix libc.
        let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
        let (addr, flags) = match self {
            Self::Default => (libc::SIG_DFL, 0),
            Self::Ignore => (libc::SIG_IGN, 0),
            Self::Simple(f) => (f as libc::sighandler_t, 0),
            Self::Info(f) => (f as libc::sighandler_t, libc::SA_SIGINFO),
        };
        sa.sa_sigaction = addr;
        sa.sa_flags = flags | extra_flags;
        // SAFETY: sa_mask is a valid, writable sigset_t.
        unsafe {
            libc::sigemptyset(&raw mut sa.sa_mask);
        }
        sa
    }

    /// Publish this handler as the chain target for the signal context.
    fn publish_as_previous(self) {
        let (kind, addr) = match self {
            Self::Default | Self::Ignore => (KIND_NONE, 0),
            Self::Simple(f) => (KIND_SIMPLE, f as usize),
            Self::Info(f) => (KIND_INFO, f as usize),
        };
        PREV_ADDR.store(addr, Ordering::SeqCst);
        PREV_KIND.store(kind, Ordering::SeqCst);
    }
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// The installed SIGWINCH handler. Async-signal-safe: atomics and a call.
extern "C" fn on_window_change(
    sig: libc::c_int,
    info: *mut libc::siginfo_t,
    context: *mut libc::c_void,
) {
    PENDING.store(true, Ordering::SeqCst);

    let addr = PREV_ADDR.load(Ordering::SeqCst);
    match PREV_KIND.load(Ordering::SeqCst) {
        KIND_SIMPLE => {
            // SAFETY: published from a valid SimpleFn in publish_as_previous.
            let prev = unsafe { std::mem::transmute::<usize, SimpleFn>(addr) };
            prev(sig);
        }
        KIND_INFO => {
            // SAFETY: published from a valid InfoFn in publish_as_previous.
            let prev = unsafe { std::mem::transmute::<usize, InfoFn>(addr) };
            prev(sig, info, context);
        }
        _ => {}
    }
}

// ─── ResizeSignal ────────────────────────────────────────────────────────────

/// Ownership of the process-wide SIGWINCH handler.
///
/// Restores the previous disposition on drop.
#[derive(Debug)]
pub struct ResizeSignal {
    previous: Option<libc::sigaction>,
}

/// Read the current SIGWINCH disposition without changing it.
fn current_action() -> io::Result<libc::sigaction> {
    // SAFETY: zeroed sigaction is valid; a null new-action pointer only
    // queries.
    unsafe {
        let mut old: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(libc::SIGWINCH, std::ptr::null(), &raw mut old) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(old)
    }
}

impl ResizeSignal {
    /// Install the handler, chaining to whatever was there before.
    ///
    /// # Errors
    ///
    /// `BackendError::ResizeHandlerActive` if another session owns it, or
    /// the `sigaction` failure.
    pub fn install() -> Result<Self> {
        if INSTALLED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BackendError::ResizeHandlerActive.into());
        }

        match Self::swap_in() {
            Ok(previous) => {
                log::debug!(
                    "SIGWINCH handler installed (previous: {:?})",
                    SignalHandler::from_sigaction(&previous)
                );
                Ok(Self {
                    previous: Some(previous),
                })
            }
            Err(e) => {
                PREV_KIND.store(KIND_NONE, Ordering::SeqCst);
                INSTALLED.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    fn swap_in() -> io::Result<libc::sigaction> {
        // Publish the chain target before our handler can run.
        let previous = current_action()?;
        SignalHandler::from_sigaction(&previous).publish_as_previous();

        let ours = SignalHandler::Info(on_window_change).to_sigaction(libc::SA_RESTART);
        // SAFETY: `ours` is a fully initialized sigaction.
        if unsafe { libc::sigaction(libc::SIGWINCH, &raw const ours, std::ptr::null_mut()) } != 0
        {
            return Err(io::Error::last_os_error());
        }
        PENDING.store(false, Ordering::SeqCst);
        Ok(previous)
    }

    /// The disposition that will be restored.
    #[must_use]
    pub fn previous_handler(&self) -> Option<SignalHandler> {
        self.previous.as_ref().map(SignalHandler::from_sigaction)
    }

    /// Consume a pending window change, returning whether there was one.
    #[must_use]
    pub fn take_pending() -> bool {
        PENDING.swap(false, Ordering::SeqCst)
    }

    /// Put back the previous disposition. Idempotent.
    ///
    /// # Errors
    ///
    /// The `sigaction` failure; ownership is released regardless.
    pub fn restore(&mut self) -> io::Result<()> {
        let Some(previous) = self.previous.take() else {
            return Ok(());
        };

        // SAFETY: `previous` was filled in by the kernel.
        let rc = unsafe { libc::sigaction(libc::SIGWINCH, &raw const previous, std::ptr::null_mut()) };
        let result = if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        };

        PREV_KIND.store(KIND_NONE, Ordering::SeqCst);
        PENDING.store(false, Ordering::SeqCst);
        INSTALLED.store(false, Ordering::SeqCst);
        log::debug!("SIGWINCH handler restored");
        result
    }
}

impl Drop for ResizeSignal {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("failed to restore SIGWINCH handler: {e}");
        }
    }
}

/// Serializes tests that touch the process-wide signal disposition.
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

// ─── Tests ───────────────────────────────────────────────────────────────────
