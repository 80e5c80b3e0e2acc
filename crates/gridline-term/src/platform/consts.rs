// SPDX-License-Identifier: MIT
//
// Per-OS terminal constants, resolved once.
//
// termios differs between OS families in two ways that matter here:
//
//   - Flag bit values and control-character slot indices. `ECHO` is 0o10
//     on Linux and 0x8 on the BSDs; `VMIN` is slot 6 on Linux and 16 on
//     macOS.
//
//   - Field widths. `tcflag_t` is a 32-bit integer on Linux and an
//     `unsigned long` (64-bit) on macOS and the BSDs, which changes the
//     struct's byte layout.
//
// Rather than branch on the platform at each call site, everything the raw
// mode computation needs is collected into one `TermiosConsts` value built
// at compile time from libc's per-target definitions. `TERMIOS` is that
// value for the running target; the raw-mode code reads only from it.

#[cfg(unix)]
use std::mem::{offset_of, size_of};

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Width class of the termios flag fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagWidth {
    /// 32-bit `tcflag_t` (Linux, illumos).
    Narrow,
    /// 64-bit `tcflag_t` (macOS, the BSDs).
    Wide,
}

/// Byte layout of `struct termios` on this target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermiosLayout {
    pub flag_width: FlagWidth,
    /// `sizeof(struct termios)`.
    pub size: usize,
    /// Byte offsets of `c_iflag`, `c_oflag`, `c_cflag`, `c_lflag`.
    pub flag_offsets: [usize; 4],
    /// Byte offset of `c_cc`.
    pub cc_offset: usize,
    /// Number of control-character slots (`NCCS`).
    pub nccs: usize,
}

// ─── Constant Table ──────────────────────────────────────────────────────────

/// Flag bits and control-character indices used by raw mode.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermiosConsts {
    pub layout: TermiosLayout,

    /// Input flags cleared by raw mode.
    pub iflag_clear: libc::tcflag_t,
    /// Output flags cleared by raw mode.
    pub oflag_clear: libc::tcflag_t,
    /// Local flags cleared: line buffering, echo, signals, extended input.
    pub lflag_clear: libc::tcflag_t,
    /// Control flags cleared before the character size is set.
    pub cflag_clear: libc::tcflag_t,
    /// Control flags set: 8-bit characters.
    pub cflag_set: libc::tcflag_t,

    /// Index of the minimum-read-count slot.
    pub vmin: usize,
    /// Index of the inter-byte-timeout slot.
    pub vtime: usize,
}

#[cfg(unix)]
impl TermiosConsts {
    /// The table for the compilation target.
    #[must_use]
    pub const fn for_target() -> Self {
        let flag_width = if size_of::<libc::tcflag_t>() == 4 {
            FlagWidth::Narrow
        } else {
            FlagWidth::Wide
        };

        Self {
            layout: TermiosLayout {
                flag_width,
                size: size_of::<libc::termios>(),
                flag_offsets: [
                    offset_of!(libc::termios, c_iflag),
                    offset_of!(libc::termios, c_oflag),
                    offset_of!(libc::termios, c_cflag),
                    offset_of!(libc::termios, c_lflag),
                ],
                cc_offset: offset_of!(libc::termios, c_cc),
                nccs: libc::NCCS,
            },
            iflag_clear: libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON,
            oflag_clear: libc::OPOST,
            lflag_clear: libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN,
            cflag_clear: libc::CSIZE | libc::PARENB,
            cflag_set: libc::CS8,
            vmin: libc::VMIN,
            vtime: libc::VTIME,
        }
    }

    /// Apply raw mode to a copy of `original`.
    ///
    /// Minimum read count 1, no inter-byte timeout: a read blocks until at
    /// least one byte is available. Timeouts are handled by `poll`.
    #[must_use]
    pub const fn make_raw(&self, original: libc::termios) -> libc::termios {
        let mut raw = original;
        raw.c_iflag &= !self.iflag_clear;
        raw.c_oflag &= !self.oflag_clear;
        raw.c_lflag &= !self.lflag_clear;
        raw.c_cflag &= !self.cflag_clear;
        raw.c_cflag |= self.cflag_set;
        raw.c_cc[self.vmin] = 1;
        raw.c_cc[self.vtime] = 0;
        raw
    }
}

/// The constant table for this target.
#[cfg(unix)]
pub static TERMIOS: TermiosConsts = TermiosConsts::for_target();

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn flag_width_matches_tcflag() {
        let expected = match size_of::<libc::tcflag_t>() {
            4 => FlagWidth::Narrow,
            _ => FlagWidth::Wide,
        };
        assert_eq!(TERMIOS.layout.flag_width, expected);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_is_narrow() {
        assert_eq!(TERMIOS.layout.flag_width, FlagWidth::Narrow);
        assert_eq!(TERMIOS.layout.flag_offsets, [0, 4, 8, 12]);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn macos_is_wide() {
        assert_eq!(TERMIOS.layout.flag_width, FlagWidth::Wide);
        assert_eq!(TERMIOS.layout.flag_offsets, [0, 8, 16, 24]);
    }

    #[test]
    fn control_slots_fit() {
        assert!(TERMIOS.vmin < TERMIOS.layout.nccs);
        assert!(TERMIOS.vtime < TERMIOS.layout.nccs);
        assert!(TERMIOS.layout.cc_offset < TERMIOS.layout.size);
    }

    #[test]
    fn make_raw_clears_line_discipline() {
        // SAFETY: termios is plain old data; all-zero is a valid value.
        let mut cooked: libc::termios = unsafe { std::mem::zeroed() };
        cooked.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN | libc::NOFLSH;
        cooked.c_iflag = libc::ICRNL | libc::IXON | libc::IMAXBEL;
        cooked.c_oflag = libc::OPOST;
        cooked.c_cflag = libc::CS7 | libc::PARENB | libc::CREAD;

        let raw = TERMIOS.make_raw(cooked);

        assert_eq!(raw.c_lflag & TERMIOS.lflag_clear, 0);
        assert_eq!(raw.c_lflag & libc::NOFLSH, libc::NOFLSH);
        assert_eq!(raw.c_iflag, libc::IMAXBEL);
        assert_eq!(raw.c_oflag & libc::OPOST, 0);
        assert_eq!(raw.c_cflag & libc::CSIZE, libc::CS8);
        assert_eq!(raw.c_cflag & libc::PARENB, 0);
        assert_eq!(raw.c_cflag & libc::CREAD, libc::CREAD);
        assert_eq!(raw.c_cc[libc::VMIN], 1);
        assert_eq!(raw.c_cc[libc::VTIME], 0);
    }
}
