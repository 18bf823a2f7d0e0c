//! Crash-freeze ("petrify") handler.
//!
//! Instead of letting SIGSEGV, SIGABRT, SIGILL or SIGFPE kill the process,
//! the handler prints the PID and stops the process with SIGSTOP. The frozen
//! process keeps its memory and registers, so a debugger can attach:
//!
//! ```text
//! Bungee petrified PID=     12345
//! $ gdb -p 12345
//! ```
//!
//! The handler runs under signal-handler rules: no allocation, no locks, no
//! buffered I/O. The PID is rendered digit by digit into a fixed buffer.
//!
//! Resuming a frozen process with SIGCONT returns from the handler; for a
//! genuine fault the faulting instruction runs again and the process freezes
//! again.

use crate::util;
use core::sync::atomic::{AtomicBool, Ordering};
use libc::c_int;

const PREFIX: &[u8] = b"Bungee petrified PID=";

/// Columns reserved for the PID; enough for any positive `pid_t`.
pub const PID_WIDTH: usize = 10;

/// Length of the freeze line, newline included.
pub const MESSAGE_LEN: usize = PREFIX.len() + PID_WIDTH + 1;

/// Signals that freeze the process once the handler is installed.
pub const FATAL_SIGNALS: [c_int; 4] = [libc::SIGSEGV, libc::SIGABRT, libc::SIGILL, libc::SIGFPE];

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Build `Bungee petrified PID=<pid>\n` with the digits right-aligned in a
/// [`PID_WIDTH`]-column field.
///
/// Async-signal-safe.
pub fn render_message(pid: libc::pid_t) -> [u8; MESSAGE_LEN] {
    let mut message = [b' '; MESSAGE_LEN];
    let mut i = 0;
    while i < PREFIX.len() {
        message[i] = PREFIX[i];
        i += 1;
    }
    message[MESSAGE_LEN - 1] = b'\n';

    let mut n = if pid > 0 { pid as u32 } else { 0 };
    let mut p = MESSAGE_LEN - 1;
    loop {
        p -= 1;
        message[p] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    message
}

extern "C" fn petrify(_sig: c_int, _info: *mut libc::siginfo_t, _context: *mut libc::c_void) {
    let _errno = util::SavedErrno::save();
    let message = render_message(unsafe { libc::getpid() });
    util::write_all_raw(util::STDERR, &message);
    unsafe {
        libc::raise(libc::SIGSTOP);
    }
}

/// Point each of `signals` at the freeze handler. Tries them all; `false`
/// if any registration was refused.
fn register(signals: &[c_int]) -> bool {
    let mut ok = true;
    unsafe {
        let mut sa: libc::sigaction = core::mem::zeroed();
        sa.sa_sigaction = petrify as usize;
        sa.sa_flags = libc::SA_SIGINFO;
        libc::sigemptyset(&mut sa.sa_mask);
        for &sig in signals {
            if libc::sigaction(sig, &sa, core::ptr::null_mut()) != 0 {
                ok = false;
            }
        }
    }
    ok
}

/// Install the freeze handler for [`FATAL_SIGNALS`].
///
/// Returns `false` if it was already installed, or if the kernel refused a
/// registration; the latter is noted on fd 2 and leaves [`is_installed`]
/// false. There is no uninstall.
pub fn install() -> bool {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }

    if !register(&FATAL_SIGNALS) {
        INSTALLED.store(false, Ordering::SeqCst);
        util::write_all_raw(
            util::STDERR,
            b"bungee-assert: sigaction failed; crash-freeze handler not installed\n",
        );
        return false;
    }

    log::debug!("crash-freeze handler installed for SIGSEGV, SIGABRT, SIGILL and SIGFPE");
    true
}

pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}
