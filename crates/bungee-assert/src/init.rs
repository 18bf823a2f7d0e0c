//! Process lifecycle.
//!
//! Process-wide state is set up once, before application code that might
//! fault, and never torn down. A load-time constructor installs signal
//! dispositions only; it leaves [`is_initialized`] false. [`init`] is the
//! explicit entry point and also loads configuration, so hosts call it first
//! thing in `main`, once their logger is up.

use crate::config;
use core::sync::atomic::{AtomicU8, Ordering};

const UNINIT: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

static INIT_STATE: AtomicU8 = AtomicU8::new(UNINIT);

/// Library constructor -- called before main(). Does not run [`init`].
#[used]
#[cfg_attr(any(target_os = "linux", target_os = "android"), link_section = ".init_array")]
#[cfg_attr(target_os = "macos", link_section = "__DATA,__mod_init_func")]
static CTOR: extern "C" fn() = {
    extern "C" fn on_load() {
        install_process_handlers();
    }
    on_load
};

/// Bring up process-wide state: signal handlers for the build's
/// configuration, then the environment-driven [`config`].
///
/// Idempotent and safe to race: late callers wait for the first to finish.
pub fn init() {
    match INIT_STATE.compare_exchange(UNINIT, INITIALIZING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {}
        Err(INITIALIZING) => {
            while INIT_STATE.load(Ordering::Acquire) == INITIALIZING {
                core::hint::spin_loop();
            }
            return;
        }
        Err(_) => return,
    }

    install_process_handlers();
    let config = config::get();
    log::debug!("bungee-assert ready: {:?}", config);

    INIT_STATE.store(READY, Ordering::Release);
}

pub fn is_initialized() -> bool {
    INIT_STATE.load(Ordering::Acquire) == READY
}

/// Signal dispositions only. Runs before `main`, so it must not depend on
/// anything the host sets up later (logger, environment tweaks).
fn install_process_handlers() {
    #[cfg(all(unix, feature = "petrify"))]
    crate::petrify::install();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        assert!(is_initialized());
        init();
        assert!(is_initialized());
        #[cfg(all(unix, feature = "petrify"))]
        assert!(crate::petrify::is_installed());
    }
}
