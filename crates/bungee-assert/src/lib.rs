//! Diagnostic traps for self-test builds.
//!
//! - [`fail`] and the `bungee_assert*!` macros report a broken contract and
//!   abort.
//! - [`FloatingPointExceptionGuard`] turns unexpected floating-point
//!   exceptions inside a scope into assertion failures.
//! - [`petrify`] freezes the process with SIGSTOP on a fatal signal so a
//!   debugger can attach.
//!
//! Cargo features pick what is live: `self-test` (level-1 assertions and
//! [`FpExceptionScope`]), `self-test-thorough` (level-2 assertions too),
//! `petrify` (freeze handler installed at load) and `external-fail` (the host
//! supplies `bungee_assert_fail`).

extern crate libc;

pub mod config;
pub mod fenv;
pub mod guard;
pub mod init;
#[cfg(unix)]
pub mod petrify;
pub mod report;
mod util;

pub use config::{Config, ConfigError, TrapPolicy};
pub use fenv::{ExceptionKind, ExceptionSet, FenvError, FpEnv, FpState};
pub use guard::{FloatingPointExceptionGuard, FpExceptionScope, InertScope};
pub use init::init;
pub use report::{fail, AbortReporter, DefaultReporter, FailureReporter, Location};

/// Highest assertion level checked in this build: 0 without `self-test`,
/// 1 with it, 2 with `self-test-thorough`.
pub const SELF_TEST_LEVEL: i32 = if cfg!(feature = "self-test-thorough") {
    2
} else if cfg!(feature = "self-test") {
    1
} else {
    0
};

/// Assert `$cond` at assertion level `$level`.
///
/// Below the build's [`SELF_TEST_LEVEL`] the condition is type-checked but
/// never evaluated.
#[macro_export]
macro_rules! bungee_assert {
    ($level:literal, $cond:expr $(,)?) => {
        if $crate::SELF_TEST_LEVEL >= $level && !$cond {
            $crate::fail($level, stringify!($cond), file!(), line!())
        }
    };
}

/// Level-1 assertion: live under `self-test`.
#[macro_export]
macro_rules! bungee_assert1 {
    ($cond:expr $(,)?) => {
        $crate::bungee_assert!(1, $cond)
    };
}

/// Level-2 assertion: live under `self-test-thorough`.
#[macro_export]
macro_rules! bungee_assert2 {
    ($cond:expr $(,)?) => {
        $crate::bungee_assert!(2, $cond)
    };
}

// The unit-test binary has no host to provide the hook.
#[cfg(all(test, feature = "external-fail"))]
#[no_mangle]
pub fn bungee_assert_fail(level: i32, message: &str, file: &str, line: u32) -> ! {
    <AbortReporter as FailureReporter>::report_failure(level, message, Location { file, line })
}
