//! Scoped floating-point exception guard.
//!
//! A [`FloatingPointExceptionGuard`] makes floating-point exceptions that must
//! never happen inside a region fatal, while tolerating an allow-list such as
//! "inexact is fine". On construction it snapshots the thread's environment,
//! clears stale flags for the disallowed kinds and, where the platform can,
//! arms trap-on-occurrence for them. On drop it checks the flags and puts the
//! snapshot back.
//!
//! ```rust,ignore
//! use bungee_assert::{ExceptionSet, FloatingPointExceptionGuard};
//!
//! let _guard = FloatingPointExceptionGuard::new(ExceptionSet::INEXACT);
//! let ratio = numerator / denominator; // divide-by-zero here is fatal
//! ```
//!
//! Guards on one thread must be dropped in reverse order of construction.
//! They are neither `Send` nor `Sync`: the environment belongs to the thread.

use crate::config::{self, TrapPolicy};
use crate::fenv::{self, ExceptionKind, ExceptionSet, FpEnv};
use crate::report::{DefaultReporter, FailureReporter, Location};
use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

/// Fail through `$reporter` unless `$cond` holds.
macro_rules! require {
    ($reporter:ty, $cond:expr) => {
        if !$cond {
            <$reporter as FailureReporter>::report_failure(
                1,
                stringify!($cond),
                Location {
                    file: file!(),
                    line: line!(),
                },
            )
        }
    };
}

/// Unwrap a `fenv` result, failing through `$reporter` on `Err`.
macro_rules! require_ok {
    ($reporter:ty, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(_) => <$reporter as FailureReporter>::report_failure(
                1,
                concat!(stringify!($result), ".is_ok()"),
                Location {
                    file: file!(),
                    line: line!(),
                },
            ),
        }
    };
}

thread_local! {
    /// Number of live guards on this thread.
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

static FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

#[must_use = "the scope is only guarded while the guard is alive"]
pub struct FloatingPointExceptionGuard<R: FailureReporter = DefaultReporter> {
    allowed: ExceptionSet,
    saved: FpEnv,
    depth: usize,
    trapping: bool,
    // Pins the guard to its thread and carries the reporter type.
    _marker: PhantomData<(*const (), fn() -> R)>,
}

impl FloatingPointExceptionGuard<DefaultReporter> {
    /// Guard the current scope, permitting only the kinds in `allowed`.
    ///
    /// Trap behaviour follows the process configuration (`BUNGEE_FP_TRAPS`).
    pub fn new(allowed: ExceptionSet) -> Self {
        Self::with_policy(allowed, config::trap_policy())
    }
}

impl<R: FailureReporter> FloatingPointExceptionGuard<R> {
    pub fn with_policy(allowed: ExceptionSet, policy: TrapPolicy) -> Self {
        let disallowed = allowed.complement();

        let saved = require_ok!(R, FpEnv::capture());
        require_ok!(R, fenv::clear(disallowed));

        let trapping = match policy {
            TrapPolicy::FlagsOnly => {
                disarm_traps();
                false
            }
            TrapPolicy::Auto => match fenv::set_traps(disallowed) {
                Ok(()) => !disallowed.is_empty(),
                Err(_) => {
                    if !FALLBACK_WARNED.swap(true, Ordering::Relaxed) {
                        log::warn!(
                            "floating-point trap-on-occurrence not available; \
                             relying on flag checks at scope exit."
                        );
                    }
                    disarm_traps();
                    false
                }
            },
            TrapPolicy::Require => {
                require_ok!(R, fenv::set_traps(disallowed));
                !disallowed.is_empty()
            }
        };

        let depth = DEPTH.with(|d| {
            let depth = d.get() + 1;
            d.set(depth);
            depth
        });

        Self {
            allowed,
            saved,
            depth,
            trapping,
            _marker: PhantomData,
        }
    }

    /// Kinds this guard tolerates.
    pub fn allowed(&self) -> ExceptionSet {
        self.allowed
    }

    /// Whether disallowed kinds trap immediately rather than only at
    /// [`check`](Self::check).
    pub fn is_trapping(&self) -> bool {
        self.trapping
    }

    /// Fail if any disallowed kind has been raised since construction.
    ///
    /// Each kind is asserted separately so the report names the culprit.
    pub fn check(&self) {
        let pending = fenv::raised(self.allowed.complement());
        require!(R, !pending.contains(ExceptionKind::Inexact));
        require!(R, !pending.contains(ExceptionKind::Underflow));
        require!(R, !pending.contains(ExceptionKind::Overflow));
        require!(R, !pending.contains(ExceptionKind::DivideByZero));
        require!(R, !pending.contains(ExceptionKind::Invalid));
    }
}

impl<R: FailureReporter> Drop for FloatingPointExceptionGuard<R> {
    fn drop(&mut self) {
        let innermost = DEPTH.with(Cell::get);
        require!(R, innermost == self.depth);
        DEPTH.with(|d| d.set(self.depth - 1));

        // Check before restoring: the restore wipes the evidence.
        self.check();
        require_ok!(R, self.saved.restore());
    }
}

fn disarm_traps() {
    // An empty trap set cannot be refused.
    let _ = fenv::set_traps(ExceptionSet::EMPTY);
}

/// Stand-in for the guard when `self-test` is off. Zero-sized; does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertScope;

impl InertScope {
    #[inline(always)]
    pub fn new(_allowed: ExceptionSet) -> Self {
        InertScope
    }

    #[inline(always)]
    pub fn check(&self) {}
}

/// The guard self-test builds use: real under `self-test`, inert otherwise.
#[cfg(feature = "self-test")]
pub type FpExceptionScope = FloatingPointExceptionGuard;
#[cfg(not(feature = "self-test"))]
pub type FpExceptionScope = InertScope;
