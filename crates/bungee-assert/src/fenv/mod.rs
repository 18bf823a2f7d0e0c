//! Thin, typed layer over the hardware floating-point environment.
//!
//! Everything here acts on the calling thread's FPU state only. Failures are
//! reported as [`FenvError`]; deciding whether a failure is fatal is left to
//! the caller (the guard treats all of them as assertion failures).

mod ffi;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use x86 as arch;

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
mod arm;
#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
use arm as arch;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
mod riscv;
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
use riscv as arch;

#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "arm",
    target_arch = "aarch64",
    target_arch = "riscv32",
    target_arch = "riscv64"
)))]
compile_error!("bungee-assert: no <fenv.h> exception encoding for this target architecture");

use core::fmt;
use core::ops::{BitAnd, BitOr, Not};
use libc::c_int;
use static_assertions::const_assert;

const FE_ALL_EXCEPT: c_int =
    arch::FE_INEXACT | arch::FE_UNDERFLOW | arch::FE_OVERFLOW | arch::FE_DIVBYZERO | arch::FE_INVALID;

const_assert!(FE_ALL_EXCEPT.count_ones() == 5);

/// Whether this build can ask the hardware to trap on individual exceptions.
///
/// Even when true, the FPU itself may refuse (most AArch64 cores do); see
/// [`set_traps`].
pub const TRAPS_AVAILABLE: bool = cfg!(all(target_os = "linux", target_env = "gnu"));

/// One of the five IEEE 754 exception kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Inexact,
    Underflow,
    Overflow,
    DivideByZero,
    Invalid,
}

impl ExceptionKind {
    /// All kinds, in the order the guard checks them.
    pub const ALL: [ExceptionKind; 5] = [
        ExceptionKind::Inexact,
        ExceptionKind::Underflow,
        ExceptionKind::Overflow,
        ExceptionKind::DivideByZero,
        ExceptionKind::Invalid,
    ];

    const fn bit(self) -> u8 {
        match self {
            ExceptionKind::Inexact => 1 << 0,
            ExceptionKind::Underflow => 1 << 1,
            ExceptionKind::Overflow => 1 << 2,
            ExceptionKind::DivideByZero => 1 << 3,
            ExceptionKind::Invalid => 1 << 4,
        }
    }

    const fn raw(self) -> c_int {
        match self {
            ExceptionKind::Inexact => arch::FE_INEXACT,
            ExceptionKind::Underflow => arch::FE_UNDERFLOW,
            ExceptionKind::Overflow => arch::FE_OVERFLOW,
            ExceptionKind::DivideByZero => arch::FE_DIVBYZERO,
            ExceptionKind::Invalid => arch::FE_INVALID,
        }
    }
}

/// A set of exception kinds, e.g. the kinds a guarded scope may raise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExceptionSet(u8);

impl ExceptionSet {
    pub const EMPTY: ExceptionSet = ExceptionSet(0);
    pub const INEXACT: ExceptionSet = ExceptionSet(ExceptionKind::Inexact.bit());
    pub const UNDERFLOW: ExceptionSet = ExceptionSet(ExceptionKind::Underflow.bit());
    pub const OVERFLOW: ExceptionSet = ExceptionSet(ExceptionKind::Overflow.bit());
    pub const DIVIDE_BY_ZERO: ExceptionSet = ExceptionSet(ExceptionKind::DivideByZero.bit());
    pub const INVALID: ExceptionSet = ExceptionSet(ExceptionKind::Invalid.bit());
    pub const ALL: ExceptionSet = ExceptionSet(0x1f);

    pub const fn contains(self, kind: ExceptionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: ExceptionSet) -> ExceptionSet {
        ExceptionSet(self.0 | other.0)
    }

    /// Kinds not in `self`.
    pub const fn complement(self) -> ExceptionSet {
        ExceptionSet(!self.0 & Self::ALL.0)
    }

    pub fn iter(self) -> impl Iterator<Item = ExceptionKind> {
        ExceptionKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    fn to_raw(self) -> c_int {
        self.iter().fold(0, |acc, k| acc | k.raw())
    }

    fn from_raw(raw: c_int) -> ExceptionSet {
        ExceptionKind::ALL
            .into_iter()
            .filter(|k| raw & k.raw() != 0)
            .fold(ExceptionSet::EMPTY, |acc, k| acc | k)
    }
}

impl From<ExceptionKind> for ExceptionSet {
    fn from(kind: ExceptionKind) -> Self {
        ExceptionSet(kind.bit())
    }
}

impl<T: Into<ExceptionSet>> BitOr<T> for ExceptionSet {
    type Output = ExceptionSet;

    fn bitor(self, rhs: T) -> ExceptionSet {
        self.union(rhs.into())
    }
}

impl BitAnd for ExceptionSet {
    type Output = ExceptionSet;

    fn bitand(self, rhs: ExceptionSet) -> ExceptionSet {
        ExceptionSet(self.0 & rhs.0)
    }
}

impl Not for ExceptionSet {
    type Output = ExceptionSet;

    fn not(self) -> ExceptionSet {
        self.complement()
    }
}

impl fmt::Debug for ExceptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Errors from the C library's `<fenv.h>` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FenvError {
    #[error("fegetenv failed")]
    Capture,
    #[error("fesetenv failed")]
    Restore,
    #[error("feclearexcept({0:?}) failed")]
    Clear(ExceptionSet),
    #[error("feraiseexcept({0:?}) failed")]
    Raise(ExceptionSet),
    #[error("fesetround({0:?}) failed")]
    Rounding(Rounding),
    #[error("trap-on-occurrence not supported for {0:?}")]
    TrapsUnsupported(ExceptionSet),
}

/// A saved floating-point environment: control modes, trap masks and
/// status flags.
#[derive(Clone, Copy)]
pub struct FpEnv(ffi::RawFenv);

impl FpEnv {
    /// Snapshot the calling thread's environment.
    pub fn capture() -> Result<FpEnv, FenvError> {
        let mut raw = ffi::RawFenv::zeroed();
        // SAFETY: `raw` is at least as large and as aligned as any `fenv_t`.
        if unsafe { ffi::fegetenv(&mut raw) } != 0 {
            return Err(FenvError::Capture);
        }
        Ok(FpEnv(raw))
    }

    /// Install this environment on the calling thread, replacing flags,
    /// traps and rounding mode wholesale.
    pub fn restore(&self) -> Result<(), FenvError> {
        // SAFETY: the buffer was filled by `fegetenv`.
        if unsafe { ffi::fesetenv(&self.0) } != 0 {
            return Err(FenvError::Restore);
        }
        Ok(())
    }
}

impl fmt::Debug for FpEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FpEnv(..)")
    }
}

/// Clear the pending flags in `set`.
pub fn clear(set: ExceptionSet) -> Result<(), FenvError> {
    if unsafe { ffi::feclearexcept(set.to_raw()) } != 0 {
        return Err(FenvError::Clear(set));
    }
    Ok(())
}

/// Raise the exceptions in `set` as if an operation had produced them.
/// Delivers SIGFPE for any of them that currently trap.
pub fn raise(set: ExceptionSet) -> Result<(), FenvError> {
    if unsafe { ffi::feraiseexcept(set.to_raw()) } != 0 {
        return Err(FenvError::Raise(set));
    }
    Ok(())
}

/// Which of the kinds in `set` currently have their pending flag set.
pub fn raised(set: ExceptionSet) -> ExceptionSet {
    ExceptionSet::from_raw(unsafe { ffi::fetestexcept(set.to_raw()) })
}

/// Kinds that currently trap, or `None` where the platform cannot tell.
pub fn enabled_traps() -> Option<ExceptionSet> {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        let raw = unsafe { ffi::fegetexcept() };
        if raw < 0 {
            return None;
        }
        Some(ExceptionSet::from_raw(raw))
    }
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    {
        None
    }
}

/// Make exactly the kinds in `set` trap on occurrence.
///
/// All traps are disabled first, so an empty `set` always succeeds. A
/// non-empty `set` fails with [`FenvError::TrapsUnsupported`] where the C
/// library or the FPU cannot trap.
pub fn set_traps(set: ExceptionSet) -> Result<(), FenvError> {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        unsafe {
            ffi::fedisableexcept(FE_ALL_EXCEPT);
        }
        if set.is_empty() {
            return Ok(());
        }
        if unsafe { ffi::feenableexcept(set.to_raw()) } == -1 {
            return Err(FenvError::TrapsUnsupported(set));
        }
        // Some FPUs accept the request but silently ignore the trap bits.
        match enabled_traps() {
            Some(enabled) if enabled == set => Ok(()),
            _ => {
                unsafe {
                    ffi::fedisableexcept(FE_ALL_EXCEPT);
                }
                Err(FenvError::TrapsUnsupported(set))
            }
        }
    }
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    {
        if set.is_empty() {
            Ok(())
        } else {
            Err(FenvError::TrapsUnsupported(set))
        }
    }
}

/// A rounding direction, as the C library encodes it for this target.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rounding(c_int);

impl Rounding {
    pub const TO_NEAREST: Rounding = Rounding(arch::FE_TONEAREST);
    pub const UPWARD: Rounding = Rounding(arch::FE_UPWARD);
    pub const DOWNWARD: Rounding = Rounding(arch::FE_DOWNWARD);
    pub const TOWARD_ZERO: Rounding = Rounding(arch::FE_TOWARDZERO);
}

impl fmt::Debug for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Rounding::TO_NEAREST => f.write_str("ToNearest"),
            Rounding::UPWARD => f.write_str("Upward"),
            Rounding::DOWNWARD => f.write_str("Downward"),
            Rounding::TOWARD_ZERO => f.write_str("TowardZero"),
            Rounding(raw) => write!(f, "Rounding({raw:#x})"),
        }
    }
}

pub fn rounding() -> Rounding {
    Rounding(unsafe { ffi::fegetround() })
}

pub fn set_rounding(mode: Rounding) -> Result<(), FenvError> {
    if unsafe { ffi::fesetround(mode.0) } != 0 {
        return Err(FenvError::Rounding(mode));
    }
    Ok(())
}

/// The observable parts of the environment, comparable across snapshots.
///
/// [`FpEnv`] itself is opaque and may carry bookkeeping (x87 last-instruction
/// pointers, for one) that legitimately changes between two captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpState {
    pub raised: ExceptionSet,
    pub traps: Option<ExceptionSet>,
    pub rounding: Rounding,
}

impl FpState {
    pub fn observe() -> FpState {
        FpState {
            raised: raised(ExceptionSet::ALL),
            traps: enabled_traps(),
            rounding: rounding(),
        }
    }
}
