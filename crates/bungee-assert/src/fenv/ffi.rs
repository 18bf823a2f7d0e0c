//! C99 `<fenv.h>` bindings. The `libc` crate does not expose these.

use libc::c_int;

/// Storage for a `fenv_t`.
///
/// The real layout is private to the C library and differs per target, so we
/// over-allocate: 32 bytes on x86_64 glibc/musl/Darwin, 8 or 16 on ARM.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct RawFenv {
    _buf: [u8; FENV_BYTES],
}

pub const FENV_BYTES: usize = 64;

static_assertions::const_assert!(FENV_BYTES >= 32);

impl RawFenv {
    pub const fn zeroed() -> Self {
        Self {
            _buf: [0u8; FENV_BYTES],
        }
    }
}

#[cfg_attr(target_os = "linux", link(name = "m"))]
extern "C" {
    pub fn fegetenv(envp: *mut RawFenv) -> c_int;
    pub fn fesetenv(envp: *const RawFenv) -> c_int;
    pub fn feclearexcept(excepts: c_int) -> c_int;
    pub fn feraiseexcept(excepts: c_int) -> c_int;
    pub fn fetestexcept(excepts: c_int) -> c_int;
    pub fn fegetround() -> c_int;
    pub fn fesetround(round: c_int) -> c_int;
}

// GNU extensions: per-exception trap control.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[link(name = "m")]
extern "C" {
    pub fn feenableexcept(excepts: c_int) -> c_int;
    pub fn fedisableexcept(excepts: c_int) -> c_int;
    pub fn fegetexcept() -> c_int;
}
