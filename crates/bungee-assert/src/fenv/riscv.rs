//! `fflags` and `frm` encodings.

use libc::c_int;

pub const FE_INEXACT: c_int = 0x01;
pub const FE_UNDERFLOW: c_int = 0x02;
pub const FE_OVERFLOW: c_int = 0x04;
pub const FE_DIVBYZERO: c_int = 0x08;
pub const FE_INVALID: c_int = 0x10;

pub const FE_TONEAREST: c_int = 0x0;
pub const FE_TOWARDZERO: c_int = 0x1;
pub const FE_DOWNWARD: c_int = 0x2;
pub const FE_UPWARD: c_int = 0x3;
