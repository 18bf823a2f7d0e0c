//! FPSR cumulative flags and FPCR rounding field (AArch32 VFP and AArch64).

use libc::c_int;

pub const FE_INVALID: c_int = 0x01;
pub const FE_DIVBYZERO: c_int = 0x02;
pub const FE_OVERFLOW: c_int = 0x04;
pub const FE_UNDERFLOW: c_int = 0x08;
pub const FE_INEXACT: c_int = 0x10;

pub const FE_TONEAREST: c_int = 0x0000_0000;
pub const FE_UPWARD: c_int = 0x0040_0000;
pub const FE_DOWNWARD: c_int = 0x0080_0000;
pub const FE_TOWARDZERO: c_int = 0x00c0_0000;
