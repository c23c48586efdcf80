//! ALU shift operations.
//!
//! Implements LSL, LSR, ASR and ROR with the ARM shifter carry-out. Register-specified
//! shifts use the bottom byte of the shift register, so amounts of 32 and above are
//! meaningful: LSL/LSR produce zero, ASR replicates the sign bit. An amount of zero
//! leaves both the value and C untouched.

use super::AluResult;
use crate::common::reg::Flags;
use crate::isa::instruction::{AluOp, ShiftOp};

/// Logical shift left with carry-out.
pub const fn lsl_c(x: u32, n: u32, carry: bool) -> (u32, bool) {
    match n {
        0 => (x, carry),
        1..32 => (x << n, (x >> (32 - n)) & 1 != 0),
        32 => (0, x & 1 != 0),
        _ => (0, false),
    }
}

/// Logical shift right with carry-out.
pub const fn lsr_c(x: u32, n: u32, carry: bool) -> (u32, bool) {
    match n {
        0 => (x, carry),
        1..32 => (x >> n, (x >> (n - 1)) & 1 != 0),
        32 => (0, x >> 31 != 0),
        _ => (0, false),
    }
}

/// Arithmetic shift right with carry-out.
pub const fn asr_c(x: u32, n: u32, carry: bool) -> (u32, bool) {
    match n {
        0 => (x, carry),
        1..32 => (((x as i32) >> n) as u32, (x >> (n - 1)) & 1 != 0),
        _ => {
            let sign = x >> 31 != 0;
            (if sign { u32::MAX } else { 0 }, sign)
        }
    }
}

/// Rotate right with carry-out.
pub const fn ror_c(x: u32, n: u32, carry: bool) -> (u32, bool) {
    if n == 0 {
        return (x, carry);
    }
    let result = x.rotate_right(n & 31);
    (result, result >> 31 != 0)
}

/// Shift by an encoded immediate (`LSLS/LSRS/ASRS Rd, Rm, #imm5`).
///
/// An encoded amount of zero means 32 for LSR and ASR; for LSL it is a plain move.
///
/// # Returns
///
/// The result and the flags with N, Z and C updated.
pub const fn shift_imm(op: ShiftOp, x: u32, imm5: u8, flags: Flags) -> (u32, Flags) {
    let n = imm5 as u32;
    let (value, c) = match op {
        ShiftOp::Lsl => lsl_c(x, n, flags.c),
        ShiftOp::Lsr => lsr_c(x, if n == 0 { 32 } else { n }, flags.c),
        ShiftOp::Asr => asr_c(x, if n == 0 { 32 } else { n }, flags.c),
    };
    let mut flags = flags;
    flags.set_nz(value);
    flags.c = c;
    (value, flags)
}

/// Executes a shift-by-register operation.
///
/// # Arguments
///
/// * `op`    - The operation (LSL, LSR, ASR or ROR).
/// * `a`     - Value to shift.
/// * `b`     - Shift register; only bits 7:0 are used.
/// * `flags` - Incoming flags.
pub fn execute(op: AluOp, a: u32, b: u32, flags: Flags) -> AluResult {
    let n = b & 0xFF;
    let (value, c) = match op {
        AluOp::Lsl => lsl_c(a, n, flags.c),
        AluOp::Lsr => lsr_c(a, n, flags.c),
        AluOp::Asr => asr_c(a, n, flags.c),
        AluOp::Ror => ror_c(a, n, flags.c),
        _ => (a, flags.c),
    };
    let mut flags = flags;
    flags.set_nz(value);
    flags.c = c;
    AluResult { value, flags, writeback: true }
}
