//! ALU arithmetic operations.
//!
//! Implements the ARMv6-M `AddWithCarry` pseudo-function and the arithmetic members of
//! the register data-processing group. Every subtraction is expressed as
//! `AddWithCarry(a, !b, 1)`, so C is the inverted borrow.

use super::AluResult;
use crate::common::reg::Flags;
use crate::isa::instruction::AluOp;

/// Adds two words and a carry-in.
///
/// # Arguments
///
/// * `x` - First addend.
/// * `y` - Second addend.
/// * `carry_in` - Carry into bit 0.
///
/// # Returns
///
/// `(result, carry_out, overflow)`.
#[inline(always)]
pub const fn add_with_carry(x: u32, y: u32, carry_in: bool) -> (u32, bool, bool) {
    let unsigned = x as u64 + y as u64 + carry_in as u64;
    let signed = x as i32 as i64 + y as i32 as i64 + carry_in as i64;
    let result = unsigned as u32;
    (result, unsigned >> 32 != 0, result as i32 as i64 != signed)
}

/// Flags after an addition whose result is `result`.
#[inline(always)]
pub const fn add_flags(x: u32, y: u32, carry_in: bool) -> (u32, Flags) {
    let (result, c, v) = add_with_carry(x, y, carry_in);
    let flags = Flags { n: result & 0x8000_0000 != 0, z: result == 0, c, v };
    (result, flags)
}

/// `x - y` with flags, as `AddWithCarry(x, !y, 1)`.
#[inline(always)]
pub const fn sub_flags(x: u32, y: u32) -> (u32, Flags) {
    add_flags(x, !y, true)
}

/// Executes an arithmetic operation.
///
/// # Arguments
///
/// * `op`    - The operation (ADC, SBC, RSB, CMP, CMN or MUL).
/// * `a`     - First operand.
/// * `b`     - Second operand; for RSB this is the register being negated.
/// * `flags` - Incoming flags.
pub fn execute(op: AluOp, a: u32, b: u32, flags: Flags) -> AluResult {
    let (value, flags, writeback) = match op {
        AluOp::Adc => {
            let (r, f) = add_flags(a, b, flags.c);
            (r, f, true)
        }
        AluOp::Sbc => {
            let (r, f) = add_flags(a, !b, flags.c);
            (r, f, true)
        }
        AluOp::Rsb => {
            let (r, f) = sub_flags(0, b);
            (r, f, true)
        }
        AluOp::Cmp => {
            let (r, f) = sub_flags(a, b);
            (r, f, false)
        }
        AluOp::Cmn => {
            let (r, f) = add_flags(a, b, false);
            (r, f, false)
        }
        AluOp::Mul => {
            let r = a.wrapping_mul(b);
            let mut f = flags;
            f.set_nz(r);
            (r, f, true)
        }
        _ => (a, flags, false),
    };
    AluResult { value, flags, writeback }
}
