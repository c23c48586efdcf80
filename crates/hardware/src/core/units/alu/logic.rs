//! ALU bitwise logical operations.
//!
//! Logical operations update N and Z only; C and V pass through unchanged.

use super::AluResult;
use crate::common::reg::Flags;
use crate::isa::instruction::AluOp;

/// Executes a logical operation.
///
/// # Arguments
///
/// * `op`    - The operation (AND, EOR, ORR, BIC, MVN or TST).
/// * `a`     - First operand.
/// * `b`     - Second operand.
/// * `flags` - Incoming flags.
pub fn execute(op: AluOp, a: u32, b: u32, flags: Flags) -> AluResult {
    let (value, writeback) = match op {
        AluOp::And => (a & b, true),
        AluOp::Tst => (a & b, false),
        AluOp::Eor => (a ^ b, true),
        AluOp::Orr => (a | b, true),
        AluOp::Bic => (a & !b, true),
        AluOp::Mvn => (!b, true),
        _ => (a, false),
    };
    let mut flags = flags;
    flags.set_nz(value);
    AluResult { value, flags, writeback }
}
