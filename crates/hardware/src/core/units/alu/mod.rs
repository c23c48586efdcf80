//! Arithmetic Logic Unit (ALU).
//!
//! This module implements the flag-setting integer ALU used by the execute stage.
//! It covers the ARMv6-M register data-processing group and the shift-by-immediate
//! forms, producing both the result and the updated APSR flags.
//!
//! Operations are organized into submodules by category:
//! - [`arithmetic`]: ADC, SBC, RSB (NEG), CMP, CMN, MUL and the `AddWithCarry` primitive
//! - [`logic`]:      AND, EOR, ORR, BIC, MVN, TST
//! - [`shifts`]:     LSL, LSR, ASR, ROR with shifter carry-out

/// Integer arithmetic and the `AddWithCarry` primitive.
pub mod arithmetic;

/// Bitwise logical operations.
pub mod logic;

/// Shift and rotate operations.
pub mod shifts;

use crate::common::reg::Flags;
use crate::isa::instruction::AluOp;

/// Output of one ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluResult {
    /// Computed value.
    pub value: u32,
    /// Flags after the operation.
    pub flags: Flags,
    /// Whether `value` is written to the destination (false for TST/CMP/CMN).
    pub writeback: bool,
}

/// Arithmetic Logic Unit for the register data-processing group.
#[derive(Clone, Copy, Debug, Default)]
pub struct Alu;

impl Alu {
    /// Executes a register data-processing operation.
    ///
    /// # Arguments
    ///
    /// * `op`    - The operation to perform.
    /// * `a`     - First operand (`Rdn`).
    /// * `b`     - Second operand (`Rm`).
    /// * `flags` - Flags before the operation; carry feeds ADC/SBC and unaffected flags
    ///   pass through.
    ///
    /// # Returns
    ///
    /// The result, the new flags and whether the destination is written.
    pub fn execute(op: AluOp, a: u32, b: u32, flags: Flags) -> AluResult {
        match op {
            AluOp::Adc
            | AluOp::Sbc
            | AluOp::Rsb
            | AluOp::Cmp
            | AluOp::Cmn
            | AluOp::Mul => arithmetic::execute(op, a, b, flags),
            AluOp::And | AluOp::Eor | AluOp::Orr | AluOp::Bic | AluOp::Mvn | AluOp::Tst => {
                logic::execute(op, a, b, flags)
            }
            AluOp::Lsl | AluOp::Lsr | AluOp::Asr | AluOp::Ror => {
                shifts::execute(op, a, b, flags)
            }
        }
    }
}
