//! Instruction Set Architecture (ISA) definitions.
//!
//! Contains the decoded instruction model, the Thumb decoder and a disassembler for the
//! ARMv6-M profile implemented by the Cortex-M0+.
//!
//! # Coverage
//!
//! * All 16-bit Thumb encodings defined for ARMv6-M.
//! * 32-bit `BL`, `MSR`, `MRS`, `DSB`, `DMB`, `ISB` and `UDF.W`.

/// Thumb instruction decoder.
pub mod decode;

/// Instruction disassembler for debug tracing and diagnostics.
pub mod disasm;

/// Decoded instruction representation.
pub mod instruction;

pub use decode::decode;
pub use instruction::Instruction;
