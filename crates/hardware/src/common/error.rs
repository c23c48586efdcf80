//! Error definitions.
//!
//! This module defines the error taxonomy of the emulator. It provides:
//! 1. **Execution Errors:** Decode failures and breakpoints surfaced by `step()`.
//! 2. **Load Errors:** Failures while parsing or placing firmware images.
//! 3. **Result Alias:** A crate-wide `Result` type over [`SimError`].
//!
//! Address errors and unknown peripheral registers are deliberately absent: they are
//! logged through `tracing` and degrade to a best-effort access instead of failing.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Hard failures surfaced to the caller of `step()` or `run_batch()`.
#[derive(Debug, Error)]
pub enum SimError {
    /// An instruction bit pattern with no defined ARMv6-M semantics.
    ///
    /// Execution must stop: continuing would run the wrong program.
    #[error("undefined instruction {opcode:#06x} at pc={pc:#010x}")]
    UndefinedInstruction {
        /// Address of the offending instruction.
        pc: u32,
        /// Raw encoding (32-bit encodings are packed first halfword high).
        opcode: u32,
    },

    /// The core executed `BKPT` with no debugger attached.
    #[error("breakpoint #{imm} at pc={pc:#010x}")]
    Breakpoint {
        /// Address of the `BKPT` instruction.
        pc: u32,
        /// Immediate operand of the instruction.
        imm: u8,
    },

    /// Firmware image could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures while loading firmware or boot ROM images.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image file could not be read.
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    /// A UF2 image contained no block targeting main flash.
    #[error("UF2 image contains no loadable blocks")]
    NoBlocks,

    /// The ELF container could not be parsed.
    #[error("invalid ELF image: {0}")]
    Elf(String),

    /// A segment or raw image does not fit the target region.
    #[error("{len} bytes at {addr:#010x} do not fit any writable region")]
    OutOfRange {
        /// Target address.
        addr: u32,
        /// Number of bytes.
        len: usize,
    },
}
