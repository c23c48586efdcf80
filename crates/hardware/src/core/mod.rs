//! Core processor implementation.
//!
//! This module contains the Cortex-M0+ implementation: the architectural mode
//! selectors, the execution units and the CPU that steps instructions and takes
//! exceptions.

/// Architecture-specific components (execution modes, stack banks).
pub mod arch;

/// CPU core implementation and execution orchestration.
pub mod cpu;

/// Execution units (ALU and shifter).
pub mod units;

pub use self::cpu::Cpu;
