//! Execution units and functional components.
//!
//! This module contains the functional units the execute stage delegates to. On the
//! Cortex-M0+ this is the flag-setting ALU with its barrel shifter; the single-cycle
//! multiplier is folded into the ALU.

/// Arithmetic Logic Unit for integer operations.
pub mod alu;
