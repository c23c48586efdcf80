//! ARMv6-M architectural state.
//!
//! This module contains the architectural selectors that shape how the core banks its
//! registers:
//! 1. **Modes:** Thread and Handler execution modes.
//! 2. **Stacks:** Main and Process stack pointer banks.

/// Execution mode and stack bank definitions.
pub mod mode;
