//! Common utilities and types used throughout the emulator.
//!
//! This module provides building blocks shared across all components. It includes:
//! 1. **Constants:** The RP2040 memory map, IRQ lines and exception numbers.
//! 2. **Error Handling:** Execution and image-loading errors.
//! 3. **Register Management:** The Cortex-M0+ register file and PSR flags.

/// RP2040 memory map and interrupt constants.
pub mod constants;

/// Error types.
pub mod error;

/// Register file implementation.
pub mod reg;

pub use error::{LoadError, Result, SimError};
pub use reg::{Flags, RegisterFile};
