//! Cortex-M0+ execution modes and stack banks.
//!
//! This module defines the processor state selectors of ARMv6-M. It implements the following:
//! 1. **Mode Classification:** Thread mode (application) and Handler mode (exceptions).
//! 2. **Stack Banking:** Main and Process stack pointer selection.
//! 3. **Observability:** Human-readable naming for trace output.

use std::fmt;

/// Processor execution mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Thread mode: normal execution after reset.
    #[default]
    Thread,
    /// Handler mode: servicing an exception. Always uses the main stack.
    Handler,
}

/// Stack pointer bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StackBank {
    /// Main stack pointer (MSP).
    #[default]
    Main,
    /// Process stack pointer (PSP), selectable in Thread mode via CONTROL.SPSEL.
    Process,
}

impl ExecutionMode {
    /// Returns the short name of the mode.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Thread => "Thread",
            Self::Handler => "Handler",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
