//! Placeholder register blocks.
//!
//! 1. **[`RegisterBank`]:** Plain storage for configuration blocks whose registers have
//!    no side effects worth modelling (pad and IO muxing, bus priority, SYSCFG).
//! 2. **[`Unimplemented`]:** Blocks with no model at all. Every access is logged and
//!    reads return a fixed fill value. Oscillator and PLL stubs fill with all ones so
//!    status polls for "stable" and "locked" succeed.

use std::collections::BTreeMap;

use crate::soc::traits::{Peripheral, PeripheralContext};

/// A block that stores whatever is written to it.
#[derive(Clone, Debug)]
pub struct RegisterBank {
    name: &'static str,
    registers: BTreeMap<u32, u32>,
}

impl RegisterBank {
    /// Creates an empty bank; unwritten registers read as zero.
    pub const fn new(name: &'static str) -> Self {
        Self { name, registers: BTreeMap::new() }
    }
}

impl Peripheral for RegisterBank {
    fn name(&self) -> &str {
        self.name
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        self.registers.get(&offset).copied().unwrap_or(0)
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        let _ = self.registers.insert(offset, value);
    }

    fn reset(&mut self, _ctx: &mut PeripheralContext<'_>) {
        self.registers.clear();
    }
}

/// A block with no behaviour.
#[derive(Clone, Copy, Debug)]
pub struct Unimplemented {
    name: &'static str,
    fill: u32,
}

impl Unimplemented {
    /// Creates a stub whose reads return `fill`.
    pub const fn new(name: &'static str, fill: u32) -> Self {
        Self { name, fill }
    }
}

impl Peripheral for Unimplemented {
    fn name(&self) -> &str {
        self.name
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        tracing::debug!(target: "soc", "{}: unimplemented read at {offset:#05x}", self.name);
        self.fill
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        tracing::debug!(
            target: "soc",
            "{}: unimplemented write {value:#010x} at {offset:#05x}",
            self.name
        );
    }
}
