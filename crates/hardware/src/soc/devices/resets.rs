//! Subsystem reset controller (RESETS).
//!
//! Peripherals come out of reset instantly: `RESET_DONE` is always the complement of
//! `RESET`, which is what the SDK polls after releasing a block.

use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const RESET: u32 = 0x0;
const WDSEL: u32 = 0x4;
const RESET_DONE: u32 = 0x8;

/// All 25 resettable subsystems.
const ALL_SUBSYSTEMS: u32 = 0x01FF_FFFF;

/// The RESETS block.
#[derive(Clone, Copy, Debug)]
pub struct Resets {
    reset: u32,
    wdsel: u32,
}

impl Default for Resets {
    fn default() -> Self {
        Self::new()
    }
}

impl Resets {
    /// Creates the block with every subsystem held in reset.
    pub const fn new() -> Self {
        Self { reset: ALL_SUBSYSTEMS, wdsel: 0 }
    }

    /// Bitmap of subsystems held in reset.
    pub const fn held(&self) -> u32 {
        self.reset
    }
}

impl Peripheral for Resets {
    fn name(&self) -> &str {
        "RESETS"
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            RESET => self.reset,
            WDSEL => self.wdsel,
            RESET_DONE => !self.reset & ALL_SUBSYSTEMS,
            _ => unknown_read("RESETS", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        match offset {
            RESET => {
                let released = self.reset & !value;
                if released != 0 {
                    tracing::debug!(target: "resets", "released {released:#010x}");
                }
                self.reset = value & ALL_SUBSYSTEMS;
            }
            WDSEL => self.wdsel = value & ALL_SUBSYSTEMS,
            _ => unknown_write("RESETS", offset, value),
        }
    }

    fn reset(&mut self, _ctx: &mut PeripheralContext<'_>) {
        *self = Self::new();
    }
}
