//! Clock generator block (CLOCKS).
//!
//! Stores the control and divider registers of the ten clock generators and reports the
//! selected source through the `SELECTED` registers, so the SDK's clock setup loops
//! complete. Frequencies are not derived from these registers; the virtual clock runs
//! at the configured system and peripheral rates.
//!
//! # Registers
//!
//! * `0x00..0x78`: `CTRL`, `DIV`, `SELECTED` for each generator, stride `0x0C`
//! * `0x98`: `FC0_STATUS` (frequency counter always done)
//! * `0x9C`: `FC0_RESULT`

use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const NUM_GENERATORS: usize = 10;
const GENERATOR_STRIDE: u32 = 0x0C;
const CLK_REF: usize = 4;
const CLK_SYS: usize = 5;

const FC0_STATUS: u32 = 0x98;
const FC0_RESULT: u32 = 0x9C;
const FC0_STATUS_DONE: u32 = 1 << 4;

/// DIV reset value: integer divider 1.
const DIV_RESET: u32 = 1 << 8;

/// The CLOCKS block.
#[derive(Clone, Debug)]
pub struct Clocks {
    ctrl: [u32; NUM_GENERATORS],
    div: [u32; NUM_GENERATORS],
    fc0_result: u32,
}

impl Default for Clocks {
    fn default() -> Self {
        Self::new()
    }
}

impl Clocks {
    /// Creates the block in its reset state.
    pub const fn new() -> Self {
        Self {
            ctrl: [0; NUM_GENERATORS],
            div: [DIV_RESET; NUM_GENERATORS],
            fc0_result: 0,
        }
    }

    /// One-hot glitchless mux selection of a generator.
    fn selected(&self, index: usize) -> u32 {
        let ctrl = self.ctrl[index];
        match index {
            CLK_REF => 1 << (ctrl & 3),
            CLK_SYS => 1 << (ctrl & 1),
            _ => 1,
        }
    }
}

impl Peripheral for Clocks {
    fn name(&self) -> &str {
        "CLOCKS"
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        let index = (offset / GENERATOR_STRIDE) as usize;
        if index < NUM_GENERATORS {
            return match offset % GENERATOR_STRIDE {
                0 => self.ctrl[index],
                4 => self.div[index],
                _ => self.selected(index),
            };
        }
        match offset {
            FC0_STATUS => FC0_STATUS_DONE,
            FC0_RESULT => self.fc0_result,
            0x78..=0xC4 => 0,
            _ => unknown_read("CLOCKS", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        let index = (offset / GENERATOR_STRIDE) as usize;
        if index < NUM_GENERATORS {
            match offset % GENERATOR_STRIDE {
                0 => self.ctrl[index] = value,
                4 => self.div[index] = value,
                _ => unknown_write("CLOCKS", offset, value),
            }
            return;
        }
        match offset {
            FC0_RESULT => self.fc0_result = value,
            // Resus, frequency counter setup and sleep enables.
            0x78..=0xC4 => {}
            _ => unknown_write("CLOCKS", offset, value),
        }
    }

    fn reset(&mut self, _ctx: &mut PeripheralContext<'_>) {
        *self = Self::new();
    }
}
