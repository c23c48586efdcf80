//! Synchronous serial interface (SSI) of the flash controller.
//!
//! Boot stage 2 and the SDK's flash routines drive the external QSPI flash through this
//! block. No flash device is modelled behind it: the controller always reports an
//! idle, empty transmit FIFO and answers every transmitted frame with zero. Execute-in-
//! place reads go straight to the flash array and never touch this block.

use std::collections::{BTreeMap, VecDeque};

use crate::soc::traits::{Peripheral, PeripheralContext};

const TXFLR: u32 = 0x20;
const RXFLR: u32 = 0x24;
const SR: u32 = 0x28;
const DR0: u32 = 0x60;

const SR_TFNF: u32 = 1 << 1;
const SR_TFE: u32 = 1 << 2;
const SR_RFNE: u32 = 1 << 3;

/// Receive FIFO depth.
const FIFO_DEPTH: usize = 16;

/// The SSI block.
#[derive(Clone, Debug, Default)]
pub struct Ssi {
    registers: BTreeMap<u32, u32>,
    rx_fifo: VecDeque<u32>,
}

impl Ssi {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripheral for Ssi {
    fn name(&self) -> &str {
        "SSI"
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            TXFLR => 0,
            RXFLR => self.rx_fifo.len() as u32,
            SR => SR_TFE | SR_TFNF | if self.rx_fifo.is_empty() { 0 } else { SR_RFNE },
            DR0 => self.rx_fifo.pop_front().unwrap_or(0),
            _ => self.registers.get(&offset).copied().unwrap_or(0),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        if offset == DR0 {
            if self.rx_fifo.len() < FIFO_DEPTH {
                self.rx_fifo.push_back(0);
            }
            return;
        }
        let _ = self.registers.insert(offset, value);
    }

    fn reset(&mut self, _ctx: &mut PeripheralContext<'_>) {
        self.registers.clear();
        self.rx_fifo.clear();
    }
}
