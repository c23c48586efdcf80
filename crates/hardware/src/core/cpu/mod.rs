//! CPU Core Definition and Initialization.
//!
//! This module defines the central `Cpu` structure, which serves as the container for the
//! entire processor state. It coordinates the following:
//! 1. **State Management:** Maintains the register file, execution mode and sleep state.
//! 2. **Execution:** Fetches, decodes and executes one Thumb instruction per step.
//! 3. **Exceptions:** Arbitrates pending exceptions and performs entry and return.
//! 4. **System Integration:** Interfaces with the system bus, devices and memories.

/// Instruction execution and the step loop.
pub mod execution;

/// Exception entry, return and interrupt arbitration.
pub mod exception;

use crate::common::RegisterFile;
use crate::common::reg::LR;
use crate::config::Config;
use crate::soc::System;
use crate::stats::SimStats;

/// Main CPU structure containing all processor state and components.
///
/// The CPU executes instructions against the bus, takes exceptions signalled through the
/// interrupt controller and counts cycles. It never advances virtual time itself; the
/// simulator driver converts returned cycle counts into clock advances.
#[derive(Debug)]
pub struct Cpu {
    /// General registers, special registers and flags.
    pub regs: RegisterFile,
    /// System bus and devices.
    pub bus: System,
    /// Sleeping in WFI/WFE until an exception becomes pending.
    pub waiting: bool,
    /// WFE event register.
    pub event_registered: bool,
    /// Total cycles executed.
    pub cycles: u64,
    /// Emit a `trace!` line per instruction.
    pub trace: bool,
    /// Execution statistics.
    pub stats: SimStats,
}

impl Cpu {
    /// Creates a new CPU attached to `system`.
    ///
    /// The core starts in the state reached by a reset through the configured vector
    /// table, so firmware must already be loaded for SP and PC to be meaningful. Call
    /// [`Cpu::reset`] after loading an image.
    ///
    /// # Arguments
    ///
    /// * `system` - The system containing the bus and all peripherals.
    /// * `config` - Boot and tracing configuration.
    pub fn new(system: System, config: &Config) -> Self {
        let mut cpu = Self {
            regs: RegisterFile::new(),
            bus: system,
            waiting: false,
            event_registered: false,
            cycles: 0,
            trace: config.simulation.trace_instructions,
            stats: SimStats::default(),
        };
        cpu.reset(config.boot.vector_base());
        cpu
    }

    /// Resets the core through the vector table at `vector_base`.
    ///
    /// SP is loaded from word 0 and PC from word 1 of the table; VTOR is set to the
    /// table. Peripherals are not touched.
    ///
    /// # Arguments
    ///
    /// * `vector_base` - Address of the vector table (0 for the boot ROM).
    pub fn reset(&mut self, vector_base: u32) {
        self.regs = RegisterFile::new();
        self.waiting = false;
        self.event_registered = false;

        let bus = &mut self.bus.bus;
        bus.irq.vtor = vector_base;
        bus.irq.vect_active = 0;
        let sp = bus.read32(vector_base);
        let pc = bus.read32(vector_base.wrapping_add(4));
        self.regs.set_msp(sp);
        self.regs.set_pc(pc & !1);
        self.regs.write(LR, 0xFFFF_FFFF);
        tracing::info!(
            target: "cpu",
            "reset: vtor={vector_base:#010x} sp={sp:#010x} pc={pc:#010x}"
        );
    }

    /// Reads a word through the bus.
    pub fn read32(&mut self, address: u32) -> u32 {
        self.bus.bus.read32(address)
    }

    /// Writes a word through the bus.
    pub fn write32(&mut self, address: u32, value: u32) {
        self.bus.bus.write32(address, value);
    }

    /// Drives an external interrupt line.
    pub fn set_interrupt(&mut self, irq: u32, level: bool) {
        self.bus.bus.irq.set_interrupt(irq, level);
    }

    /// Whether the core is asleep in WFI/WFE.
    pub const fn is_waiting(&self) -> bool {
        self.waiting
    }
}
