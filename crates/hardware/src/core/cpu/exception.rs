//! Exception Handling Logic.
//!
//! This module implements the ARMv6-M exception model for the CPU. It performs the
//! following:
//! 1. **Arbitration:** Compares the highest pending exception against the current
//!    execution priority (boosted to 0 by PRIMASK).
//! 2. **Entry:** Stacks the eight-word frame, switches to Handler mode on the main stack
//!    and vectors through VTOR.
//! 3. **Return:** Decodes EXC_RETURN, unstacks the frame and restores mode and stack.
//! 4. **Sleep:** Wakes the core from WFI/WFE and honours SLEEPONEXIT.

use super::Cpu;
use crate::common::constants::{
    EXC_RETURN_HANDLER, EXC_RETURN_THREAD_MSP, EXC_RETURN_THREAD_PSP,
};
use crate::common::reg::{Flags, LR, SP};
use crate::core::arch::mode::{ExecutionMode, StackBank};
use crate::soc::nvic::THREAD_PRIORITY;

/// Cycles charged for exception entry (stacking and vector fetch).
pub const EXCEPTION_ENTRY_CYCLES: u64 = 15;

/// Stacked xPSR bit recording that the frame was realigned to 8 bytes.
const XPSR_FRAME_ALIGN: u32 = 1 << 9;

/// SCR.SLEEPONEXIT.
const SCR_SLEEPONEXIT: u32 = 1 << 1;

/// Size of the basic exception frame in bytes.
const FRAME_SIZE: u32 = 0x20;

impl Cpu {
    /// Current execution priority.
    ///
    /// Thread mode runs below every configurable priority. PRIMASK boosts the priority
    /// to 0, masking everything except NMI and HardFault.
    pub fn execution_priority(&self) -> i32 {
        let mut priority = if self.regs.ipsr == 0 {
            THREAD_PRIORITY
        } else {
            self.bus.bus.irq.exception_priority(self.regs.ipsr)
        };
        if self.regs.primask {
            priority = priority.min(0);
        }
        priority
    }

    /// Wakes a sleeping core and takes the highest pending exception if it preempts.
    ///
    /// # Returns
    ///
    /// Cycles spent on exception entry, or 0 if nothing was taken.
    pub fn check_for_interrupts(&mut self) -> u64 {
        let irq = &self.bus.bus.irq;
        if self.waiting && irq.wake_pending() {
            self.waiting = false;
        }
        let Some((exception, priority)) = irq.highest_pending() else {
            return 0;
        };
        if priority >= self.execution_priority() {
            return 0;
        }
        self.exception_entry(exception);
        self.cycles += EXCEPTION_ENTRY_CYCLES;
        EXCEPTION_ENTRY_CYCLES
    }

    /// Enters the handler for `exception`.
    ///
    /// The return address stacked is the current PC, i.e. the next instruction to run.
    ///
    /// # Arguments
    ///
    /// * `exception` - Exception number (2 for NMI, 16+n for IRQ n).
    pub fn exception_entry(&mut self, exception: u32) {
        let sp = self.regs.sp();
        let realign = sp & 4 != 0;
        let frame = sp.wrapping_sub(FRAME_SIZE) & !4;
        let xpsr = self.regs.xpsr() | if realign { XPSR_FRAME_ALIGN } else { 0 };
        let words = [
            self.regs.read(0),
            self.regs.read(1),
            self.regs.read(2),
            self.regs.read(3),
            self.regs.read(12),
            self.regs.lr(),
            self.regs.pc(),
            xpsr,
        ];
        for (i, word) in words.into_iter().enumerate() {
            self.bus.bus.write32(frame.wrapping_add(4 * i as u32), word);
        }
        self.regs.write(SP, frame);

        let exc_return = match (self.regs.mode(), self.regs.spsel()) {
            (ExecutionMode::Handler, _) => EXC_RETURN_HANDLER,
            (ExecutionMode::Thread, StackBank::Main) => EXC_RETURN_THREAD_MSP,
            (ExecutionMode::Thread, StackBank::Process) => EXC_RETURN_THREAD_PSP,
        };
        self.regs.write(LR, exc_return);
        self.regs.set_mode(ExecutionMode::Handler);
        self.regs.set_spsel(StackBank::Main);
        self.regs.ipsr = exception;

        let bus = &mut self.bus.bus;
        bus.irq.acknowledge(exception);
        bus.irq.vect_active = exception;
        let vector = bus.read32(bus.irq.vtor.wrapping_add(4 * exception));
        self.regs.set_pc(vector & !1);
        self.waiting = false;
        self.stats.exceptions_taken += 1;
        tracing::trace!(target: "cpu", exception, "exception entry -> {vector:#010x}");
    }

    /// Performs an exception return to `exc_return`.
    ///
    /// An unrecognised EXC_RETURN value is logged and treated as a return to Thread mode
    /// on the main stack.
    pub fn exception_return(&mut self, exc_return: u32) {
        let (mode, bank) = match exc_return {
            EXC_RETURN_HANDLER => (ExecutionMode::Handler, StackBank::Main),
            EXC_RETURN_THREAD_MSP => (ExecutionMode::Thread, StackBank::Main),
            EXC_RETURN_THREAD_PSP => (ExecutionMode::Thread, StackBank::Process),
            other => {
                tracing::warn!(target: "cpu", "invalid EXC_RETURN {other:#010x}");
                (ExecutionMode::Thread, StackBank::Main)
            }
        };
        self.regs.set_spsel(bank);
        self.regs.set_mode(mode);

        let frame = self.regs.sp();
        let mut words = [0u32; 8];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.bus.bus.read32(frame.wrapping_add(4 * i as u32));
        }
        let [r0, r1, r2, r3, r12, lr, pc, xpsr] = words;
        for (r, value) in [(0, r0), (1, r1), (2, r2), (3, r3), (12, r12), (LR, lr)] {
            self.regs.write(r, value);
        }
        let realign = if xpsr & XPSR_FRAME_ALIGN != 0 { 4 } else { 0 };
        self.regs.write(SP, frame.wrapping_add(FRAME_SIZE + realign));
        self.regs.set_pc(pc & !1);
        self.regs.flags = Flags::from_apsr(xpsr);
        self.regs.ipsr = xpsr & 0x3F;
        self.bus.bus.irq.vect_active = self.regs.ipsr;
        tracing::trace!(target: "cpu", "exception return -> {pc:#010x} ({mode})");

        if matches!(mode, ExecutionMode::Thread) && self.bus.bus.irq.scr & SCR_SLEEPONEXIT != 0 {
            self.waiting = true;
        }
    }

    /// Writes PC from an interworking branch (BX, BLX, POP).
    ///
    /// In Handler mode an EXC_RETURN value triggers an exception return instead.
    pub fn bx_write_pc(&mut self, target: u32) {
        if matches!(self.regs.mode(), ExecutionMode::Handler) && target >> 28 == 0xF {
            self.exception_return(target);
            return;
        }
        if target & 1 == 0 {
            tracing::warn!(target: "cpu", "branch to ARM state at {target:#010x}");
        }
        self.regs.set_pc(target & !1);
    }
}
