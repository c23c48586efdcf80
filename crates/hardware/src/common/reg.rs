//! Cortex-M0+ register file.
//!
//! This module provides the `RegisterFile` struct holding the architectural core state.
//! It provides:
//! 1. **General Registers:** R0-R12, the active stack pointer, LR and PC.
//! 2. **Stack Banking:** Main and Process stack pointers swapped on mode/SPSEL changes.
//! 3. **Special Registers:** APSR flags, IPSR, PRIMASK and the CONTROL fields.

use crate::core::arch::mode::{ExecutionMode, StackBank};

/// Index of the stack pointer in the general register array.
pub const SP: usize = 13;
/// Index of the link register.
pub const LR: usize = 14;
/// Index of the program counter.
pub const PC: usize = 15;

/// The Thumb execution state bit in xPSR.
pub const XPSR_THUMB: u32 = 1 << 24;

/// APSR condition flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    /// Negative.
    pub n: bool,
    /// Zero.
    pub z: bool,
    /// Carry / not-borrow.
    pub c: bool,
    /// Signed overflow.
    pub v: bool,
}

impl Flags {
    /// Updates N and Z from a result value.
    #[inline(always)]
    pub const fn set_nz(&mut self, result: u32) {
        self.n = result & 0x8000_0000 != 0;
        self.z = result == 0;
    }

    /// Packs the flags into APSR bits 31:28.
    pub const fn to_apsr(self) -> u32 {
        (self.n as u32) << 31
            | (self.z as u32) << 30
            | (self.c as u32) << 29
            | (self.v as u32) << 28
    }

    /// Evaluates a condition code (0-13 as encoded in `B<cond>`; 14 and up always pass).
    pub const fn condition_passed(self, cond: u8) -> bool {
        match cond {
            0 => self.z,
            1 => !self.z,
            2 => self.c,
            3 => !self.c,
            4 => self.n,
            5 => !self.n,
            6 => self.v,
            7 => !self.v,
            8 => self.c && !self.z,
            9 => !self.c || self.z,
            10 => self.n == self.v,
            11 => self.n != self.v,
            12 => !self.z && self.n == self.v,
            13 => self.z || self.n != self.v,
            _ => true,
        }
    }

    /// Unpacks APSR bits 31:28.
    pub const fn from_apsr(value: u32) -> Self {
        Self {
            n: value & (1 << 31) != 0,
            z: value & (1 << 30) != 0,
            c: value & (1 << 29) != 0,
            v: value & (1 << 28) != 0,
        }
    }
}

/// Architectural register state of one Cortex-M0+ core.
///
/// `gpr[SP]` always holds the stack pointer of the *active* bank; the inactive one is
/// parked in `banked_sp`. Mode and SPSEL changes go through [`RegisterFile::set_mode`]
/// and [`RegisterFile::set_spsel`] so the swap is never missed.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    gpr: [u32; 16],
    banked_sp: u32,
    active_bank: StackBank,
    /// Condition flags.
    pub flags: Flags,
    /// Exception number of the active handler (0 in Thread mode).
    pub ipsr: u32,
    /// PRIMASK: when set, boosts execution priority to 0.
    pub primask: bool,
    /// CONTROL.nPRIV: Thread mode is unprivileged.
    pub npriv: bool,
    spsel: StackBank,
    mode: ExecutionMode,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates a register file in the architectural reset state (all zero, Thread mode).
    pub const fn new() -> Self {
        Self {
            gpr: [0; 16],
            banked_sp: 0,
            active_bank: StackBank::Main,
            flags: Flags { n: false, z: false, c: false, v: false },
            ipsr: 0,
            primask: false,
            npriv: false,
            spsel: StackBank::Main,
            mode: ExecutionMode::Thread,
        }
    }

    /// Reads a general register.
    ///
    /// # Arguments
    ///
    /// * `idx` - Register index (0-15). Index 15 returns the raw PC, not the pipelined value.
    #[inline(always)]
    pub const fn read(&self, idx: usize) -> u32 {
        self.gpr[idx & 0xF]
    }

    /// Writes a general register.
    ///
    /// Writes to SP are word aligned, matching the hardware which ignores bits 1:0.
    #[inline(always)]
    pub const fn write(&mut self, idx: usize, val: u32) {
        let idx = idx & 0xF;
        self.gpr[idx] = if idx == SP { val & !3 } else { val };
    }

    /// Current program counter.
    #[inline(always)]
    pub const fn pc(&self) -> u32 {
        self.gpr[PC]
    }

    /// Sets the program counter.
    #[inline(always)]
    pub const fn set_pc(&mut self, pc: u32) {
        self.gpr[PC] = pc;
    }

    /// Active stack pointer.
    pub const fn sp(&self) -> u32 {
        self.gpr[SP]
    }

    /// Link register.
    pub const fn lr(&self) -> u32 {
        self.gpr[LR]
    }

    /// Main stack pointer regardless of which bank is active.
    pub const fn msp(&self) -> u32 {
        match self.active_bank {
            StackBank::Main => self.gpr[SP],
            StackBank::Process => self.banked_sp,
        }
    }

    /// Process stack pointer regardless of which bank is active.
    pub const fn psp(&self) -> u32 {
        match self.active_bank {
            StackBank::Process => self.gpr[SP],
            StackBank::Main => self.banked_sp,
        }
    }

    /// Writes the main stack pointer.
    pub const fn set_msp(&mut self, val: u32) {
        match self.active_bank {
            StackBank::Main => self.gpr[SP] = val & !3,
            StackBank::Process => self.banked_sp = val & !3,
        }
    }

    /// Writes the process stack pointer.
    pub const fn set_psp(&mut self, val: u32) {
        match self.active_bank {
            StackBank::Process => self.gpr[SP] = val & !3,
            StackBank::Main => self.banked_sp = val & !3,
        }
    }

    /// Current execution mode.
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// CONTROL.SPSEL.
    pub const fn spsel(&self) -> StackBank {
        self.spsel
    }

    /// Bank currently backing `gpr[SP]`.
    pub const fn active_bank(&self) -> StackBank {
        self.active_bank
    }

    /// Switches execution mode and re-banks SP accordingly.
    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
        self.rebank();
    }

    /// Writes CONTROL.SPSEL and re-banks SP accordingly.
    pub fn set_spsel(&mut self, bank: StackBank) {
        self.spsel = bank;
        self.rebank();
    }

    fn rebank(&mut self) {
        let wanted = match self.mode {
            ExecutionMode::Handler => StackBank::Main,
            ExecutionMode::Thread => self.spsel,
        };
        if wanted != self.active_bank {
            std::mem::swap(&mut self.gpr[SP], &mut self.banked_sp);
            self.active_bank = wanted;
        }
    }

    /// CONTROL register value (nPRIV bit 0, SPSEL bit 1).
    pub const fn control(&self) -> u32 {
        (self.npriv as u32) | ((matches!(self.spsel, StackBank::Process) as u32) << 1)
    }

    /// Combined xPSR as pushed on exception entry.
    pub const fn xpsr(&self) -> u32 {
        self.flags.to_apsr() | XPSR_THUMB | (self.ipsr & 0x3F)
    }

    /// Dumps the general registers to a compact string for trace output.
    pub fn dump(&self) -> String {
        let mut out = String::with_capacity(256);
        for (i, v) in self.gpr.iter().enumerate() {
            let name = match i {
                SP => "sp".to_string(),
                LR => "lr".to_string(),
                PC => "pc".to_string(),
                _ => format!("r{i}"),
            };
            out.push_str(&format!("{name}={v:08x} "));
        }
        out.push_str(&format!("xpsr={:08x}", self.xpsr()));
        out
    }
}
