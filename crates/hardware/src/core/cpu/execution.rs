//! Main Execution Loop.
//!
//! This module implements the fetch-decode-execute cycle of the core. It performs the
//! following:
//! 1. **Fetch and Decode:** Reads one or two halfwords at PC and decodes them.
//! 2. **Execution:** Applies the instruction to registers, flags and memory.
//! 3. **Timing:** Returns the Cortex-M0+ cycle cost, with wait states for bus accesses.
//! 4. **Observability:** Per-instruction `trace!` output and instruction-mix statistics.

use super::Cpu;
use crate::common::constants::EXC_SVCALL;
use crate::common::error::{Result, SimError};
use crate::common::reg::{LR, PC, SP};
use crate::core::arch::mode::{ExecutionMode, StackBank};
use crate::core::units::alu::arithmetic::{add_flags, sub_flags};
use crate::core::units::alu::{Alu, shifts};
use crate::isa::decode::{decode, is_wide};
use crate::isa::instruction::{
    Address, ExtendOp, Hint, Instruction, LoadWidth, ReverseOp, StoreWidth,
};
use crate::soc::Bus;

/// Special register numbers used by MRS/MSR.
mod sysm {
    pub const MSP: u8 = 8;
    pub const PSP: u8 = 9;
    pub const PRIMASK: u8 = 16;
    pub const CONTROL: u8 = 20;
}

impl Cpu {
    /// Executes one instruction, or checks for a wake-up while asleep.
    ///
    /// After the instruction retires, pending exceptions are arbitrated and the highest
    /// one that beats the current execution priority is entered.
    ///
    /// # Returns
    ///
    /// Cycles consumed, including exception entry. A sleeping core that does not wake
    /// returns 0.
    ///
    /// # Errors
    ///
    /// [`SimError::UndefinedInstruction`] for encodings with no ARMv6-M meaning and
    /// [`SimError::Breakpoint`] for `BKPT`. PC is left pointing at the instruction.
    pub fn step(&mut self) -> Result<u32> {
        if self.waiting {
            return Ok(self.check_for_interrupts() as u32);
        }

        let pc = self.regs.pc();
        let first = self.bus.bus.read16(pc);
        let (second, opcode) = if is_wide(first) {
            let second = self.bus.bus.read16(pc.wrapping_add(2));
            (second, u32::from(first) << 16 | u32::from(second))
        } else {
            (0, u32::from(first))
        };
        let Some(inst) = decode(first, second) else {
            return Err(SimError::UndefinedInstruction { pc, opcode });
        };

        if self.trace {
            tracing::trace!(target: "cpu", "{pc:#010x}: {inst} | {}", self.regs.dump());
        }

        match inst {
            Instruction::Udf { .. } => return Err(SimError::UndefinedInstruction { pc, opcode }),
            Instruction::Bkpt { imm } => return Err(SimError::Breakpoint { pc, imm }),
            _ => {}
        }

        self.regs.set_pc(pc.wrapping_add(inst.size()));
        let cycles = self.execute(inst, pc);
        self.record(&inst);
        self.cycles += cycles;

        let cycles = cycles + self.check_for_interrupts();
        self.stats.cycles = self.cycles;
        Ok(cycles as u32)
    }

    /// Value of register `r` as an operand; PC reads as the instruction address + 4.
    #[inline(always)]
    fn operand(&self, r: u8, pc: u32) -> u32 {
        if usize::from(r) == PC {
            pc.wrapping_add(4)
        } else {
            self.regs.read(usize::from(r))
        }
    }

    #[inline(always)]
    fn set_reg(&mut self, r: u8, value: u32) {
        self.regs.write(usize::from(r), value);
    }

    /// Whether the core runs privileged (Handler mode, or Thread with nPRIV clear).
    pub const fn privileged(&self) -> bool {
        matches!(self.regs.mode(), ExecutionMode::Handler) || !self.regs.npriv
    }

    fn effective_address(&self, addr: Address, pc: u32) -> u32 {
        match addr {
            Address::Imm { rn, offset } => self.operand(rn, pc).wrapping_add(offset),
            Address::Reg { rn, rm } => self.operand(rn, pc).wrapping_add(self.operand(rm, pc)),
            Address::Literal { offset } => (pc.wrapping_add(4) & !3).wrapping_add(offset),
        }
    }

    fn load(&mut self, width: LoadWidth, address: u32) -> u32 {
        let bus = &mut self.bus.bus;
        match width {
            LoadWidth::Word => bus.read32(address),
            LoadWidth::Half => u32::from(bus.read16(address)),
            LoadWidth::Byte => u32::from(bus.read8(address)),
            LoadWidth::SignedHalf => bus.read16(address) as i16 as i32 as u32,
            LoadWidth::SignedByte => bus.read8(address) as i8 as i32 as u32,
        }
    }

    fn store(&mut self, width: StoreWidth, address: u32, value: u32) {
        let bus = &mut self.bus.bus;
        match width {
            StoreWidth::Word => bus.write32(address, value),
            StoreWidth::Half => bus.write16(address, value as u16),
            StoreWidth::Byte => bus.write8(address, value as u8),
        }
    }

    /// Executes a decoded instruction whose address is `pc`.
    ///
    /// PC already holds the address of the next instruction; branches overwrite it.
    ///
    /// # Returns
    ///
    /// The cycle cost of the instruction.
    fn execute(&mut self, inst: Instruction, pc: u32) -> u64 {
        match inst {
            Instruction::ShiftImm { op, rd, rm, imm5 } => {
                let (value, flags) =
                    shifts::shift_imm(op, self.operand(rm, pc), imm5, self.regs.flags);
                self.regs.flags = flags;
                self.set_reg(rd, value);
                1
            }
            Instruction::AddReg { rd, rn, rm } => {
                let (value, flags) = add_flags(self.operand(rn, pc), self.operand(rm, pc), false);
                self.regs.flags = flags;
                self.set_reg(rd, value);
                1
            }
            Instruction::SubReg { rd, rn, rm } => {
                let (value, flags) = sub_flags(self.operand(rn, pc), self.operand(rm, pc));
                self.regs.flags = flags;
                self.set_reg(rd, value);
                1
            }
            Instruction::AddImm { rd, rn, imm } => {
                let (value, flags) = add_flags(self.operand(rn, pc), imm, false);
                self.regs.flags = flags;
                self.set_reg(rd, value);
                1
            }
            Instruction::SubImm { rd, rn, imm } => {
                let (value, flags) = sub_flags(self.operand(rn, pc), imm);
                self.regs.flags = flags;
                self.set_reg(rd, value);
                1
            }
            Instruction::MovImm { rd, imm } => {
                self.regs.flags.set_nz(imm);
                self.set_reg(rd, imm);
                1
            }
            Instruction::CmpImm { rn, imm } => {
                let (_, flags) = sub_flags(self.operand(rn, pc), imm);
                self.regs.flags = flags;
                1
            }
            Instruction::Alu { op, rdn, rm } => {
                let result =
                    Alu::execute(op, self.operand(rdn, pc), self.operand(rm, pc), self.regs.flags);
                self.regs.flags = result.flags;
                if result.writeback {
                    self.set_reg(rdn, result.value);
                }
                1
            }
            Instruction::AddHigh { rdn, rm } => {
                let value = self.operand(rdn, pc).wrapping_add(self.operand(rm, pc));
                if usize::from(rdn) == PC {
                    self.regs.set_pc(value & !1);
                    2
                } else {
                    self.set_reg(rdn, value);
                    1
                }
            }
            Instruction::CmpHigh { rn, rm } => {
                let (_, flags) = sub_flags(self.operand(rn, pc), self.operand(rm, pc));
                self.regs.flags = flags;
                1
            }
            Instruction::MovHigh { rd, rm } => {
                let value = self.operand(rm, pc);
                if usize::from(rd) == PC {
                    self.regs.set_pc(value & !1);
                    2
                } else {
                    self.set_reg(rd, value);
                    1
                }
            }
            Instruction::Bx { rm } => {
                let target = self.operand(rm, pc);
                self.bx_write_pc(target);
                2
            }
            Instruction::Blx { rm } => {
                let target = self.operand(rm, pc);
                self.regs.write(LR, pc.wrapping_add(2) | 1);
                self.bx_write_pc(target);
                2
            }
            Instruction::Load { width, rt, addr } => {
                let address = self.effective_address(addr, pc);
                let value = self.load(width, address);
                self.set_reg(rt, value);
                2 + Bus::cycles_io(address, false)
            }
            Instruction::Store { width, rt, addr } => {
                let address = self.effective_address(addr, pc);
                let value = self.operand(rt, pc);
                self.store(width, address, value);
                2 + Bus::cycles_io(address, true)
            }
            Instruction::Adr { rd, imm } => {
                self.set_reg(rd, (pc.wrapping_add(4) & !3).wrapping_add(imm));
                1
            }
            Instruction::AddSpImm { rd, imm } => {
                self.set_reg(rd, self.regs.sp().wrapping_add(imm));
                1
            }
            Instruction::AdjustSp { imm, subtract } => {
                let sp = self.regs.sp();
                let sp = if subtract { sp.wrapping_sub(imm) } else { sp.wrapping_add(imm) };
                self.regs.write(SP, sp);
                1
            }
            Instruction::Extend { op, rd, rm } => {
                let v = self.operand(rm, pc);
                let value = match op {
                    ExtendOp::Sxth => v as u16 as i16 as i32 as u32,
                    ExtendOp::Sxtb => v as u8 as i8 as i32 as u32,
                    ExtendOp::Uxth => v & 0xFFFF,
                    ExtendOp::Uxtb => v & 0xFF,
                };
                self.set_reg(rd, value);
                1
            }
            Instruction::Reverse { op, rd, rm } => {
                let v = self.operand(rm, pc);
                let value = match op {
                    ReverseOp::Rev => v.swap_bytes(),
                    ReverseOp::Rev16 => ((v & 0x00FF_00FF) << 8) | ((v >> 8) & 0x00FF_00FF),
                    ReverseOp::Revsh => (v as u16).swap_bytes() as i16 as i32 as u32,
                };
                self.set_reg(rd, value);
                1
            }
            Instruction::Push { registers } => {
                let count = registers.count_ones();
                let base = self.regs.sp().wrapping_sub(4 * count);
                let mut address = base;
                for r in (0..16u8).filter(|r| registers & (1 << r) != 0) {
                    let value = self.operand(r, pc);
                    self.bus.bus.write32(address, value);
                    address = address.wrapping_add(4);
                }
                self.regs.write(SP, base);
                1 + u64::from(count)
            }
            Instruction::Pop { registers } => {
                let count = registers.count_ones();
                let mut address = self.regs.sp();
                for r in (0..15u8).filter(|r| registers & (1 << r) != 0) {
                    let value = self.bus.bus.read32(address);
                    self.set_reg(r, value);
                    address = address.wrapping_add(4);
                }
                if registers & (1 << PC) != 0 {
                    let target = self.bus.bus.read32(address);
                    self.regs.write(SP, address.wrapping_add(4));
                    self.bx_write_pc(target);
                    3 + u64::from(count)
                } else {
                    self.regs.write(SP, address);
                    1 + u64::from(count)
                }
            }
            Instruction::Stm { rn, registers } => {
                let mut address = self.operand(rn, pc);
                for r in (0..8u8).filter(|r| registers & (1 << r) != 0) {
                    let value = self.operand(r, pc);
                    self.bus.bus.write32(address, value);
                    address = address.wrapping_add(4);
                }
                self.set_reg(rn, address);
                1 + u64::from(registers.count_ones())
            }
            Instruction::Ldm { rn, registers } => {
                let mut address = self.operand(rn, pc);
                for r in (0..8u8).filter(|r| registers & (1 << r) != 0) {
                    let value = self.bus.bus.read32(address);
                    self.set_reg(r, value);
                    address = address.wrapping_add(4);
                }
                if registers & (1 << rn) == 0 {
                    self.set_reg(rn, address);
                }
                1 + u64::from(registers.count_ones())
            }
            Instruction::Cps { disable } => {
                if self.privileged() {
                    self.regs.primask = disable;
                }
                1
            }
            Instruction::Hint(hint) => self.hint(hint),
            Instruction::BranchCond { cond, offset } => {
                if self.regs.flags.condition_passed(cond) {
                    self.regs.set_pc(pc.wrapping_add(4).wrapping_add_signed(offset));
                    2
                } else {
                    1
                }
            }
            Instruction::Branch { offset } => {
                self.regs.set_pc(pc.wrapping_add(4).wrapping_add_signed(offset));
                2
            }
            Instruction::Bl { offset } => {
                self.regs.write(LR, pc.wrapping_add(4) | 1);
                self.regs.set_pc(pc.wrapping_add(4).wrapping_add_signed(offset));
                3
            }
            Instruction::Svc { imm } => {
                tracing::debug!(target: "cpu", "svc #{imm} at {pc:#010x}");
                let svc_priority = self.bus.bus.irq.exception_priority(EXC_SVCALL);
                if svc_priority < self.execution_priority() {
                    self.bus.bus.irq.pending_svcall = true;
                } else {
                    tracing::warn!(target: "cpu", "svc at {pc:#010x} escalated to HardFault");
                    self.bus.bus.irq.pending_hardfault = true;
                }
                1
            }
            Instruction::Msr { sysm, rn } => {
                let value = self.operand(rn, pc);
                self.write_special(sysm, value);
                3
            }
            Instruction::Mrs { rd, sysm } => {
                let value = self.read_special(sysm);
                self.set_reg(rd, value);
                3
            }
            Instruction::Barrier(_) => 3,
            Instruction::Udf { .. } | Instruction::Bkpt { .. } => 0,
        }
    }

    fn hint(&mut self, hint: Hint) -> u64 {
        match hint {
            Hint::Nop | Hint::Yield => {}
            Hint::Wfi => self.waiting = true,
            Hint::Wfe => {
                if self.event_registered {
                    self.event_registered = false;
                } else {
                    self.waiting = true;
                }
            }
            Hint::Sev => self.event_registered = true,
        }
        if self.waiting {
            tracing::trace!(target: "cpu", "core asleep at {:#010x}", self.regs.pc());
        }
        if matches!(hint, Hint::Wfi | Hint::Wfe) { 2 } else { 1 }
    }

    fn read_special(&self, sysm: u8) -> u32 {
        match sysm {
            0..=7 => {
                let mut value = 0;
                if sysm & 1 != 0 {
                    value |= self.regs.ipsr & 0x3F;
                }
                if sysm & 4 == 0 {
                    value |= self.regs.flags.to_apsr();
                }
                value
            }
            sysm::MSP => self.regs.msp(),
            sysm::PSP => self.regs.psp(),
            sysm::PRIMASK => u32::from(self.regs.primask),
            sysm::CONTROL => self.regs.control(),
            _ => {
                tracing::warn!(target: "cpu", "mrs from unknown special register {sysm}");
                0
            }
        }
    }

    fn write_special(&mut self, sysm: u8, value: u32) {
        if sysm <= 7 {
            if sysm & 4 == 0 {
                self.regs.flags = crate::common::Flags::from_apsr(value);
            }
            return;
        }
        if !self.privileged() {
            tracing::debug!(target: "cpu", "unprivileged msr to special register {sysm} ignored");
            return;
        }
        match sysm {
            sysm::MSP => self.regs.set_msp(value),
            sysm::PSP => self.regs.set_psp(value),
            sysm::PRIMASK => self.regs.primask = value & 1 != 0,
            sysm::CONTROL => {
                self.regs.npriv = value & 1 != 0;
                if matches!(self.regs.mode(), ExecutionMode::Thread) {
                    let bank = if value & 2 != 0 { StackBank::Process } else { StackBank::Main };
                    self.regs.set_spsel(bank);
                }
            }
            _ => tracing::warn!(target: "cpu", "msr to unknown special register {sysm}"),
        }
    }

    fn record(&mut self, inst: &Instruction) {
        let stats = &mut self.stats;
        stats.instructions_retired += 1;
        match inst {
            Instruction::Load { .. } | Instruction::Pop { .. } | Instruction::Ldm { .. } => {
                stats.inst_load += 1;
            }
            Instruction::Store { .. } | Instruction::Push { .. } | Instruction::Stm { .. } => {
                stats.inst_store += 1;
            }
            Instruction::Bx { .. }
            | Instruction::Blx { .. }
            | Instruction::BranchCond { .. }
            | Instruction::Branch { .. }
            | Instruction::Bl { .. } => stats.inst_branch += 1,
            Instruction::Cps { .. }
            | Instruction::Hint(_)
            | Instruction::Svc { .. }
            | Instruction::Msr { .. }
            | Instruction::Mrs { .. }
            | Instruction::Barrier(_)
            | Instruction::Udf { .. }
            | Instruction::Bkpt { .. } => stats.inst_system += 1,
            _ => stats.inst_alu += 1,
        }
    }
}
