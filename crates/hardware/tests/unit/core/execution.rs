//! Instruction Execution Tests.
//!
//! Runs short Thumb programs from SRAM on a complete machine and checks registers,
//! flags, memory and the cycle cost reported by each step.

use crate::common::harness::{CODE_BASE, STACK_TOP, TestContext};
use crate::common::thumb::{self, alu, cond};
use picosim_core::common::SimError;
use picosim_core::common::reg::{LR, SP};
use picosim_core::core::arch::mode::StackBank;
use picosim_core::soc::builder::UART0_BASE;
use pretty_assertions::assert_eq;

/// Scratch data area well away from the code.
const DATA: u32 = 0x2000_1000;

// ─── Data Processing ─────────────────────────────────────────────────────────

#[test]
fn movs_and_adds_set_registers_and_flags() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 5),
        thumb::movs(1, 7),
        thumb::adds(2, 0, 1),
        thumb::movs(3, 0),
    ]);
    ctx.run(3);
    assert_eq!(ctx.get_reg(2), 12);
    assert!(!ctx.cpu().regs.flags.z);

    ctx.run(1);
    assert!(ctx.cpu().regs.flags.z);
    assert_eq!(ctx.pc(), CODE_BASE + 8);
}

#[test]
fn subs_sets_borrow() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 3),
        thumb::movs(1, 5),
        thumb::subs(2, 0, 1),
    ]);
    ctx.run(3);
    assert_eq!(ctx.get_reg(2), 0xFFFF_FFFE);
    let flags = ctx.cpu().regs.flags;
    assert!(flags.n && !flags.c && !flags.z);
}

#[test]
fn immediate_forms_update_rdn() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(4, 200),
        thumb::adds_imm8(4, 100),
        thumb::subs_imm8(4, 50),
        thumb::cmp_imm(4, 250),
    ]);
    ctx.run(4);
    assert_eq!(ctx.get_reg(4), 250);
    assert!(ctx.cpu().regs.flags.z);
}

#[test]
fn shifts_by_immediate() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 1),
        thumb::lsls_imm(1, 0, 31),
        thumb::lsrs_imm(2, 1, 0),
    ]);
    ctx.run(2);
    assert_eq!(ctx.get_reg(1), 0x8000_0000);
    assert!(ctx.cpu().regs.flags.n);
    ctx.run(1);
    assert_eq!(ctx.get_reg(2), 0);
    let flags = ctx.cpu().regs.flags;
    assert!(flags.z && flags.c);
}

#[test]
fn register_alu_group() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 6),
        thumb::movs(1, 7),
        thumb::alu_op(alu::MUL, 0, 1),
        thumb::movs(2, 0x0F),
        thumb::alu_op(alu::EOR, 2, 0),
        thumb::alu_op(alu::MVN, 3, 2),
    ]);
    ctx.run(3);
    assert_eq!(ctx.get_reg(0), 42);
    ctx.run(2);
    assert_eq!(ctx.get_reg(2), 42 ^ 0x0F);
    ctx.run(1);
    assert_eq!(ctx.get_reg(3), !(42u32 ^ 0x0F));
}

#[test]
fn adc_chains_a_64_bit_add() {
    // (0xFFFF_FFFF : 1) + (1 : 2) = (0 : 4)
    let mut ctx = TestContext::new().load_program(&[
        thumb::adds(0, 0, 2),
        thumb::alu_op(alu::ADC, 1, 3),
    ]);
    ctx.set_reg(0, 0xFFFF_FFFF);
    ctx.set_reg(1, 1);
    ctx.set_reg(2, 1);
    ctx.set_reg(3, 2);
    ctx.run(2);
    assert_eq!(ctx.get_reg(0), 0);
    assert_eq!(ctx.get_reg(1), 4);
}

#[test]
fn high_register_moves_and_adds_leave_flags() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(1, 9),
        thumb::movs(0, 0),
        thumb::mov_high(8, 1),
        thumb::add_high(8, 1),
        thumb::mov_high(2, 8),
    ]);
    ctx.run(5);
    assert_eq!(ctx.get_reg(8), 18);
    assert_eq!(ctx.get_reg(2), 18);
    assert!(ctx.cpu().regs.flags.z, "MOV/ADD high must not touch flags");
}

#[test]
fn extend_and_reverse() {
    let mut ctx = TestContext::new().load_program(&[thumb::sxtb(1, 0), thumb::rev(2, 0)]);
    ctx.set_reg(0, 0x1234_5680);
    ctx.run(2);
    assert_eq!(ctx.get_reg(1), 0xFFFF_FF80);
    assert_eq!(ctx.get_reg(2), 0x8056_3412);
}

// ─── Branches ────────────────────────────────────────────────────────────────

#[test]
fn conditional_branch_loop() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 3),
        thumb::adds_imm8(1, 2),
        thumb::subs_imm8(0, 1),
        thumb::b_cond(cond::NE, -8),
        thumb::NOP,
    ]);
    ctx.run(10);
    assert_eq!(ctx.get_reg(1), 6);
    assert_eq!(ctx.pc(), CODE_BASE + 8);
}

#[test]
fn taken_branch_costs_two_cycles() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::cmp_imm(0, 0),
        thumb::b_cond(cond::EQ, 0),
        thumb::b_cond(cond::NE, 0),
        thumb::NOP,
    ]);
    assert_eq!(ctx.step(), 1);
    assert_eq!(ctx.step(), 2);
    assert_eq!(ctx.pc(), CODE_BASE + 6);
}

#[test]
fn unconditional_branch_backwards() {
    let mut ctx = TestContext::new().load_program(&[thumb::NOP, thumb::NOP, thumb::b(-6)]);
    ctx.run(3);
    assert_eq!(ctx.pc(), CODE_BASE + 2);
}

#[test]
fn bl_and_bx_lr_call_and_return() {
    let [bl_hi, bl_lo] = thumb::bl(4);
    let mut ctx = TestContext::new().load_program(&[
        bl_hi,
        bl_lo,
        thumb::NOP,
        thumb::NOP,
        thumb::movs(0, 42),
        thumb::bx(14),
    ]);
    assert_eq!(ctx.step(), 3);
    assert_eq!(ctx.pc(), CODE_BASE + 8);
    assert_eq!(ctx.get_reg(LR), (CODE_BASE + 4) | 1);
    ctx.run(2);
    assert_eq!(ctx.get_reg(0), 42);
    assert_eq!(ctx.pc(), CODE_BASE + 4);
}

#[test]
fn blx_register_links_past_itself() {
    let mut ctx = TestContext::new().load_program(&[thumb::blx(3), thumb::NOP]);
    ctx.set_reg(3, (CODE_BASE + 0x40) | 1);
    ctx.run(1);
    assert_eq!(ctx.pc(), CODE_BASE + 0x40);
    assert_eq!(ctx.get_reg(LR), (CODE_BASE + 2) | 1);
}

// ─── Loads and Stores ────────────────────────────────────────────────────────

#[test]
fn literal_load_then_store_and_reload() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::ldr_lit(1, 4),
        thumb::movs(0, 0xAB),
        thumb::str_imm(0, 1, 4),
        thumb::ldrb_imm(2, 1, 4),
        0x1000,
        0x2000,
    ]);
    ctx.run(1);
    assert_eq!(ctx.get_reg(1), DATA);
    ctx.run(3);
    assert_eq!(ctx.bus().read32(DATA + 4), 0xAB);
    assert_eq!(ctx.get_reg(2), 0xAB);
}

#[test]
fn byte_store_only_touches_one_byte() {
    let program = [thumb::strb_imm(0, 1, 1), thumb::ldr_imm(2, 1, 0)];
    let mut ctx = TestContext::new().load_program(&program);
    ctx.bus().write32(DATA, 0x1122_3344);
    ctx.set_reg(0, 0xFFFF_FFAA);
    ctx.set_reg(1, DATA);
    ctx.run(2);
    assert_eq!(ctx.get_reg(2), 0x1122_AA44);
}

#[test]
fn signed_halfword_load_extends() {
    let mut ctx = TestContext::new().load_program(&[thumb::ldrsh_reg(0, 1, 2)]);
    ctx.bus().write16(DATA + 6, 0x8001);
    ctx.set_reg(1, DATA);
    ctx.set_reg(2, 6);
    ctx.run(1);
    assert_eq!(ctx.get_reg(0), 0xFFFF_8001);
}

#[test]
fn peripheral_access_pays_wait_states() {
    let program = [thumb::ldr_imm(0, 1, 0), thumb::str_imm(0, 2, 0)];
    let mut ctx = TestContext::new().load_program(&program);
    ctx.set_reg(1, UART0_BASE + 0x18);
    ctx.set_reg(2, DATA);
    assert_eq!(ctx.step(), 2 + 3);
    assert_eq!(ctx.step(), 2);
}

#[test]
fn push_and_pop_round_trip() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::push(0b11, true),
        thumb::movs(0, 0),
        thumb::movs(1, 0),
        thumb::pop(0b11, false),
    ]);
    ctx.set_reg(0, 1);
    ctx.set_reg(1, 2);
    ctx.set_reg(LR, 0x1234_5679);
    assert_eq!(ctx.step(), 4);
    let sp = ctx.get_reg(SP);
    assert_eq!(sp, STACK_TOP - 12);
    assert_eq!(ctx.bus().read32(sp), 1);
    assert_eq!(ctx.bus().read32(sp + 4), 2);
    assert_eq!(ctx.bus().read32(sp + 8), 0x1234_5679);

    ctx.run(3);
    assert_eq!((ctx.get_reg(0), ctx.get_reg(1)), (1, 2));
    assert_eq!(ctx.get_reg(SP), STACK_TOP - 4);
}

#[test]
fn pop_pc_branches() {
    let mut ctx = TestContext::new().load_program(&[thumb::push(0, true), thumb::pop(0, true)]);
    ctx.set_reg(LR, (CODE_BASE + 0x20) | 1);
    ctx.run(1);
    assert_eq!(ctx.step(), 4);
    assert_eq!(ctx.pc(), CODE_BASE + 0x20);
    assert_eq!(ctx.get_reg(SP), STACK_TOP);
}

#[test]
fn stm_and_ldm_with_writeback() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::stm(0, 0b0110),
        thumb::ldm(4, 0b1100_0000),
        thumb::ldm(5, 0b0010_0001),
    ]);
    ctx.set_reg(0, DATA);
    ctx.set_reg(1, 11);
    ctx.set_reg(2, 22);
    ctx.set_reg(4, DATA);
    ctx.set_reg(5, DATA);

    ctx.run(1);
    assert_eq!(ctx.get_reg(0), DATA + 8);
    ctx.run(1);
    assert_eq!((ctx.get_reg(6), ctx.get_reg(7)), (11, 22));
    assert_eq!(ctx.get_reg(4), DATA + 8);

    // Base in the list: the loaded value wins over writeback.
    ctx.run(1);
    assert_eq!(ctx.get_reg(0), 11);
    assert_eq!(ctx.get_reg(5), 22);
}

// ─── System ──────────────────────────────────────────────────────────────────

#[test]
fn msr_and_mrs_primask() {
    let [msr_hi, msr_lo] = thumb::msr(16, 0);
    let [mrs_hi, mrs_lo] = thumb::mrs(1, 16);
    let program = [thumb::movs(0, 1), msr_hi, msr_lo, mrs_hi, mrs_lo];
    let mut ctx = TestContext::new().load_program(&program);
    ctx.run(2);
    assert!(ctx.cpu().regs.primask);
    ctx.run(1);
    assert_eq!(ctx.get_reg(1), 1);
}

#[test]
fn control_spsel_switches_to_process_stack() {
    let [psp_hi, psp_lo] = thumb::msr(9, 2);
    let [ctl_hi, ctl_lo] = thumb::msr(20, 0);
    let program = [psp_hi, psp_lo, thumb::movs(0, 2), ctl_hi, ctl_lo];
    let mut ctx = TestContext::new().load_program(&program);
    ctx.set_reg(2, 0x2003_0000);
    ctx.run(3);
    let regs = &ctx.cpu().regs;
    assert_eq!(regs.active_bank(), StackBank::Process);
    assert_eq!(regs.sp(), 0x2003_0000);
    assert_eq!(regs.msp(), STACK_TOP);
}

#[test]
fn unprivileged_thread_cannot_mask_interrupts() {
    let [ctl_hi, ctl_lo] = thumb::msr(20, 0);
    let [pm_hi, pm_lo] = thumb::msr(16, 1);
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 1),
        ctl_hi,
        ctl_lo,
        thumb::CPSID,
        thumb::movs(1, 1),
        pm_hi,
        pm_lo,
    ]);
    ctx.run(5);
    assert!(ctx.cpu().regs.npriv);
    assert!(!ctx.cpu().privileged());
    assert!(!ctx.cpu().regs.primask);
}

#[test]
fn cps_toggles_primask() {
    let mut ctx = TestContext::new().load_program(&[thumb::CPSID, thumb::CPSIE]);
    ctx.run(1);
    assert!(ctx.cpu().regs.primask);
    ctx.run(1);
    assert!(!ctx.cpu().regs.primask);
}

#[test]
fn barrier_is_a_wide_nop() {
    let mut ctx = TestContext::new().load_program(&[thumb::DSB[0], thumb::DSB[1], thumb::NOP]);
    assert_eq!(ctx.step(), 3);
    assert_eq!(ctx.pc(), CODE_BASE + 4);
}

#[test]
fn sev_makes_next_wfe_fall_through() {
    let mut ctx = TestContext::new().load_program(&[thumb::SEV, thumb::WFE, thumb::WFE]);
    ctx.run(2);
    assert!(!ctx.cpu().is_waiting());
    ctx.run(1);
    assert!(ctx.cpu().is_waiting());
}

#[test]
fn wfi_puts_core_to_sleep() {
    let mut ctx = TestContext::new().load_program(&[thumb::WFI, thumb::NOP]);
    assert_eq!(ctx.step(), 2);
    assert!(ctx.cpu().is_waiting());
    assert_eq!(ctx.step(), 0);
    assert_eq!(ctx.pc(), CODE_BASE + 2);
}

// ─── Faults ──────────────────────────────────────────────────────────────────

#[test]
fn udf_is_undefined_and_leaves_pc() {
    let mut ctx = TestContext::new().load_program(&[thumb::udf(5)]);
    let err = ctx.sim.step().unwrap_err();
    assert!(matches!(
        err,
        SimError::UndefinedInstruction { pc, opcode: 0xDE05 } if pc == CODE_BASE
    ));
    assert_eq!(ctx.pc(), CODE_BASE);
}

#[test]
fn bkpt_reports_immediate() {
    let mut ctx = TestContext::new().load_program(&[thumb::NOP, thumb::bkpt(0x42)]);
    ctx.run(1);
    let err = ctx.sim.step().unwrap_err();
    assert!(matches!(err, SimError::Breakpoint { imm: 0x42, .. }));
    assert_eq!(ctx.pc(), CODE_BASE + 2);
    assert!(err.to_string().contains("breakpoint #66"));
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[test]
fn retired_instructions_are_classified() {
    let mut ctx = TestContext::new().load_program(&[
        thumb::movs(0, 1),
        thumb::str_imm(0, 1, 0),
        thumb::ldr_imm(2, 1, 0),
        thumb::b(-2),
    ]);
    ctx.set_reg(1, DATA);
    ctx.run(4);
    let stats = &ctx.cpu().stats;
    assert_eq!(stats.instructions_retired, 4);
    assert_eq!(stats.inst_alu, 1);
    assert_eq!(stats.inst_store, 1);
    assert_eq!(stats.inst_load, 1);
    assert_eq!(stats.inst_branch, 1);
    assert_eq!(stats.cycles, ctx.cpu().cycles);
    assert_eq!(stats.cycles, 1 + 2 + 2 + 2);
}
