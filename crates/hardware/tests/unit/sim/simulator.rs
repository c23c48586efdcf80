//! Simulator Driver Tests.
//!
//! Programs here are tiny loops in SRAM; the interesting part is how the driver maps
//! cycles onto virtual time and reacts to sleep and reset requests.

use picosim_core::RunOutcome;
use picosim_core::common::SimError;
use picosim_core::config::Config;
use pretty_assertions::assert_eq;

use crate::common::harness::{CODE_BASE, STACK_TOP, TestContext, VECTOR_BASE};
use crate::common::thumb::{WFI, b, bkpt, ldr_lit, movs, str_imm};

const WATCHDOG_BASE: u32 = 0x4005_8000;
const AIRCR: u32 = 0xE000_ED0C;

/// Arms the watchdog to expire 50 µs from now.
fn arm_watchdog(ctx: &mut TestContext) {
    let bus = ctx.bus();
    bus.write32(WATCHDOG_BASE + 0x2C, 1 << 9 | 12);
    bus.write32(WATCHDOG_BASE + 0x04, 100);
    bus.write32(WATCHDOG_BASE, 1 << 30);
}

/// `WFI` followed by a branch back to it.
const SLEEP_LOOP: [u16; 2] = [WFI, b(-6)];

// ─── Timing ──────────────────────────────────────────────────────────────────

#[test]
fn step_advances_clock_by_cycle_time() {
    let mut ctx = TestContext::new().load_program(&[movs(0, 1), movs(1, 2)]);
    let cycles = ctx.step();
    assert_eq!(cycles, 1);
    assert_eq!(ctx.sim.now(), 8);
    let _ = ctx.step();
    assert_eq!(ctx.sim.now(), 16);
}

#[test]
fn run_until_reaches_deadline() {
    let mut ctx = TestContext::new().load_program(&[b(-4)]);
    assert_eq!(ctx.sim.run_until(10_000).unwrap(), RunOutcome::BatchComplete);
    assert!(ctx.sim.now() >= 10_000);
    assert!(ctx.cpu().stats.instructions_retired > 0);
    assert_eq!(ctx.cpu().stats.inst_branch, ctx.cpu().stats.instructions_retired);
}

#[test]
fn batch_runs_configured_step_count() {
    let mut config = Config::default();
    config.simulation.batch_steps = 10;
    let mut ctx = TestContext::with_config(&config).load_program(&[b(-4)]);
    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::BatchComplete);
    assert_eq!(ctx.cpu().stats.instructions_retired, 10);
}

// ─── Stop and Idle ───────────────────────────────────────────────────────────

#[test]
fn stop_flag_ends_batch() {
    let mut ctx = TestContext::new().load_program(&[b(-4)]);
    ctx.sim.stop();
    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::Stopped);
    assert_eq!(ctx.cpu().stats.instructions_retired, 0);

    let handle = ctx.sim.stop_handle();
    handle.store(true, std::sync::atomic::Ordering::Release);
    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::Stopped);
}

#[test]
fn sleeping_core_without_alarms_is_idle() {
    let mut ctx = TestContext::new().load_program(&SLEEP_LOOP);
    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::Idle);
    assert!(ctx.cpu().is_waiting());
    assert_eq!(ctx.pc(), CODE_BASE + 2);
}

#[test]
fn sleep_skips_to_next_alarm() {
    let mut config = Config::default();
    config.simulation.watchdog_reset = false;
    let mut ctx = TestContext::with_config(&config).load_program(&SLEEP_LOOP);
    arm_watchdog(&mut ctx);

    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::Idle);
    assert!(ctx.sim.now() >= 50_000);
    assert!(ctx.cpu().stats.wait_nanos >= 49_000);
    assert_eq!(ctx.cpu().stats.resets, 0);
}

// ─── Resets ──────────────────────────────────────────────────────────────────

#[test]
fn watchdog_expiry_resets_machine() {
    let mut ctx = TestContext::new().load_program(&SLEEP_LOOP);
    ctx.bus().write32(0x2000_1000, 0x1234_5678);
    arm_watchdog(&mut ctx);

    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::WatchdogReset);
    assert_eq!(ctx.cpu().stats.resets, 1);
    assert_eq!(ctx.bus().read32(0x2000_1000), 0x1234_5678);
    assert_eq!(ctx.bus().read32(WATCHDOG_BASE) & (1 << 30), 0);
}

#[test]
fn sysresetreq_resets_machine() {
    // ldr r0, =AIRCR; ldr r1, =key|SYSRESETREQ; str r1, [r0]; b .
    let program = [
        ldr_lit(0, 4),
        ldr_lit(1, 8),
        str_imm(1, 0, 0),
        b(-4),
        (AIRCR & 0xFFFF) as u16,
        (AIRCR >> 16) as u16,
        0x0004,
        0x05FA,
    ];
    let mut ctx = TestContext::new().load_program(&program);
    assert_eq!(ctx.sim.run_batch().unwrap(), RunOutcome::SystemReset);
    assert_eq!(ctx.cpu().stats.resets, 1);
    assert_eq!(ctx.cpu().stats.inst_store, 1);
}

#[test]
fn reset_reloads_core_from_vector_table() {
    let mut config = Config::default();
    config.boot.vector_table = VECTOR_BASE;
    let mut ctx = TestContext::with_config(&config);
    ctx.bus().write32(VECTOR_BASE, STACK_TOP - 0x100);
    ctx.bus().write32(VECTOR_BASE + 4, CODE_BASE + 0x41);
    ctx.set_reg(0, 99);

    ctx.sim.reset();
    assert_eq!(ctx.cpu().regs.msp(), STACK_TOP - 0x100);
    assert_eq!(ctx.pc(), CODE_BASE + 0x40);
    assert_eq!(ctx.get_reg(0), 0);
    assert_eq!(ctx.cpu().stats.resets, 1);
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn breakpoint_stops_at_faulting_pc() {
    let mut ctx = TestContext::new().load_program(&[movs(0, 1), bkpt(3)]);
    match ctx.sim.run_batch() {
        Err(SimError::Breakpoint { pc, imm }) => {
            assert_eq!(pc, CODE_BASE + 2);
            assert_eq!(imm, 3);
        }
        other => panic!("expected breakpoint, got {other:?}"),
    }
    assert_eq!(ctx.pc(), CODE_BASE + 2);
}
