//! Private Peripheral Bus Tests.
//!
//! SysTick timing and the NVIC/SCB register views of the interrupt controller.

use picosim_core::soc::devices::Ppb;
use picosim_core::soc::traits::Peripheral;
use pretty_assertions::assert_eq;

use crate::common::devices::DeviceBench;

const SYST_CSR: u32 = 0x010;
const SYST_RVR: u32 = 0x014;
const SYST_CVR: u32 = 0x018;
const NVIC_ISER: u32 = 0x100;
const NVIC_ICER: u32 = 0x180;
const NVIC_ISPR: u32 = 0x200;
const NVIC_ICPR: u32 = 0x280;
const NVIC_IPR0: u32 = 0x400;
const CPUID: u32 = 0xD00;
const ICSR: u32 = 0xD04;
const VTOR: u32 = 0xD08;
const AIRCR: u32 = 0xD0C;
const SCR: u32 = 0xD10;
const SHPR3: u32 = 0xD20;
const SHCSR: u32 = 0xD24;

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;
const CSR_COUNTFLAG: u32 = 1 << 16;

fn ppb(bench: &mut DeviceBench) -> Ppb {
    Ppb::new(&mut bench.clock, 125e6)
}

/// SysTick reloading from 999 on the processor clock: one period is 8 µs.
fn systick(bench: &mut DeviceBench, csr: u32) -> Ppb {
    let mut ppb = ppb(bench);
    bench.write(&mut ppb, SYST_RVR, 999);
    bench.write(&mut ppb, SYST_CVR, 0);
    bench.write(&mut ppb, SYST_CSR, csr);
    ppb
}

// ─── SysTick ─────────────────────────────────────────────────────────────────

#[test]
fn systick_pends_exception_each_period() {
    let mut bench = DeviceBench::new();
    let mut ppb = systick(&mut bench, CSR_ENABLE | CSR_TICKINT | CSR_CLKSOURCE);
    bench.advance(&mut ppb, 7_900);
    assert!(!bench.irq.pending_systick);
    bench.advance(&mut ppb, 200);
    assert!(bench.irq.pending_systick);

    bench.irq.pending_systick = false;
    bench.advance(&mut ppb, 8_000);
    assert!(bench.irq.pending_systick);
}

#[test]
fn countdown_reloads_from_rvr() {
    let mut bench = DeviceBench::new();
    let mut ppb = systick(&mut bench, CSR_ENABLE | CSR_CLKSOURCE);
    bench.advance(&mut ppb, 8);
    assert_eq!(bench.read(&mut ppb, SYST_CVR), 999);
    bench.advance(&mut ppb, 80);
    assert_eq!(ppb.systick_value(&bench.clock), 989);
}

#[test]
fn countflag_clears_on_read() {
    let mut bench = DeviceBench::new();
    let mut ppb = systick(&mut bench, CSR_ENABLE | CSR_CLKSOURCE);
    bench.advance(&mut ppb, 8_100);
    assert!(!bench.irq.pending_systick);
    let csr = bench.read(&mut ppb, SYST_CSR);
    assert_eq!(csr, CSR_COUNTFLAG | CSR_ENABLE | CSR_CLKSOURCE);
    assert_eq!(bench.read(&mut ppb, SYST_CSR) & CSR_COUNTFLAG, 0);
}

#[test]
fn reference_clock_runs_at_one_megahertz() {
    let mut bench = DeviceBench::new();
    let mut ppb = systick(&mut bench, CSR_ENABLE | CSR_TICKINT);
    bench.advance(&mut ppb, 999_000);
    assert!(!bench.irq.pending_systick);
    bench.advance(&mut ppb, 2_000);
    assert!(bench.irq.pending_systick);
}

#[test]
fn clearing_current_value_restarts_full_period() {
    let mut bench = DeviceBench::new();
    let mut ppb = systick(&mut bench, CSR_ENABLE | CSR_TICKINT | CSR_CLKSOURCE);
    bench.advance(&mut ppb, 3_000);
    bench.write(&mut ppb, SYST_CVR, 0);
    bench.advance(&mut ppb, 7_900);
    assert!(!bench.irq.pending_systick);
    bench.advance(&mut ppb, 200);
    assert!(bench.irq.pending_systick);
}

#[test]
fn zero_reload_stops_systick() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, SYST_CSR, CSR_ENABLE | CSR_TICKINT | CSR_CLKSOURCE);
    bench.advance(&mut ppb, 1_000_000);
    assert!(!bench.irq.pending_systick);
    assert!(!bench.clock.has_pending());
}

// ─── NVIC ────────────────────────────────────────────────────────────────────

#[test]
fn enable_and_pending_registers() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, NVIC_ISER, 0b1010);
    bench.write(&mut ppb, NVIC_ICER, 0b0010);
    assert_eq!(bench.read(&mut ppb, NVIC_ISER), 0b1000);
    assert_eq!(bench.irq.enabled, 0b1000);

    bench.write(&mut ppb, NVIC_ISPR, 0b1100);
    bench.write(&mut ppb, NVIC_ICPR, 0b0100);
    assert_eq!(bench.read(&mut ppb, NVIC_ICPR), 0b1000);
}

#[test]
fn priority_registers_keep_top_two_bits() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, NVIC_IPR0 + 4, 0xFF00_40C0);
    assert_eq!(bench.irq.irq_priority(4), 3);
    assert_eq!(bench.irq.irq_priority(5), 1);
    assert_eq!(bench.irq.irq_priority(6), 0);
    assert_eq!(bench.irq.irq_priority(7), 3);
    assert_eq!(bench.read(&mut ppb, NVIC_IPR0 + 4), 0xC000_40C0);
}

// ─── SCB ─────────────────────────────────────────────────────────────────────

#[test]
fn cpuid_identifies_cortex_m0plus() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    assert_eq!(bench.read(&mut ppb, CPUID), 0x410C_C601);
}

#[test]
fn icsr_sets_and_reports_pending_exceptions() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, ICSR, 1 << 28 | 1 << 26);
    assert!(bench.irq.pending_pendsv);
    assert!(bench.irq.pending_systick);

    let icsr = bench.read(&mut ppb, ICSR);
    assert_eq!(icsr & (1 << 28 | 1 << 26), 1 << 28 | 1 << 26);
    assert_eq!((icsr >> 12) & 0x1FF, 14);

    bench.write(&mut ppb, ICSR, 1 << 27);
    assert!(!bench.irq.pending_pendsv);
}

#[test]
fn icsr_reports_pending_irq() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.irq.set_interrupt(5, true);
    let icsr = bench.read(&mut ppb, ICSR);
    assert_eq!((icsr >> 12) & 0x1FF, 16 + 5);
    assert_eq!(icsr & 1 << 22, 0);

    bench.write(&mut ppb, NVIC_ISER, 1 << 5);
    assert_ne!(bench.read(&mut ppb, ICSR) & 1 << 22, 0);
}

#[test]
fn vtor_is_256_byte_aligned() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, VTOR, 0x2000_4080);
    assert_eq!(bench.read(&mut ppb, VTOR), 0x2000_4000);
}

#[test]
fn aircr_reset_needs_vector_key() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, AIRCR, 0x0000_0004);
    assert!(!bench.events.reset_requested);
    bench.write(&mut ppb, AIRCR, 0x05FA_0004);
    assert!(bench.events.reset_requested);
    assert_eq!(bench.read(&mut ppb, AIRCR), 0xFA05_0000);
}

#[test]
fn scr_and_handler_priorities() {
    let mut bench = DeviceBench::new();
    let mut ppb = ppb(&mut bench);
    bench.write(&mut ppb, SCR, 0xFF);
    assert_eq!(bench.read(&mut ppb, SCR), 0x16);

    bench.write(&mut ppb, SHPR3, 0xFFFF_FFFF);
    assert_eq!(bench.read(&mut ppb, SHPR3), 0xC0C0_0000);
    assert_eq!(bench.irq.exception_priority(14), 3);
    assert_eq!(bench.irq.exception_priority(15), 3);

    bench.write(&mut ppb, SHCSR, 1 << 15);
    assert!(bench.irq.pending_svcall);
}

#[test]
fn reset_clears_interrupt_state() {
    let mut bench = DeviceBench::new();
    let mut ppb = systick(&mut bench, CSR_ENABLE | CSR_TICKINT);
    bench.write(&mut ppb, NVIC_ISER, 0xFF);
    bench.write(&mut ppb, VTOR, 0x1000_0100);

    let mut ctx = bench.ctx();
    ppb.reset(&mut ctx);
    assert_eq!(bench.irq.enabled, 0);
    assert_eq!(bench.irq.vtor, 0);
    assert_eq!(bench.read(&mut ppb, SYST_RVR), 0);
    assert!(!bench.clock.has_pending());
}
