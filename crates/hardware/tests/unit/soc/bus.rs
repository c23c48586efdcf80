//! System Bus Tests.
//!
//! Address decoding across the memory regions, the peripheral registry and its atomic
//! aliases, wait-state accounting and alarm routing.

use std::sync::{Arc, Mutex};

use picosim_core::config::Config;
use picosim_core::soc::builder::{CLOCKS_BASE, RESETS_BASE, SSI_BASE, TIMER_BASE, WATCHDOG_BASE};
use picosim_core::soc::{Bus, System};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::init_tracing;

const SCRATCH0: u32 = WATCHDOG_BASE + 0x0C;

fn system() -> System {
    init_tracing();
    System::new(&Config::default())
}

// ─── Memory Regions ──────────────────────────────────────────────────────────

#[test]
fn sram_is_little_endian() {
    let mut bus = Bus::new(125e6);
    bus.write32(0x2000_0100, 0x1122_3344);
    assert_eq!(bus.read8(0x2000_0100), 0x44);
    assert_eq!(bus.read8(0x2000_0103), 0x11);
    assert_eq!(bus.read16(0x2000_0102), 0x1122);

    bus.write16(0x2000_0100, 0xBEEF);
    assert_eq!(bus.read32(0x2000_0100), 0x1122_BEEF);
    bus.write8(0x2000_0103, 0x99);
    assert_eq!(bus.read32(0x2000_0100), 0x9922_BEEF);
}

#[test]
fn flash_starts_erased() {
    let mut bus = Bus::new(125e6);
    assert_eq!(bus.read32(0x1000_0000), 0xFFFF_FFFF);
    assert_eq!(bus.read8(0x1012_3457), 0xFF);
}

#[rstest]
#[case(0x1100_0040)]
#[case(0x1200_0040)]
#[case(0x1300_0040)]
fn flash_windows_mirror_one_array(#[case] alias: u32) {
    let mut bus = Bus::new(125e6);
    bus.write32(0x1000_0040, 0xCAFE_F00D);
    assert_eq!(bus.read32(alias), 0xCAFE_F00D);
}

#[test]
fn unmapped_reads_return_all_ones() {
    let mut bus = Bus::new(125e6);
    assert_eq!(bus.read32(0x4003_4000), 0xFFFF_FFFF);
    bus.write32(0x4003_4000, 0x1234);
    assert_eq!(bus.read32(0x4003_4000), 0xFFFF_FFFF);
}

#[test]
fn dpram_writes_notify_hook() {
    let mut bus = Bus::new(125e6);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.set_dpram_hook(Box::new(move |offset, word| sink.lock().unwrap().push((offset, word))));

    bus.write32(0x5010_0010, 5);
    bus.write8(0x5010_0015, 0xAA);
    assert_eq!(bus.read32(0x5010_0010), 5);
    assert_eq!(*seen.lock().unwrap(), vec![(0x10, 5), (0x14, 0x0000_AA00)]);
}

// ─── Peripherals ─────────────────────────────────────────────────────────────

#[test]
fn chip_identification_is_readable() {
    let mut sys = system();
    assert_eq!(sys.bus.read32(0x4000_0000), 0x1000_2927);
    assert_eq!(sys.bus.read32(0xE000_ED00), 0x410C_C601);
}

#[test]
fn oscillator_stubs_read_as_ready() {
    let mut sys = system();
    assert_eq!(sys.bus.read32(0x4002_4004), 0xFFFF_FFFF);
    assert_eq!(sys.bus.read32(0x4004_4000), 0);
}

#[test]
fn atomic_aliases_modify_register() {
    let mut sys = system();
    sys.bus.write32(SCRATCH0, 0xF0);
    sys.bus.write32(SCRATCH0 + 0x2000, 0x0F);
    assert_eq!(sys.bus.read32(SCRATCH0), 0xFF);
    sys.bus.write32(SCRATCH0 + 0x3000, 0x3C);
    assert_eq!(sys.bus.read32(SCRATCH0), 0xC3);
    sys.bus.write32(SCRATCH0 + 0x1000, 0xFF);
    assert_eq!(sys.bus.read32(SCRATCH0), 0x3C);
}

#[test]
fn narrow_register_writes_replicate_lanes() {
    let mut sys = system();
    sys.bus.write8(SCRATCH0 + 1, 0xAB);
    assert_eq!(sys.bus.read32(SCRATCH0), 0xABAB_ABAB);
    sys.bus.write16(SCRATCH0 + 2, 0x1234);
    assert_eq!(sys.bus.read32(SCRATCH0), 0x1234_1234);
    assert_eq!(sys.bus.read16(SCRATCH0 + 2), 0x1234);
}

#[test]
fn sio_divider_through_bus() {
    let mut sys = system();
    sys.bus.write32(0xD000_0060, 100);
    sys.bus.write32(0xD000_0064, 7);
    assert_eq!(sys.bus.read32(0xD000_0070), 14);
    assert_eq!(sys.bus.read32(0xD000_0074), 2);
}

#[rstest]
#[case(0x2000_0000, false, 0)]
#[case(0x1000_0000, false, 0)]
#[case(0x4003_4000, false, 3)]
#[case(0x4003_4000, true, 4)]
#[case(0x5020_0000, true, 1)]
#[case(0xD000_0000, false, 0)]
fn wait_states_by_region(#[case] address: u32, #[case] write: bool, #[case] cycles: u64) {
    assert_eq!(Bus::cycles_io(address, write), cycles);
}

#[test]
fn boot_blocks_report_ready() {
    let mut sys = system();
    assert_eq!(sys.bus.read32(RESETS_BASE), 0x01FF_FFFF);
    assert_eq!(sys.bus.read32(RESETS_BASE + 0x8), 0);
    sys.bus.write32(RESETS_BASE + 0x3000, 1 << 5);
    assert_eq!(sys.bus.read32(RESETS_BASE + 0x8), 1 << 5);

    // clk_ref on the crystal, clk_sys on the aux mux.
    sys.bus.write32(CLOCKS_BASE + 0x30, 2);
    sys.bus.write32(CLOCKS_BASE + 0x3C, 1);
    assert_eq!(sys.bus.read32(CLOCKS_BASE + 0x38), 1 << 2);
    assert_eq!(sys.bus.read32(CLOCKS_BASE + 0x44), 1 << 1);
    assert_eq!(sys.bus.read32(CLOCKS_BASE + 0x98), 1 << 4);

    assert_eq!(sys.bus.read32(SSI_BASE + 0x28), 0x6);
    sys.bus.write32(SSI_BASE + 0x60, 0x9F);
    assert_eq!(sys.bus.read32(SSI_BASE + 0x28), 0xE);
    assert_eq!(sys.bus.read32(SSI_BASE + 0x60), 0);
    assert_eq!(sys.bus.read32(SSI_BASE + 0x24), 0);
}

// ─── Time ────────────────────────────────────────────────────────────────────

#[test]
fn alarms_are_routed_to_their_owner() {
    let mut sys = system();
    sys.bus.write32(TIMER_BASE + 0x38, 1);
    sys.bus.write32(TIMER_BASE + 0x10, 10);
    sys.bus.advance_clock(9_000);
    assert!(!sys.bus.irq.line_level(0));
    sys.bus.advance_clock(1_000);
    assert!(sys.bus.irq.line_level(0));
    assert_eq!(sys.bus.read32(TIMER_BASE + 0x34), 1);
    assert_eq!(sys.bus.clock.now(), 10_000);
}

#[test]
fn reset_clears_registers_but_keeps_memory() {
    let mut sys = system();
    sys.bus.write32(0x2000_0000, 0xDEAD_BEEF);
    sys.bus.write32(0xE000_E100, 0x10);
    sys.bus.write32(0x4000_4000, 7);
    sys.bus.write32(TIMER_BASE + 0x10, 10);

    sys.reset();
    assert_eq!(sys.bus.read32(0x2000_0000), 0xDEAD_BEEF);
    assert_eq!(sys.bus.irq.enabled, 0);
    assert_eq!(sys.bus.read32(0x4000_4000), 0);
    assert_eq!(sys.bus.read32(TIMER_BASE + 0x20), 0);
    assert!(!sys.bus.clock.has_pending());
}
