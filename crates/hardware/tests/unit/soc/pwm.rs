//! PWM Tests.
//!
//! The block runs at 1 MHz here so one counter tick is one microsecond.

use std::sync::{Arc, Mutex};

use picosim_core::soc::devices::{Channel, Pwm};
use pretty_assertions::assert_eq;

use crate::common::devices::DeviceBench;

const CSR: u32 = 0x00;
const DIV: u32 = 0x04;
const CTR: u32 = 0x08;
const CC: u32 = 0x0C;
const TOP: u32 = 0x10;
/// Slice 1 register block.
const SLICE1: u32 = 0x14;
const EN: u32 = 0xA0;
const INTR: u32 = 0xA4;
const INTE: u32 = 0xA8;
const INTS: u32 = 0xB0;

const CSR_EN: u32 = 1 << 0;
const CSR_PH_CORRECT: u32 = 1 << 1;
const CSR_A_INV: u32 = 1 << 2;
const DIVMODE_RISE: u32 = 2 << 4;

const IRQ: u32 = 4;
const MICRO: u64 = 1_000;

fn pwm(bench: &mut DeviceBench) -> Pwm {
    Pwm::new(&mut bench.clock, IRQ, 1e6)
}

/// Slice 0 with a period of ten ticks and channel A high for three.
fn running(bench: &mut DeviceBench) -> Pwm {
    let mut pwm = pwm(bench);
    bench.write(&mut pwm, TOP, 9);
    bench.write(&mut pwm, CC, 3);
    bench.write(&mut pwm, CSR, CSR_EN);
    pwm
}

// ─── Counting ────────────────────────────────────────────────────────────────

#[test]
fn counter_wraps_after_top() {
    let mut bench = DeviceBench::new();
    let mut pwm = running(&mut bench);
    bench.advance(&mut pwm, 7 * MICRO);
    assert_eq!(bench.read(&mut pwm, CTR), 7);
    bench.advance(&mut pwm, 5 * MICRO);
    assert_eq!(bench.read(&mut pwm, CTR), 2);
}

#[test]
fn disabled_slice_holds_counter() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, CTR, 40);
    bench.advance(&mut pwm, 100 * MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 40);
    assert_eq!(bench.read(&mut pwm, EN), 0);
}

#[test]
fn fractional_divider_slows_counter() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, DIV, 2 << 4 | 8);
    bench.write(&mut pwm, CSR, CSR_EN);
    bench.advance(&mut pwm, 25 * MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 10);
}

#[test]
fn phase_correct_counts_up_and_down() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, TOP, 4);
    bench.write(&mut pwm, CSR, CSR_EN | CSR_PH_CORRECT);
    bench.advance(&mut pwm, 6 * MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 2);
}

#[test]
fn enable_register_mirrors_slices() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, EN, 0b101);
    assert_eq!(bench.read(&mut pwm, CSR) & CSR_EN, CSR_EN);
    assert_eq!(bench.read(&mut pwm, SLICE1 + CSR) & CSR_EN, 0);
    assert_eq!(bench.read(&mut pwm, EN), 0b101);
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

#[test]
fn channel_a_is_high_below_compare() {
    let mut bench = DeviceBench::new();
    let mut pwm = running(&mut bench);
    assert!(pwm.output(0, Channel::A));
    assert!(!pwm.output(0, Channel::B));

    bench.advance(&mut pwm, 5 * MICRO);
    assert!(!pwm.output(0, Channel::A));
    bench.advance(&mut pwm, 5 * MICRO);
    assert!(pwm.output(0, Channel::A));
}

#[test]
fn inverted_output_flips_level() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, TOP, 9);
    bench.write(&mut pwm, CC, 3);
    bench.write(&mut pwm, CSR, CSR_EN | CSR_A_INV);
    assert!(!pwm.output(0, Channel::A));
}

#[test]
fn output_hook_sees_each_edge() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    let edges = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&edges);
    pwm.set_on_output(Box::new(move |slice, channel, level| {
        sink.lock().unwrap().push((slice, channel, level));
    }));
    bench.write(&mut pwm, TOP, 9);
    bench.write(&mut pwm, CC, 3);
    bench.write(&mut pwm, CSR, CSR_EN);
    bench.advance(&mut pwm, 10 * MICRO);

    let a_edges: Vec<bool> = edges
        .lock()
        .unwrap()
        .iter()
        .filter(|(slice, channel, _)| *slice == 0 && *channel == Channel::A)
        .map(|&(_, _, level)| level)
        .collect();
    assert_eq!(a_edges, vec![true, false, true]);
}

#[test]
fn millisecond_period_crosses_compare_a_once() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, TOP, 999);
    bench.write(&mut pwm, CC, 250);
    bench.write(&mut pwm, CSR, CSR_EN);
    assert!(pwm.output(0, Channel::A));

    let edges = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&edges);
    pwm.set_on_output(Box::new(move |slice, channel, level| {
        if slice == 0 && channel == Channel::A {
            sink.lock().unwrap().push(level);
        }
    }));

    bench.advance(&mut pwm, 999_999);
    assert_eq!(*edges.lock().unwrap(), vec![false]);
    assert!(!pwm.output(0, Channel::A));

    // The wrap lands exactly on the end of the next advance and fires within it.
    bench.advance(&mut pwm, 1);
    assert_eq!(*edges.lock().unwrap(), vec![false, true]);
    assert_eq!(bench.read(&mut pwm, CTR), 0);
}

#[test]
fn millisecond_advance_includes_wrap_on_boundary() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, TOP, 999);
    bench.write(&mut pwm, CC, 250);
    bench.write(&mut pwm, CSR, CSR_EN);
    let edges = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&edges);
    pwm.set_on_output(Box::new(move |_, channel, level| {
        if channel == Channel::A {
            sink.lock().unwrap().push(level);
        }
    }));

    bench.advance(&mut pwm, 1_000_000);
    assert_eq!(*edges.lock().unwrap(), vec![false, true]);
    assert_eq!(bench.read(&mut pwm, INTR), 1);
}

// ─── Double Buffering ────────────────────────────────────────────────────────

#[test]
fn top_written_while_running_applies_at_wrap() {
    let mut bench = DeviceBench::new();
    let mut pwm = running(&mut bench);
    bench.write(&mut pwm, TOP, 4);
    assert_eq!(bench.read(&mut pwm, TOP), 4);

    bench.advance(&mut pwm, 9 * MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 9);
    bench.advance(&mut pwm, 5 * MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 4);
    bench.advance(&mut pwm, MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 0);
}

#[test]
fn compare_written_while_running_applies_at_wrap() {
    let mut bench = DeviceBench::new();
    let mut pwm = running(&mut bench);
    bench.write(&mut pwm, CC, 6);
    bench.advance(&mut pwm, 4 * MICRO);
    assert!(!pwm.output(0, Channel::A));

    bench.advance(&mut pwm, 11 * MICRO);
    assert!(pwm.output(0, Channel::A));
}

// ─── Interrupts ──────────────────────────────────────────────────────────────

#[test]
fn wrap_raises_masked_interrupt() {
    let mut bench = DeviceBench::new();
    let mut pwm = running(&mut bench);
    bench.write(&mut pwm, INTE, 1);
    bench.advance(&mut pwm, 9 * MICRO);
    assert!(!bench.irq.line_level(IRQ));

    bench.advance(&mut pwm, MICRO);
    assert_eq!(bench.read(&mut pwm, INTR), 1);
    assert_eq!(bench.read(&mut pwm, INTS), 1);
    assert!(bench.irq.line_level(IRQ));

    bench.write(&mut pwm, INTR, 1);
    assert!(!bench.irq.line_level(IRQ));
}

// ─── Divider Modes ───────────────────────────────────────────────────────────

#[test]
fn rising_edge_mode_counts_input_edges() {
    let mut bench = DeviceBench::new();
    let mut pwm = pwm(&mut bench);
    bench.write(&mut pwm, CSR, CSR_EN | DIVMODE_RISE);
    for level in [true, false, true, false, true] {
        let mut ctx = bench.ctx();
        pwm.set_input_b(0, level, &mut ctx);
    }
    bench.advance(&mut pwm, 100 * MICRO);
    assert_eq!(pwm.counter(0, &bench.clock), 3);
}
