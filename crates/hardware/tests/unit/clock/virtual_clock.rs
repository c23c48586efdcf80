//! Virtual Clock Tests.
//!
//! Verifies the discrete-event scheduler: alarms fire in deadline order, the clock reads
//! each alarm's exact deadline while it is dispatched, and rescheduling or cancelling
//! an alarm removes its previous deadline.

use picosim_core::clock::{AlarmHandle, VirtualClock};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Advances `clock` by `delta`, recording `(handle, now)` for every alarm fired.
fn advance_collect(clock: &mut VirtualClock, delta: u64) -> Vec<(AlarmHandle, u64)> {
    let mut fired = Vec::new();
    clock.advance(delta, |clk, handle| fired.push((handle, clk.now())));
    fired
}

// ─── Basics ──────────────────────────────────────────────────────────────────

#[test]
fn new_clock_starts_at_zero_and_idle() {
    let clock = VirtualClock::new();
    assert_eq!(clock.now(), 0);
    assert!(!clock.has_pending());
    assert_eq!(clock.time_to_next_alarm(), 0);
}

#[test]
fn advance_without_alarms_moves_time() {
    let mut clock = VirtualClock::new();
    assert!(advance_collect(&mut clock, 1_500).is_empty());
    assert_eq!(clock.now(), 1_500);
}

#[test]
fn schedule_reports_deadline() {
    let mut clock = VirtualClock::new();
    clock.advance(100, |_, _| {});
    let a = clock.create_alarm();
    clock.schedule(a, 50);
    assert!(clock.is_scheduled(a));
    assert_eq!(clock.deadline(a), Some(150));
    assert_eq!(clock.time_to_next_alarm(), 50);
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[test]
fn alarms_fire_in_deadline_order_at_their_deadline() {
    let mut clock = VirtualClock::new();
    let late = clock.create_alarm();
    let early = clock.create_alarm();
    clock.schedule(late, 300);
    clock.schedule(early, 100);

    let fired = advance_collect(&mut clock, 1_000);
    assert_eq!(fired, vec![(early, 100), (late, 300)]);
    assert_eq!(clock.now(), 1_000);
    assert!(!clock.has_pending());
}

#[test]
fn equal_deadlines_fire_in_scheduling_order() {
    let mut clock = VirtualClock::new();
    let handles: Vec<_> = (0..4).map(|_| clock.create_alarm()).collect();
    for &h in handles.iter().rev() {
        clock.schedule(h, 10);
    }
    let fired: Vec<_> = advance_collect(&mut clock, 10).into_iter().map(|(h, _)| h).collect();
    let expected: Vec<_> = handles.iter().rev().copied().collect();
    assert_eq!(fired, expected);
}

#[test]
fn alarm_exactly_at_target_fires() {
    let mut clock = VirtualClock::new();
    let a = clock.create_alarm();
    clock.schedule(a, 500);
    assert!(advance_collect(&mut clock, 499).is_empty());
    assert_eq!(advance_collect(&mut clock, 1), vec![(a, 500)]);
}

// ─── Rescheduling ────────────────────────────────────────────────────────────

#[test]
fn rescheduling_replaces_previous_deadline() {
    let mut clock = VirtualClock::new();
    let a = clock.create_alarm();
    clock.schedule(a, 100);
    clock.schedule(a, 700);
    assert_eq!(clock.deadline(a), Some(700));

    let fired = advance_collect(&mut clock, 1_000);
    assert_eq!(fired, vec![(a, 700)]);
}

#[test]
fn cancelled_alarm_never_fires() {
    let mut clock = VirtualClock::new();
    let a = clock.create_alarm();
    let b = clock.create_alarm();
    clock.schedule(a, 100);
    clock.schedule(b, 200);
    clock.cancel(a);
    assert!(!clock.is_scheduled(a));
    assert_eq!(clock.deadline(a), None);
    assert_eq!(advance_collect(&mut clock, 1_000), vec![(b, 200)]);
}

#[test]
fn cancel_of_idle_alarm_is_harmless() {
    let mut clock = VirtualClock::new();
    let a = clock.create_alarm();
    clock.cancel(a);
    clock.cancel(a);
    assert!(!clock.has_pending());
}

#[test]
fn alarm_scheduled_during_dispatch_fires_in_same_advance() {
    let mut clock = VirtualClock::new();
    let periodic = clock.create_alarm();
    clock.schedule(periodic, 100);

    let mut times = Vec::new();
    clock.advance(450, |clk, handle| {
        times.push(clk.now());
        clk.schedule(handle, 100);
    });
    assert_eq!(times, vec![100, 200, 300, 400]);
    assert_eq!(clock.deadline(periodic), Some(500));
}

#[test]
fn cancel_all_drops_every_alarm() {
    let mut clock = VirtualClock::new();
    let a = clock.create_alarm();
    let b = clock.create_alarm();
    clock.schedule(a, 10);
    clock.schedule(b, 20);
    clock.cancel_all();
    assert!(!clock.has_pending());
    assert!(advance_collect(&mut clock, 100).is_empty());
    assert_eq!(clock.now(), 100);
}

// ─── Properties ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn fired_deadlines_are_monotonic(deltas in proptest::collection::vec(0u64..10_000, 1..32)) {
        let mut clock = VirtualClock::new();
        let handles: Vec<_> = deltas.iter().map(|_| clock.create_alarm()).collect();
        for (h, d) in handles.iter().zip(&deltas) {
            clock.schedule(*h, *d);
        }
        let fired = advance_collect(&mut clock, 10_000);
        prop_assert_eq!(fired.len(), deltas.len());
        for pair in fired.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1);
        }
        for (handle, at) in fired {
            prop_assert_eq!(at, deltas[handle.index()]);
        }
    }
}
