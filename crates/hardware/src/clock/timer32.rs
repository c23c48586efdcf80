//! Generic 32-bit hardware counter.
//!
//! This module implements the counter abstraction shared by SysTick, PWM slices and the
//! watchdog. It provides:
//! 1. **Lazy Counting:** The live value is a pure function of the virtual clock, computed
//!    from a frozen `(base_value, base_nanos)` pair on every read.
//! 2. **Transactional Reconfiguration:** Every change of frequency, prescaler, mode, enable
//!    or top first freezes the live value, so no tick is lost or counted twice.
//! 3. **Periodic Alarms:** Match alarms subscribed through [`Timer32::subscribe`] are
//!    recomputed and rescheduled whenever the counter configuration changes.
//!
//! Fractional tick arithmetic is done in `f64` and rounded to the nearest tick, so a
//! counter read half a tick before a boundary already shows the next value.

use super::{AlarmHandle, VirtualClock};

/// A `top` of all ones disables wrapping.
const FREE_RUNNING: u32 = u32::MAX;

/// Counting direction of a [`Timer32`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerMode {
    /// Counts up from 0 to `top`, then wraps to 0.
    #[default]
    Increment,
    /// Counts down from `top` to 0, then reloads `top`.
    Decrement,
    /// Counts up to `top`, then back down to 0 (phase-correct PWM).
    ZigZag,
}

/// Subscription token for a periodic match alarm on a [`Timer32`].
///
/// Dropping the token does not cancel the alarm; call [`Timer32::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AlarmToken(usize);

#[derive(Clone, Copy, Debug)]
struct PeriodicAlarm {
    handle: AlarmHandle,
    target: u32,
    enabled: bool,
}

/// A 32-bit counter clocked at `frequency / prescaler` Hz of virtual time.
#[derive(Debug)]
pub struct Timer32 {
    base_value: i64,
    base_nanos: u64,
    frequency: f64,
    prescaler: f64,
    top: u32,
    mode: TimerMode,
    enabled: bool,
    alarms: Vec<Option<PeriodicAlarm>>,
}

impl Timer32 {
    /// Creates an enabled, free-running, incrementing counter at zero.
    ///
    /// # Arguments
    ///
    /// * `clock` - The clock the counter is derived from.
    /// * `frequency` - Input clock frequency in Hz.
    pub fn new(clock: &VirtualClock, frequency: f64) -> Self {
        Self {
            base_value: 0,
            base_nanos: clock.now(),
            frequency,
            prescaler: 1.0,
            top: FREE_RUNNING,
            mode: TimerMode::Increment,
            enabled: true,
            alarms: Vec::new(),
        }
    }

    /// Counter value before zig-zag folding and 32-bit truncation.
    pub fn raw_counter(&self, clock: &VirtualClock) -> i64 {
        if self.frequency == 0.0 || self.prescaler == 0.0 || !self.enabled {
            return self.base_value;
        }
        let elapsed = clock.now().saturating_sub(self.base_nanos) as f64;
        let ticks = (elapsed / 1e9) * (self.frequency / self.prescaler);
        let top = f64::from(self.top);
        let top_modulo = if self.mode == TimerMode::ZigZag { top * 2.0 } else { top + 1.0 };
        if top_modulo <= 0.0 {
            return 0;
        }
        let delta = if self.mode == TimerMode::Decrement {
            top_modulo - (ticks % top_modulo)
        } else {
            ticks
        };
        let mut current = (self.base_value as f64 + delta).round();
        if self.top != FREE_RUNNING {
            current %= top_modulo;
        }
        current as i64
    }

    /// Live counter value.
    pub fn counter(&self, clock: &VirtualClock) -> u32 {
        let mut value = self.raw_counter(clock);
        let top = i64::from(self.top);
        if self.mode == TimerMode::ZigZag && value > top {
            value = top * 2 - value;
        }
        value.rem_euclid(1 << 32) as u32
    }

    /// Input frequency in Hz.
    pub const fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Current prescaler.
    pub const fn prescaler(&self) -> f64 {
        self.prescaler
    }

    /// Wrap value.
    pub const fn top(&self) -> u32 {
        self.top
    }

    /// Counting mode.
    pub const fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Whether the counter is running.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Loads a new counter value.
    ///
    /// # Arguments
    ///
    /// * `value` - The new counter value.
    /// * `zigzag_down` - In zig-zag mode, start on the downward slope.
    pub fn set(&mut self, clock: &mut VirtualClock, value: u32, zigzag_down: bool) {
        self.base_value = if zigzag_down {
            i64::from(self.top) * 2 - i64::from(value)
        } else {
            i64::from(value)
        };
        self.base_nanos = clock.now();
        self.updated(clock);
    }

    /// Restarts the counter from zero.
    pub fn reset(&mut self, clock: &mut VirtualClock) {
        self.base_nanos = clock.now();
        self.base_value = 0;
        self.updated(clock);
    }

    /// Changes the input frequency.
    pub fn set_frequency(&mut self, clock: &mut VirtualClock, frequency: f64) {
        self.freeze(clock);
        self.frequency = frequency;
        self.updated(clock);
    }

    /// Changes the prescaler. A zero prescaler stops counting.
    pub fn set_prescaler(&mut self, clock: &mut VirtualClock, prescaler: f64) {
        self.freeze(clock);
        self.prescaler = prescaler;
        self.updated(clock);
    }

    /// Changes the wrap value, restarting from 0 if the live value would exceed it.
    pub fn set_top(&mut self, clock: &mut VirtualClock, top: u32) {
        let current = self.counter(clock);
        self.top = top;
        self.set(clock, if current <= top { current } else { 0 }, false);
    }

    /// Changes the counting mode.
    pub fn set_mode(&mut self, clock: &mut VirtualClock, mode: TimerMode) {
        if self.mode != mode {
            let current = self.counter(clock);
            self.mode = mode;
            self.set(clock, current, false);
        }
    }

    /// Starts or stops the counter.
    pub fn set_enabled(&mut self, clock: &mut VirtualClock, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        if enabled {
            self.base_nanos = clock.now();
        } else {
            self.base_value = i64::from(self.counter(clock));
        }
        self.enabled = enabled;
        self.updated(clock);
    }

    /// Adds `delta` ticks to the frozen base value without touching alarms.
    ///
    /// Used by edge-counting PWM modes where the counter advances on input events.
    pub const fn advance(&mut self, delta: i64) {
        self.base_value += delta;
    }

    /// Converts a tick count into nanoseconds of virtual time.
    ///
    /// Returns `None` if the counter is not clocked.
    pub fn to_nanos(&self, ticks: u64) -> Option<u64> {
        if self.frequency == 0.0 || self.prescaler == 0.0 {
            return None;
        }
        Some((ticks as f64 * 1e9 / (self.frequency / self.prescaler)).round() as u64)
    }

    fn freeze(&mut self, clock: &VirtualClock) {
        self.base_value = i64::from(self.counter(clock));
        self.base_nanos = clock.now();
    }

    /// Subscribes a new periodic match alarm, initially disabled with target 0.
    pub fn subscribe(&mut self, clock: &mut VirtualClock) -> AlarmToken {
        let alarm = PeriodicAlarm {
            handle: clock.create_alarm(),
            target: 0,
            enabled: false,
        };
        self.alarms.push(Some(alarm));
        AlarmToken(self.alarms.len() - 1)
    }

    /// Cancels and removes a match alarm.
    pub fn unsubscribe(&mut self, clock: &mut VirtualClock, token: AlarmToken) {
        if let Some(alarm) = self.alarms.get_mut(token.0).and_then(Option::take) {
            clock.cancel(alarm.handle);
        }
    }

    /// Clock handles of every subscribed alarm, for routing fired alarms back here.
    pub fn alarm_handles(&self) -> impl Iterator<Item = AlarmHandle> + '_ {
        self.alarms.iter().flatten().map(|a| a.handle)
    }

    /// Maps a fired clock alarm to the subscription it belongs to.
    pub fn match_alarm(&self, handle: AlarmHandle) -> Option<AlarmToken> {
        self.alarms
            .iter()
            .position(|a| a.is_some_and(|a| a.handle == handle))
            .map(AlarmToken)
    }

    /// Match value of an alarm.
    pub fn alarm_target(&self, token: AlarmToken) -> u32 {
        self.alarm(token).map_or(0, |a| a.target)
    }

    /// Whether an alarm is enabled.
    pub fn alarm_enabled(&self, token: AlarmToken) -> bool {
        self.alarm(token).is_some_and(|a| a.enabled)
    }

    /// Changes the match value of an alarm and reschedules it.
    pub fn set_alarm_target(&mut self, clock: &mut VirtualClock, token: AlarmToken, target: u32) {
        let Some(alarm) = self.alarms.get_mut(token.0).and_then(Option::as_mut) else {
            return;
        };
        alarm.target = target;
        let alarm = *alarm;
        if alarm.enabled {
            clock.cancel(alarm.handle);
            self.schedule_alarm(clock, alarm, false);
        }
    }

    /// Enables or disables an alarm.
    pub fn set_alarm_enabled(
        &mut self,
        clock: &mut VirtualClock,
        token: AlarmToken,
        enabled: bool,
    ) {
        let Some(alarm) = self.alarms.get_mut(token.0).and_then(Option::as_mut) else {
            return;
        };
        if alarm.enabled == enabled {
            return;
        }
        alarm.enabled = enabled;
        let alarm = *alarm;
        if enabled {
            self.schedule_alarm(clock, alarm, false);
        } else {
            clock.cancel(alarm.handle);
        }
    }

    /// Reschedules an alarm after its owner has handled a match.
    ///
    /// A counter still sitting on the target counts as already matched, so the alarm
    /// waits a full period instead of firing again at the same instant.
    pub fn rearm(&self, clock: &mut VirtualClock, token: AlarmToken) {
        if let Some(alarm) = self.alarm(token)
            && alarm.enabled
        {
            self.schedule_alarm(clock, alarm, true);
        }
    }

    fn alarm(&self, token: AlarmToken) -> Option<PeriodicAlarm> {
        self.alarms.get(token.0).copied().flatten()
    }

    fn updated(&self, clock: &mut VirtualClock) {
        for alarm in self.alarms.iter().flatten() {
            clock.cancel(alarm.handle);
            if alarm.enabled {
                self.schedule_alarm(clock, *alarm, false);
            }
        }
    }

    /// Schedules the next match of `alarm`.
    ///
    /// A zero tick distance fires on the next clock advance unless `after_match` is set,
    /// in which case the match just handled is skipped and the next one is `top + 1`
    /// ticks away.
    fn schedule_alarm(&self, clock: &mut VirtualClock, alarm: PeriodicAlarm, after_match: bool) {
        if !self.enabled {
            return;
        }
        let top = i64::from(self.top);
        let target = i64::from(alarm.target);
        let raw = self.raw_counter(clock);
        let mut delta = target - raw;
        if self.mode == TimerMode::ZigZag && delta < 0 {
            if delta < -top {
                delta += 2 * top;
            } else {
                delta = top * 2 - target - raw;
            }
        }
        if self.top != FREE_RUNNING {
            if delta <= 0 {
                delta += top + 1;
            }
            if target > top {
                return;
            }
        }
        if self.mode == TimerMode::Decrement {
            delta = top + 1 - delta;
        }
        let mut ticks = delta.rem_euclid(1 << 32) as u64;
        if ticks == 0 && after_match {
            ticks = top as u64 + 1;
        }
        if let Some(nanos) = self.to_nanos(ticks) {
            clock.schedule(alarm.handle, nanos);
        }
    }
}
