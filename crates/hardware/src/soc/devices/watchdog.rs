//! Watchdog timer.
//!
//! A 24-bit down-counter clocked by the watchdog tick generator. When it reaches zero
//! the watchdog records the reset reason, invokes an optional host hook and raises
//! [`SystemEvents::watchdog_fired`](crate::soc::traits::SystemEvents), leaving the
//! decision to reset the machine to the driver.
//!
//! The tick generator divides `clk_ref` by `TICK.CYCLES`. Like the silicon, the counter
//! decrements twice per tick.

use crate::clock::{AlarmHandle, AlarmToken, Timer32, TimerMode, VirtualClock};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const CTRL: u32 = 0x00;
const LOAD: u32 = 0x04;
const REASON: u32 = 0x08;
const SCRATCH0: u32 = 0x0C;
const SCRATCH7: u32 = 0x28;
const TICK: u32 = 0x2C;

const CTRL_TIME_MASK: u32 = 0x00FF_FFFF;
const CTRL_PAUSE_JTAG: u32 = 1 << 24;
const CTRL_PAUSE_DBG0: u32 = 1 << 25;
const CTRL_PAUSE_DBG1: u32 = 1 << 26;
const CTRL_ENABLE: u32 = 1 << 30;
const CTRL_TRIGGER: u32 = 1 << 31;

/// REASON: the counter reached zero.
pub const REASON_TIMER: u32 = 1 << 0;
/// REASON: CTRL.TRIGGER was written.
pub const REASON_FORCE: u32 = 1 << 1;

const TICK_CYCLES_MASK: u32 = 0x1FF;
const TICK_ENABLE: u32 = 1 << 9;
const TICK_RUNNING: u32 = 1 << 10;

/// Host hook invoked when the watchdog fires.
pub type TriggerHook = Box<dyn FnMut() + Send>;

/// RP2040 watchdog.
pub struct Watchdog {
    timer: Timer32,
    alarm: AlarmToken,
    ref_hz: f64,
    ctrl: u32,
    load: u32,
    reason: u32,
    scratch: [u32; 8],
    tick: u32,
    debugger_attached: bool,
    on_trigger: Option<TriggerHook>,
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("ctrl", &self.ctrl)
            .field("load", &self.load)
            .field("reason", &self.reason)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Watchdog {
    /// Creates a disabled watchdog.
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock the countdown derives from.
    /// * `ref_hz` - Reference clock (`clk_ref`) feeding the tick generator.
    pub fn new(clock: &mut VirtualClock, ref_hz: f64) -> Self {
        let mut timer = Timer32::new(clock, 0.0);
        timer.set_enabled(clock, false);
        timer.set_mode(clock, TimerMode::Decrement);
        let alarm = timer.subscribe(clock);
        timer.set_alarm_enabled(clock, alarm, true);
        Self {
            timer,
            alarm,
            ref_hz,
            ctrl: 0,
            load: 0,
            reason: 0,
            scratch: [0; 8],
            tick: TICK_ENABLE,
            debugger_attached: false,
            on_trigger: None,
        }
    }

    /// Installs a host hook invoked when the watchdog fires.
    pub fn set_on_trigger(&mut self, hook: TriggerHook) {
        self.on_trigger = Some(hook);
    }

    /// Whether CTRL.ENABLE is set.
    pub const fn enabled(&self) -> bool {
        self.ctrl & CTRL_ENABLE != 0
    }

    /// Reset reason flags.
    pub const fn reason(&self) -> u32 {
        self.reason
    }

    /// Scratch register contents, preserved across watchdog resets.
    pub const fn scratch(&self) -> &[u32; 8] {
        &self.scratch
    }

    /// Remaining count.
    pub fn time_remaining(&self, clock: &VirtualClock) -> u32 {
        self.timer.counter(clock) & CTRL_TIME_MASK
    }

    /// Tells the watchdog whether a debugger is attached.
    ///
    /// The countdown pauses while attached if any of the CTRL pause bits is set.
    pub fn set_debugger_attached(&mut self, attached: bool, clock: &mut VirtualClock) {
        self.debugger_attached = attached;
        self.sync_timer(clock);
    }

    const fn paused(&self) -> bool {
        self.debugger_attached
            && self.ctrl & (CTRL_PAUSE_JTAG | CTRL_PAUSE_DBG0 | CTRL_PAUSE_DBG1) != 0
    }

    fn tick_frequency(&self) -> f64 {
        let cycles = self.tick & TICK_CYCLES_MASK;
        if self.tick & TICK_ENABLE == 0 || cycles == 0 {
            0.0
        } else {
            2.0 * self.ref_hz / f64::from(cycles)
        }
    }

    fn sync_timer(&mut self, clock: &mut VirtualClock) {
        self.timer.set_frequency(clock, self.tick_frequency());
        self.timer.set_enabled(clock, self.enabled() && !self.paused());
    }

    fn fire(&mut self, reason: u32, ctx: &mut PeripheralContext<'_>) {
        tracing::info!(target: "watchdog", reason, "watchdog fired");
        self.reason = reason;
        self.ctrl &= !CTRL_ENABLE;
        self.sync_timer(ctx.clock);
        ctx.events.watchdog_fired = true;
        if let Some(hook) = self.on_trigger.as_mut() {
            hook();
        }
    }
}

impl Peripheral for Watchdog {
    fn name(&self) -> &str {
        "WATCHDOG"
    }

    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            CTRL => (self.ctrl & !CTRL_TIME_MASK) | self.time_remaining(ctx.clock),
            LOAD => 0,
            REASON => self.reason,
            SCRATCH0..=SCRATCH7 => self.scratch[((offset - SCRATCH0) >> 2) as usize],
            TICK => {
                let running = if self.tick_frequency() > 0.0 { TICK_RUNNING } else { 0 };
                self.tick | running
            }
            _ => unknown_read("WATCHDOG", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        match offset {
            CTRL => {
                self.ctrl =
                    value & (CTRL_ENABLE | CTRL_PAUSE_JTAG | CTRL_PAUSE_DBG0 | CTRL_PAUSE_DBG1);
                self.sync_timer(ctx.clock);
                if value & CTRL_TRIGGER != 0 {
                    self.fire(REASON_FORCE, ctx);
                }
            }
            LOAD => {
                self.load = value & CTRL_TIME_MASK;
                self.timer.set(ctx.clock, self.load, false);
            }
            REASON => {}
            SCRATCH0..=SCRATCH7 => self.scratch[((offset - SCRATCH0) >> 2) as usize] = value,
            TICK => {
                self.tick = value & (TICK_CYCLES_MASK | TICK_ENABLE);
                self.sync_timer(ctx.clock);
            }
            _ => unknown_write("WATCHDOG", offset, value),
        }
    }

    fn reset(&mut self, ctx: &mut PeripheralContext<'_>) {
        self.ctrl = 0;
        self.load = 0;
        self.tick = TICK_ENABLE;
        self.timer.set(ctx.clock, 0, false);
        self.sync_timer(ctx.clock);
    }

    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        self.timer.alarm_handles().collect()
    }

    fn on_alarm(&mut self, handle: AlarmHandle, ctx: &mut PeripheralContext<'_>) {
        if self.timer.match_alarm(handle) == Some(self.alarm) {
            self.fire(REASON_TIMER, ctx);
        }
    }

    fn as_watchdog_mut(&mut self) -> Option<&mut Watchdog> {
        Some(self)
    }
}
