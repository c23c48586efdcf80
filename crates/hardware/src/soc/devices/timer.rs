//! Microsecond system timer.
//!
//! A 64-bit counter incrementing once per microsecond of virtual time, with four
//! 32-bit alarms. Each alarm compares against the low word of the counter, disarms
//! itself when it fires and drives its own NVIC line (`TIMER_IRQ_0..3`).

use crate::clock::{AlarmHandle, VirtualClock};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const TIMEHW: u32 = 0x00;
const TIMELW: u32 = 0x04;
const TIMEHR: u32 = 0x08;
const TIMELR: u32 = 0x0C;
const ALARM0: u32 = 0x10;
const ALARM3: u32 = 0x1C;
const ARMED: u32 = 0x20;
const TIMERAWH: u32 = 0x24;
const TIMERAWL: u32 = 0x28;
const DBGPAUSE: u32 = 0x2C;
const PAUSE: u32 = 0x30;
const INTR: u32 = 0x34;
const INTE: u32 = 0x38;
const INTF: u32 = 0x3C;
const INTS: u32 = 0x40;

/// Number of alarms.
pub const NUM_ALARMS: usize = 4;

const NANOS_PER_MICRO: u64 = 1_000;

/// The RP2040 TIMER block.
#[derive(Debug)]
pub struct Timer {
    first_irq: u32,
    base_micros: u64,
    base_nanos: u64,
    paused: bool,
    alarms: [AlarmHandle; NUM_ALARMS],
    targets: [u32; NUM_ALARMS],
    armed: u32,
    latched_high: u32,
    write_low: u32,
    dbgpause: u32,
    intr: u32,
    inte: u32,
    intf: u32,
}

impl Timer {
    /// Creates the timer at zero with every alarm disarmed.
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock the microsecond count derives from.
    /// * `first_irq` - NVIC line of alarm 0; alarms 1-3 use the following lines.
    pub fn new(clock: &mut VirtualClock, first_irq: u32) -> Self {
        Self {
            first_irq,
            base_micros: 0,
            base_nanos: clock.now(),
            paused: false,
            alarms: std::array::from_fn(|_| clock.create_alarm()),
            targets: [0; NUM_ALARMS],
            armed: 0,
            latched_high: 0,
            write_low: 0,
            dbgpause: 7,
            intr: 0,
            inte: 0,
            intf: 0,
        }
    }

    /// Current 64-bit microsecond count.
    pub fn micros(&self, clock: &VirtualClock) -> u64 {
        if self.paused {
            return self.base_micros;
        }
        self.base_micros + clock.now().saturating_sub(self.base_nanos) / NANOS_PER_MICRO
    }

    /// Bitmap of armed alarms.
    pub const fn armed(&self) -> u32 {
        self.armed
    }

    fn set_micros(&mut self, clock: &mut VirtualClock, micros: u64) {
        self.base_micros = micros;
        self.base_nanos = clock.now();
        self.reschedule_all(clock);
    }

    fn set_paused(&mut self, clock: &mut VirtualClock, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.base_micros = self.micros(clock);
        self.base_nanos = clock.now();
        self.paused = paused;
        self.reschedule_all(clock);
    }

    fn schedule(&self, clock: &mut VirtualClock, index: usize) {
        let handle = self.alarms[index];
        clock.cancel(handle);
        if self.paused || self.armed & (1 << index) == 0 {
            return;
        }
        let now = self.micros(clock);
        let delta = u64::from(self.targets[index].wrapping_sub(now as u32));
        let deadline = self.base_nanos + (now + delta - self.base_micros) * NANOS_PER_MICRO;
        clock.schedule(handle, deadline.saturating_sub(clock.now()));
    }

    fn reschedule_all(&self, clock: &mut VirtualClock) {
        for index in 0..NUM_ALARMS {
            self.schedule(clock, index);
        }
    }

    const fn interrupt_status(&self) -> u32 {
        (self.intr & self.inte) | self.intf
    }

    fn check_interrupts(&self, ctx: &mut PeripheralContext<'_>) {
        let status = self.interrupt_status();
        for index in 0..NUM_ALARMS as u32 {
            ctx.irq.set_interrupt(self.first_irq + index, status & (1 << index) != 0);
        }
    }
}

impl Peripheral for Timer {
    fn name(&self) -> &str {
        "TIMER"
    }

    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            TIMEHR => self.latched_high,
            TIMELR => {
                let now = self.micros(ctx.clock);
                self.latched_high = (now >> 32) as u32;
                now as u32
            }
            ALARM0..=ALARM3 => self.targets[((offset - ALARM0) >> 2) as usize],
            ARMED => self.armed,
            TIMERAWH => (self.micros(ctx.clock) >> 32) as u32,
            TIMERAWL => self.micros(ctx.clock) as u32,
            DBGPAUSE => self.dbgpause,
            PAUSE => u32::from(self.paused),
            INTR => self.intr,
            INTE => self.inte,
            INTF => self.intf,
            INTS => self.interrupt_status(),
            _ => unknown_read("TIMER", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        match offset {
            TIMELW => self.write_low = value,
            TIMEHW => {
                let micros = (u64::from(value) << 32) | u64::from(self.write_low);
                self.set_micros(ctx.clock, micros);
            }
            ALARM0..=ALARM3 => {
                let index = ((offset - ALARM0) >> 2) as usize;
                self.targets[index] = value;
                self.armed |= 1 << index;
                self.schedule(ctx.clock, index);
            }
            ARMED => {
                self.armed &= !(value & 0xF);
                self.reschedule_all(ctx.clock);
            }
            DBGPAUSE => self.dbgpause = value & 0x6,
            PAUSE => self.set_paused(ctx.clock, value & 1 != 0),
            INTR => self.intr &= !(value & 0xF),
            INTE => self.inte = value & 0xF,
            INTF => self.intf = value & 0xF,
            _ => unknown_write("TIMER", offset, value),
        }
        self.check_interrupts(ctx);
    }

    fn reset(&mut self, ctx: &mut PeripheralContext<'_>) {
        self.paused = false;
        self.armed = 0;
        self.targets = [0; NUM_ALARMS];
        self.latched_high = 0;
        self.write_low = 0;
        self.dbgpause = 7;
        self.intr = 0;
        self.inte = 0;
        self.intf = 0;
        self.set_micros(ctx.clock, 0);
        self.check_interrupts(ctx);
    }

    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        self.alarms.to_vec()
    }

    fn on_alarm(&mut self, handle: AlarmHandle, ctx: &mut PeripheralContext<'_>) {
        let Some(index) = self.alarms.iter().position(|&h| h == handle) else {
            return;
        };
        tracing::trace!(target: "timer", alarm = index, "alarm fired");
        self.armed &= !(1 << index);
        self.intr |= 1 << index;
        self.check_interrupts(ctx);
    }

    fn as_timer_mut(&mut self) -> Option<&mut Timer> {
        Some(self)
    }
}
