//! Pulse Width Modulation (PWM) block.
//!
//! Eight independent slices, each a 16-bit counter with two compare channels (A and B).
//! This module provides:
//! 1. **Counting:** Every slice wraps a [`Timer32`] clocked from `clk_sys` through a
//!    fractional 8.4 divider, counting up or in phase-correct (up/down) mode.
//! 2. **Double Buffering:** Compare and `TOP` writes made while a slice runs are held
//!    and applied at the next wrap, so a period is never torn.
//! 3. **Divider Modes:** Free-running, gated by the B pin, or advanced by rising or
//!    falling edges on the B pin.
//! 4. **Outputs:** Channel levels are recomputed from the counter at every compare and
//!    wrap point and reported to an optional host hook on change.
//! 5. **Interrupts:** One wrap flag per slice, combined into a single NVIC line.

use crate::clock::{AlarmHandle, AlarmToken, Timer32, TimerMode, VirtualClock};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

/// Number of PWM slices.
pub const NUM_SLICES: usize = 8;

/// Register stride between slices.
const SLICE_STRIDE: u32 = 0x14;

const CH_CSR: u32 = 0x00;
const CH_DIV: u32 = 0x04;
const CH_CTR: u32 = 0x08;
const CH_CC: u32 = 0x0C;
const CH_TOP: u32 = 0x10;

const EN: u32 = 0xA0;
const INTR: u32 = 0xA4;
const INTE: u32 = 0xA8;
const INTF: u32 = 0xAC;
const INTS: u32 = 0xB0;

const CSR_EN: u32 = 1 << 0;
const CSR_PH_CORRECT: u32 = 1 << 1;
const CSR_A_INV: u32 = 1 << 2;
const CSR_B_INV: u32 = 1 << 3;
const CSR_PH_RET: u32 = 1 << 6;
const CSR_PH_ADV: u32 = 1 << 7;

/// Divider reset value: integer 1, fraction 0.
const DIV_RESET: u32 = 0x10;
const TOP_RESET: u32 = 0xFFFF;

/// Output channel of a slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel A (even GPIO).
    A,
    /// Channel B (odd GPIO).
    B,
}

/// What advances a slice counter (CSR.DIVMODE).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DivMode {
    /// Counts continuously at the divided clock rate.
    #[default]
    FreeRunning,
    /// Counts at the divided rate while the B pin is high.
    Gated,
    /// Counts on rising edges of the B pin.
    RisingEdge,
    /// Counts on falling edges of the B pin.
    FallingEdge,
}

impl DivMode {
    const fn from_csr(csr: u32) -> Self {
        match (csr >> 4) & 3 {
            0 => Self::FreeRunning,
            1 => Self::Gated,
            2 => Self::RisingEdge,
            _ => Self::FallingEdge,
        }
    }
}

/// Host hook receiving `(slice, channel, level)` whenever an output changes.
pub type OutputHook = Box<dyn FnMut(usize, Channel, bool) + Send>;

#[derive(Debug)]
struct Slice {
    timer: Timer32,
    alarm_a: AlarmToken,
    alarm_b: AlarmToken,
    alarm_wrap: AlarmToken,
    csr: u32,
    div: u32,
    cc: u32,
    top: u32,
    pending_cc: Option<u32>,
    pending_top: Option<u32>,
    input_b: bool,
    edge_accum: u32,
    out_a: bool,
    out_b: bool,
}

impl Slice {
    fn new(clock: &mut VirtualClock, frequency: f64) -> Self {
        let mut timer = Timer32::new(clock, frequency);
        timer.set_enabled(clock, false);
        timer.set_top(clock, TOP_RESET);
        timer.set_prescaler(clock, 1.0);
        let alarm_a = timer.subscribe(clock);
        let alarm_b = timer.subscribe(clock);
        let alarm_wrap = timer.subscribe(clock);
        for token in [alarm_a, alarm_b, alarm_wrap] {
            timer.set_alarm_enabled(clock, token, true);
        }
        Self {
            timer,
            alarm_a,
            alarm_b,
            alarm_wrap,
            csr: 0,
            div: DIV_RESET,
            cc: 0,
            top: TOP_RESET,
            pending_cc: None,
            pending_top: None,
            input_b: false,
            edge_accum: 0,
            out_a: false,
            out_b: false,
        }
    }

    const fn enabled(&self) -> bool {
        self.csr & CSR_EN != 0
    }

    const fn div_mode(&self) -> DivMode {
        DivMode::from_csr(self.csr)
    }

    /// Divider as 8.4 fixed point; an integer part of 0 means 256.
    const fn div_fixed(&self) -> u32 {
        let int = (self.div >> 4) & 0xFF;
        let frac = self.div & 0xF;
        let int = if int == 0 { 256 } else { int };
        int * 16 + frac
    }

    fn sync_timer(&mut self, clock: &mut VirtualClock) {
        let mode =
            if self.csr & CSR_PH_CORRECT != 0 { TimerMode::ZigZag } else { TimerMode::Increment };
        self.timer.set_mode(clock, mode);
        self.timer.set_prescaler(clock, f64::from(self.div_fixed()) / 16.0);
        let running = self.enabled()
            && match self.div_mode() {
                DivMode::FreeRunning => true,
                DivMode::Gated => self.input_b,
                DivMode::RisingEdge | DivMode::FallingEdge => false,
            };
        self.timer.set_enabled(clock, running);
    }

    fn apply_cc(&mut self, clock: &mut VirtualClock, cc: u32) {
        self.cc = cc;
        self.timer.set_alarm_target(clock, self.alarm_a, cc & 0xFFFF);
        self.timer.set_alarm_target(clock, self.alarm_b, cc >> 16);
    }

    fn apply_top(&mut self, clock: &mut VirtualClock, top: u32) {
        self.top = top;
        self.timer.set_top(clock, top);
    }

    /// Applies buffered compare and wrap values.
    fn latch(&mut self, clock: &mut VirtualClock) {
        if let Some(top) = self.pending_top.take() {
            self.apply_top(clock, top);
        }
        if let Some(cc) = self.pending_cc.take() {
            self.apply_cc(clock, cc);
        }
    }

    fn levels(&self, clock: &VirtualClock) -> (bool, bool) {
        let counter = self.timer.counter(clock);
        let a = (counter < (self.cc & 0xFFFF)) ^ (self.csr & CSR_A_INV != 0);
        let b = (counter < (self.cc >> 16)) ^ (self.csr & CSR_B_INV != 0);
        (a, b)
    }
}

/// The PWM block.
pub struct Pwm {
    slices: Vec<Slice>,
    irq: u32,
    intr: u32,
    inte: u32,
    intf: u32,
    on_output: Option<OutputHook>,
}

impl std::fmt::Debug for Pwm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pwm")
            .field("slices", &self.slices)
            .field("intr", &self.intr)
            .field("inte", &self.inte)
            .finish_non_exhaustive()
    }
}

impl Pwm {
    /// Creates the block with every slice disabled.
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock the slice counters derive from.
    /// * `irq` - NVIC line for the combined wrap interrupt.
    /// * `frequency` - Counter input clock (`clk_sys`) in Hz.
    pub fn new(clock: &mut VirtualClock, irq: u32, frequency: f64) -> Self {
        Self {
            slices: (0..NUM_SLICES).map(|_| Slice::new(clock, frequency)).collect(),
            irq,
            intr: 0,
            inte: 0,
            intf: 0,
            on_output: None,
        }
    }

    /// Installs the host hook for output changes.
    pub fn set_on_output(&mut self, hook: OutputHook) {
        self.on_output = Some(hook);
    }

    /// Current level of an output channel.
    pub fn output(&self, slice: usize, channel: Channel) -> bool {
        self.slices.get(slice).is_some_and(|s| match channel {
            Channel::A => s.out_a,
            Channel::B => s.out_b,
        })
    }

    /// Live counter value of a slice.
    pub fn counter(&self, slice: usize, clock: &VirtualClock) -> u32 {
        self.slices.get(slice).map_or(0, |s| s.timer.counter(clock))
    }

    /// Drives the B pin of a slice, used by the gated and edge-counting divider modes.
    pub fn set_input_b(&mut self, slice: usize, level: bool, ctx: &mut PeripheralContext<'_>) {
        let Some(s) = self.slices.get_mut(slice) else {
            return;
        };
        let previous = s.input_b;
        s.input_b = level;
        if !s.enabled() || previous == level {
            return;
        }
        let edge = match s.div_mode() {
            DivMode::FreeRunning => return,
            DivMode::Gated => {
                s.sync_timer(ctx.clock);
                false
            }
            DivMode::RisingEdge => level,
            DivMode::FallingEdge => !level,
        };
        if edge && self.count_edge(slice, ctx) {
            self.wrap(slice, ctx);
        }
        self.refresh_outputs(slice, ctx.clock);
    }

    /// Advances an edge-counting slice by one input edge. Returns whether it wrapped.
    fn count_edge(&mut self, slice: usize, ctx: &mut PeripheralContext<'_>) -> bool {
        let Some(s) = self.slices.get_mut(slice) else {
            return false;
        };
        s.edge_accum += 16;
        if s.edge_accum < s.div_fixed() {
            return false;
        }
        s.edge_accum -= s.div_fixed();
        let counter = s.timer.counter(ctx.clock);
        if counter >= s.top {
            s.timer.set(ctx.clock, 0, false);
            true
        } else {
            s.timer.advance(1);
            false
        }
    }

    fn wrap(&mut self, slice: usize, ctx: &mut PeripheralContext<'_>) {
        if let Some(s) = self.slices.get_mut(slice) {
            s.latch(ctx.clock);
        }
        self.intr |= 1 << slice;
        self.check_interrupts(ctx);
    }

    fn refresh_outputs(&mut self, slice: usize, clock: &VirtualClock) {
        let Some(s) = self.slices.get_mut(slice) else {
            return;
        };
        let (a, b) = s.levels(clock);
        let changes = [(Channel::A, s.out_a != a, a), (Channel::B, s.out_b != b, b)];
        s.out_a = a;
        s.out_b = b;
        for (channel, changed, level) in changes {
            if changed {
                tracing::trace!(target: "pwm", slice, ?channel, level, "output changed");
                if let Some(hook) = self.on_output.as_mut() {
                    hook(slice, channel, level);
                }
            }
        }
    }

    const fn interrupt_status(&self) -> u32 {
        (self.intr & self.inte) | self.intf
    }

    fn check_interrupts(&self, ctx: &mut PeripheralContext<'_>) {
        ctx.irq.set_interrupt(self.irq, self.interrupt_status() != 0);
    }

    fn write_slice(&mut self, slice: usize, reg: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        let Some(s) = self.slices.get_mut(slice) else {
            return;
        };
        let clock = &mut *ctx.clock;
        match reg {
            CH_CSR => {
                let was_enabled = s.enabled();
                s.csr = value & 0x3F;
                if s.enabled() && !was_enabled {
                    s.latch(clock);
                    s.edge_accum = 0;
                }
                s.sync_timer(clock);
                let counter = s.timer.counter(clock);
                let top = s.top;
                if value & CSR_PH_ADV != 0 {
                    s.timer.set(clock, if counter >= top { 0 } else { counter + 1 }, false);
                }
                if value & CSR_PH_RET != 0 {
                    s.timer.set(clock, if counter == 0 { top } else { counter - 1 }, false);
                }
            }
            CH_DIV => {
                s.div = value & 0xFFF;
                s.sync_timer(clock);
            }
            CH_CTR => s.timer.set(clock, value & 0xFFFF, false),
            CH_CC => {
                if s.enabled() {
                    s.pending_cc = Some(value);
                } else {
                    s.apply_cc(clock, value);
                }
            }
            CH_TOP => {
                let top = value & 0xFFFF;
                if s.enabled() {
                    s.pending_top = Some(top);
                } else {
                    s.apply_top(clock, top);
                }
            }
            _ => {}
        }
        self.refresh_outputs(slice, ctx.clock);
    }
}

impl Peripheral for Pwm {
    fn name(&self) -> &str {
        "PWM"
    }

    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32 {
        if offset < EN {
            let slice = (offset / SLICE_STRIDE) as usize;
            let Some(s) = self.slices.get(slice) else {
                return 0;
            };
            return match offset % SLICE_STRIDE {
                CH_CSR => s.csr,
                CH_DIV => s.div,
                CH_CTR => s.timer.counter(ctx.clock),
                CH_CC => s.pending_cc.unwrap_or(s.cc),
                _ => s.pending_top.unwrap_or(s.top),
            };
        }
        match offset {
            EN => self
                .slices
                .iter()
                .enumerate()
                .fold(0, |acc, (i, s)| acc | u32::from(s.enabled()) << i),
            INTR => self.intr,
            INTE => self.inte,
            INTF => self.intf,
            INTS => self.interrupt_status(),
            _ => unknown_read("PWM", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        if offset < EN {
            let slice = (offset / SLICE_STRIDE) as usize;
            self.write_slice(slice, offset % SLICE_STRIDE, value, ctx);
            return;
        }
        match offset {
            EN => {
                for slice in 0..NUM_SLICES {
                    let csr = self.slices.get(slice).map_or(0, |s| s.csr);
                    let csr = (csr & !CSR_EN) | ((value >> slice) & 1);
                    self.write_slice(slice, CH_CSR, csr, ctx);
                }
            }
            INTR => self.intr &= !value,
            INTE => self.inte = value & 0xFF,
            INTF => self.intf = value & 0xFF,
            _ => unknown_write("PWM", offset, value),
        }
        self.check_interrupts(ctx);
    }

    fn reset(&mut self, ctx: &mut PeripheralContext<'_>) {
        for slice in 0..NUM_SLICES {
            if let Some(s) = self.slices.get_mut(slice) {
                s.csr = 0;
                s.div = DIV_RESET;
                s.pending_cc = None;
                s.pending_top = None;
                s.edge_accum = 0;
                s.sync_timer(ctx.clock);
                s.apply_top(ctx.clock, TOP_RESET);
                s.apply_cc(ctx.clock, 0);
                s.timer.set(ctx.clock, 0, false);
            }
            self.refresh_outputs(slice, ctx.clock);
        }
        self.intr = 0;
        self.inte = 0;
        self.intf = 0;
        self.check_interrupts(ctx);
    }

    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        self.slices.iter().flat_map(|s| s.timer.alarm_handles()).collect()
    }

    fn on_alarm(&mut self, handle: AlarmHandle, ctx: &mut PeripheralContext<'_>) {
        let Some((slice, token)) = self
            .slices
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.timer.match_alarm(handle).map(|t| (i, t)))
        else {
            return;
        };
        let is_wrap = self.slices.get(slice).is_some_and(|s| s.alarm_wrap == token);
        if is_wrap {
            self.wrap(slice, ctx);
        }
        self.refresh_outputs(slice, ctx.clock);
        if let Some(s) = self.slices.get(slice) {
            s.timer.rearm(ctx.clock, token);
        }
    }

    fn as_pwm_mut(&mut self) -> Option<&mut Pwm> {
        Some(self)
    }
}
