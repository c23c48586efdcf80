//! Cortex-M0+ private peripheral bus (PPB).
//!
//! The core-private block at `0xE000_E000`. It provides:
//! 1. **SysTick:** A 24-bit down-counter backed by a [`Timer32`], reloading from RVR and
//!    pending the SysTick exception on underflow when TICKINT is set.
//! 2. **NVIC:** Set/clear enable and pending registers and the eight packed IPR
//!    priority registers.
//! 3. **SCB:** CPUID, ICSR, VTOR, AIRCR (with SYSRESETREQ), SCR, CCR and the system
//!    handler priority registers.
//!
//! All exception state lives in the shared
//! [`InterruptController`](crate::soc::nvic::InterruptController); this block only decodes
//! register accesses against it.

use crate::clock::{AlarmHandle, AlarmToken, Timer32, TimerMode, VirtualClock};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const SYST_CSR: u32 = 0x010;
const SYST_RVR: u32 = 0x014;
const SYST_CVR: u32 = 0x018;
const SYST_CALIB: u32 = 0x01C;
const NVIC_ISER: u32 = 0x100;
const NVIC_ICER: u32 = 0x180;
const NVIC_ISPR: u32 = 0x200;
const NVIC_ICPR: u32 = 0x280;
const NVIC_IPR0: u32 = 0x400;
const NVIC_IPR7: u32 = 0x41C;
const CPUID: u32 = 0xD00;
const ICSR: u32 = 0xD04;
const VTOR: u32 = 0xD08;
const AIRCR: u32 = 0xD0C;
const SCR: u32 = 0xD10;
const CCR: u32 = 0xD14;
const SHPR2: u32 = 0xD1C;
const SHPR3: u32 = 0xD20;
const SHCSR: u32 = 0xD24;

/// Cortex-M0+ r0p1.
const CPUID_VALUE: u32 = 0x410C_C601;
/// STKALIGN and UNALIGN_TRP are fixed to one.
const CCR_VALUE: u32 = 0x0000_0204;
const AIRCR_VECTKEY: u32 = 0x05FA;
const AIRCR_VECTKEYSTAT: u32 = 0xFA05_0000;
const AIRCR_SYSRESETREQ: u32 = 1 << 2;
const AIRCR_ENDIANNESS: u32 = 1 << 15;

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;
const CSR_COUNTFLAG: u32 = 1 << 16;

const ICSR_NMIPENDSET: u32 = 1 << 31;
const ICSR_PENDSVSET: u32 = 1 << 28;
const ICSR_PENDSVCLR: u32 = 1 << 27;
const ICSR_PENDSTSET: u32 = 1 << 26;
const ICSR_PENDSTCLR: u32 = 1 << 25;
const ICSR_ISRPENDING: u32 = 1 << 22;

const SHCSR_SVCALLPENDED: u32 = 1 << 15;

/// SysTick reference clock when CLKSOURCE selects the external source.
const SYSTICK_REF_HZ: f64 = 1_000_000.0;

/// The private peripheral bus block.
#[derive(Debug)]
pub struct Ppb {
    systick: Timer32,
    systick_alarm: AlarmToken,
    sys_hz: f64,
    systick_csr: u32,
    systick_rvr: u32,
    countflag: bool,
}

impl Ppb {
    /// Creates the PPB with SysTick stopped.
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock SysTick derives from.
    /// * `sys_hz` - Processor clock, selected by SYST_CSR.CLKSOURCE.
    pub fn new(clock: &mut VirtualClock, sys_hz: f64) -> Self {
        let mut systick = Timer32::new(clock, SYSTICK_REF_HZ);
        systick.set_enabled(clock, false);
        systick.set_mode(clock, TimerMode::Decrement);
        systick.set_top(clock, 0);
        let systick_alarm = systick.subscribe(clock);
        systick.set_alarm_enabled(clock, systick_alarm, true);
        Self {
            systick,
            systick_alarm,
            sys_hz,
            systick_csr: 0,
            systick_rvr: 0,
            countflag: false,
        }
    }

    /// Current SysTick count.
    pub fn systick_value(&self, clock: &VirtualClock) -> u32 {
        self.systick.counter(clock)
    }

    fn sync_systick(&mut self, clock: &mut VirtualClock) {
        let frequency =
            if self.systick_csr & CSR_CLKSOURCE != 0 { self.sys_hz } else { SYSTICK_REF_HZ };
        self.systick.set_frequency(clock, frequency);
        // A zero reload value stops the counter.
        let running = self.systick_csr & CSR_ENABLE != 0 && self.systick_rvr != 0;
        self.systick.set_enabled(clock, running);
        // A count of zero reloads RVR on the next tick instead of underflowing now.
        self.systick.rearm(clock, self.systick_alarm);
    }

    fn icsr(ctx: &PeripheralContext<'_>) -> u32 {
        let irq = &*ctx.irq;
        let mut value = irq.vect_active & 0x1FF;
        value |= (irq.vect_pending() & 0x1FF) << 12;
        if irq.pending & irq.enabled != 0 {
            value |= ICSR_ISRPENDING;
        }
        if irq.pending_nmi {
            value |= ICSR_NMIPENDSET;
        }
        if irq.pending_pendsv {
            value |= ICSR_PENDSVSET;
        }
        if irq.pending_systick {
            value |= ICSR_PENDSTSET;
        }
        value
    }

    fn write_icsr(value: u32, ctx: &mut PeripheralContext<'_>) {
        let irq = &mut *ctx.irq;
        if value & ICSR_NMIPENDSET != 0 {
            irq.pending_nmi = true;
        }
        if value & ICSR_PENDSVSET != 0 {
            irq.pending_pendsv = true;
        } else if value & ICSR_PENDSVCLR != 0 {
            irq.pending_pendsv = false;
        }
        if value & ICSR_PENDSTSET != 0 {
            irq.pending_systick = true;
        } else if value & ICSR_PENDSTCLR != 0 {
            irq.pending_systick = false;
        }
    }
}

impl Peripheral for Ppb {
    fn name(&self) -> &str {
        "PPB"
    }

    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            SYST_CSR => {
                let flag = if self.countflag { CSR_COUNTFLAG } else { 0 };
                self.countflag = false;
                self.systick_csr | flag
            }
            SYST_RVR => self.systick_rvr,
            SYST_CVR => self.systick.counter(ctx.clock),
            SYST_CALIB => 0,
            NVIC_ISER | NVIC_ICER => ctx.irq.enabled,
            NVIC_ISPR | NVIC_ICPR => ctx.irq.pending,
            NVIC_IPR0..=NVIC_IPR7 => ctx.irq.ipr(((offset - NVIC_IPR0) >> 2) as usize),
            CPUID => CPUID_VALUE,
            ICSR => Self::icsr(ctx),
            VTOR => ctx.irq.vtor,
            AIRCR => AIRCR_VECTKEYSTAT,
            SCR => ctx.irq.scr,
            CCR => CCR_VALUE,
            SHPR2 => ctx.irq.shpr2,
            SHPR3 => ctx.irq.shpr3,
            SHCSR => {
                if ctx.irq.pending_svcall { SHCSR_SVCALLPENDED } else { 0 }
            }
            _ => unknown_read("PPB", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        match offset {
            SYST_CSR => {
                self.systick_csr = value & (CSR_ENABLE | CSR_TICKINT | CSR_CLKSOURCE);
                self.sync_systick(ctx.clock);
            }
            SYST_RVR => {
                self.systick_rvr = value & 0x00FF_FFFF;
                self.systick.set_top(ctx.clock, self.systick_rvr);
                self.sync_systick(ctx.clock);
            }
            SYST_CVR => {
                self.systick.set(ctx.clock, 0, false);
                self.systick.rearm(ctx.clock, self.systick_alarm);
                self.countflag = false;
            }
            NVIC_ISER => ctx.irq.enabled |= value,
            NVIC_ICER => ctx.irq.enabled &= !value,
            NVIC_ISPR => ctx.irq.pending |= value,
            NVIC_ICPR => ctx.irq.pending &= !value,
            NVIC_IPR0..=NVIC_IPR7 => ctx.irq.set_ipr(((offset - NVIC_IPR0) >> 2) as usize, value),
            ICSR => Self::write_icsr(value, ctx),
            VTOR => ctx.irq.vtor = value & 0xFFFF_FF00,
            AIRCR => {
                if value >> 16 != AIRCR_VECTKEY {
                    tracing::warn!(
                        target: "ppb",
                        "AIRCR write {value:#010x} without VECTKEY ignored"
                    );
                } else if value & AIRCR_SYSRESETREQ != 0 {
                    tracing::info!(target: "ppb", "system reset requested");
                    ctx.events.reset_requested = true;
                }
                if value & AIRCR_ENDIANNESS != 0 {
                    tracing::warn!(target: "ppb", "big-endian operation is not supported");
                }
            }
            SCR => ctx.irq.scr = value & 0x16,
            CCR => {}
            SHPR2 => ctx.irq.shpr2 = value & 0xC000_0000,
            SHPR3 => ctx.irq.shpr3 = value & 0xC0C0_0000,
            SHCSR => ctx.irq.pending_svcall = value & SHCSR_SVCALLPENDED != 0,
            _ => unknown_write("PPB", offset, value),
        }
    }

    fn reset(&mut self, ctx: &mut PeripheralContext<'_>) {
        self.systick_csr = 0;
        self.systick_rvr = 0;
        self.countflag = false;
        self.systick.set_top(ctx.clock, 0);
        self.sync_systick(ctx.clock);
        ctx.irq.reset();
    }

    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        self.systick.alarm_handles().collect()
    }

    fn on_alarm(&mut self, handle: AlarmHandle, ctx: &mut PeripheralContext<'_>) {
        if self.systick.match_alarm(handle) != Some(self.systick_alarm) {
            return;
        }
        self.countflag = true;
        if self.systick_csr & CSR_TICKINT != 0 {
            ctx.irq.pending_systick = true;
        }
        self.systick.rearm(ctx.clock, self.systick_alarm);
    }
}
