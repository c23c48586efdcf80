//! Interrupt and exception pending state.
//!
//! This module implements the state shared between the core and the private peripheral
//! bus. It provides:
//! 1. **IRQ Lines:** Level-sensitive external interrupt inputs with pending/enable bitmaps.
//! 2. **System Exceptions:** NMI, HardFault, SVCall, PendSV and SysTick pending flags.
//! 3. **Priorities:** Two-bit priorities for IRQs (NVIC_IPRn) and system handlers (SHPR2/3).
//! 4. **Arbitration:** Selection of the highest-priority pending exception.

use crate::common::constants::{
    EXC_HARDFAULT, EXC_IRQ0, EXC_NMI, EXC_PENDSV, EXC_RESET, EXC_SVCALL, EXC_SYSTICK, NUM_IRQS,
};

/// Priority value lower than any configurable priority, used for Thread mode.
pub const THREAD_PRIORITY: i32 = 4;

/// NVIC and SCB exception state of the core.
#[derive(Clone, Debug, Default)]
pub struct InterruptController {
    /// Pending external IRQs.
    pub pending: u32,
    /// Enabled external IRQs (NVIC_ISER).
    pub enabled: u32,
    levels: u32,
    priorities: [u8; NUM_IRQS],
    /// NMI pending.
    pub pending_nmi: bool,
    /// HardFault pending, raised by escalation.
    pub pending_hardfault: bool,
    /// SVCall pending.
    pub pending_svcall: bool,
    /// PendSV pending.
    pub pending_pendsv: bool,
    /// SysTick pending.
    pub pending_systick: bool,
    /// Vector table offset register.
    pub vtor: u32,
    /// System handler priority register 2 (SVCall in bits 31:30).
    pub shpr2: u32,
    /// System handler priority register 3 (PendSV 23:22, SysTick 31:30).
    pub shpr3: u32,
    /// System control register (SLEEPONEXIT, SLEEPDEEP, SEVONPEND).
    pub scr: u32,
    /// Exception currently being handled (IPSR), mirrored here for ICSR.VECTACTIVE.
    pub vect_active: u32,
}

impl InterruptController {
    /// Creates the reset state: nothing pending or enabled, all priorities 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives an external interrupt line.
    ///
    /// A rising level pends the IRQ. Lowering the line clears the pending bit, so a
    /// peripheral that deasserts its interrupt retracts a request not yet taken.
    pub fn set_interrupt(&mut self, irq: u32, level: bool) {
        if irq as usize >= NUM_IRQS {
            tracing::warn!(target: "nvic", "set_interrupt on invalid IRQ {irq}");
            return;
        }
        let bit = 1u32 << irq;
        if level {
            self.levels |= bit;
            self.pending |= bit;
        } else {
            self.levels &= !bit;
            self.pending &= !bit;
        }
    }

    /// Current level of an external interrupt line.
    pub const fn line_level(&self, irq: u32) -> bool {
        irq < 32 && self.levels & (1 << irq) != 0
    }

    /// Two-bit priority of an external IRQ.
    pub fn irq_priority(&self, irq: u32) -> u8 {
        self.priorities.get(irq as usize).copied().unwrap_or(0)
    }

    /// Reads NVIC_IPRn (four IRQs, priority in bits 7:6 of each byte).
    pub fn ipr(&self, index: usize) -> u32 {
        (0..4).fold(0, |acc, lane| {
            let prio = self.priorities.get(index * 4 + lane).copied().unwrap_or(0);
            acc | u32::from(prio) << (lane * 8 + 6)
        })
    }

    /// Writes NVIC_IPRn.
    pub fn set_ipr(&mut self, index: usize, value: u32) {
        for lane in 0..4 {
            if let Some(p) = self.priorities.get_mut(index * 4 + lane) {
                *p = ((value >> (lane * 8 + 6)) & 3) as u8;
            }
        }
    }

    /// Priority of an exception number; lower is more urgent.
    pub fn exception_priority(&self, exception: u32) -> i32 {
        match exception {
            EXC_RESET => -3,
            EXC_NMI => -2,
            EXC_HARDFAULT => -1,
            EXC_SVCALL => (self.shpr2 >> 30) as i32,
            EXC_PENDSV => ((self.shpr3 >> 22) & 3) as i32,
            EXC_SYSTICK => (self.shpr3 >> 30) as i32,
            n if n >= EXC_IRQ0 => i32::from(self.irq_priority(n - EXC_IRQ0)),
            _ => THREAD_PRIORITY,
        }
    }

    /// Highest-priority pending and enabled exception, with its priority.
    ///
    /// Ties are broken by the lower exception number.
    pub fn highest_pending(&self) -> Option<(u32, i32)> {
        let system = [
            (self.pending_nmi, EXC_NMI),
            (self.pending_hardfault, EXC_HARDFAULT),
            (self.pending_svcall, EXC_SVCALL),
            (self.pending_pendsv, EXC_PENDSV),
            (self.pending_systick, EXC_SYSTICK),
        ];
        let mut best: Option<(u32, i32)> = None;
        let mut consider = |exc: u32| {
            let prio = self.exception_priority(exc);
            if best.is_none_or(|(_, p)| prio < p) {
                best = Some((exc, prio));
            }
        };
        for (pending, exc) in system {
            if pending {
                consider(exc);
            }
        }
        let mut active = self.pending & self.enabled;
        while active != 0 {
            let irq = active.trailing_zeros();
            consider(EXC_IRQ0 + irq);
            active &= active - 1;
        }
        best
    }

    /// Highest pending exception regardless of enables, for ICSR.VECTPENDING.
    pub fn vect_pending(&self) -> u32 {
        if self.pending_nmi {
            return EXC_NMI;
        }
        let mut masked = self.clone();
        masked.enabled = u32::MAX;
        masked.highest_pending().map_or(0, |(exc, _)| exc)
    }

    /// Whether any exception could wake a sleeping core.
    pub fn wake_pending(&self) -> bool {
        self.pending & self.enabled != 0
            || self.pending_nmi
            || self.pending_hardfault
            || self.pending_svcall
            || self.pending_pendsv
            || self.pending_systick
    }

    /// Clears the pending state of an exception as it is taken.
    ///
    /// An IRQ whose line is still asserted pends again immediately.
    pub fn acknowledge(&mut self, exception: u32) {
        match exception {
            EXC_NMI => self.pending_nmi = false,
            EXC_HARDFAULT => self.pending_hardfault = false,
            EXC_SVCALL => self.pending_svcall = false,
            EXC_PENDSV => self.pending_pendsv = false,
            EXC_SYSTICK => self.pending_systick = false,
            n if n >= EXC_IRQ0 && n < EXC_IRQ0 + NUM_IRQS as u32 => {
                let bit = 1u32 << (n - EXC_IRQ0);
                self.pending = (self.pending & !bit) | (self.levels & bit);
            }
            _ => {}
        }
    }

    /// Returns to the reset state, keeping the interrupt line levels.
    pub fn reset(&mut self) {
        let levels = self.levels;
        *self = Self::default();
        self.levels = levels;
        self.pending = levels;
    }
}
