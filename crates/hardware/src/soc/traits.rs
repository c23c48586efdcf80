//! Peripheral trait for memory-mapped registers.
//!
//! This module defines the `Peripheral` trait implemented by every register block on the
//! bus. It provides:
//! 1. **Identification:** `name` for log output.
//! 2. **Access:** 32-bit register reads and writes at block-relative offsets, plus the
//!    atomic set/clear/xor aliases every RP2040 peripheral exposes.
//! 3. **Lifecycle:** `reset` and alarm dispatch for timed devices.
//! 4. **Downcasting:** Optional casts to concrete peripherals for host-side access.
//!
//! Side effects of a write (interrupt lines, alarm reschedules) happen before the call
//! returns. Unknown offsets are logged and read as zero.

use crate::clock::{AlarmHandle, VirtualClock};
use crate::soc::devices::{Pwm, Spi, Timer, Uart, Watchdog};
use crate::soc::nvic::InterruptController;

/// Atomic access alias selected by address bits 13:12 of a peripheral access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AtomicKind {
    /// Plain write.
    #[default]
    Normal,
    /// `reg ^= value`.
    Xor,
    /// `reg |= value`.
    Set,
    /// `reg &= !value`.
    Clear,
}

impl AtomicKind {
    /// Decodes the alias from a bus address.
    pub const fn from_address(address: u32) -> Self {
        match (address >> 12) & 3 {
            0 => Self::Normal,
            1 => Self::Xor,
            2 => Self::Set,
            _ => Self::Clear,
        }
    }

    /// Combines the current register value with the written value.
    pub const fn apply(self, current: u32, value: u32) -> u32 {
        match self {
            Self::Normal => value,
            Self::Xor => current ^ value,
            Self::Set => current | value,
            Self::Clear => current & !value,
        }
    }
}

/// Machine-level requests raised by peripherals and picked up by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemEvents {
    /// AIRCR.SYSRESETREQ was written.
    pub reset_requested: bool,
    /// The watchdog counted down to zero.
    pub watchdog_fired: bool,
}

/// Shared machine state a peripheral may touch while handling an access.
#[derive(Debug)]
pub struct PeripheralContext<'a> {
    /// The virtual clock, for reading time and (re)scheduling alarms.
    pub clock: &'a mut VirtualClock,
    /// Interrupt lines and core exception state.
    pub irq: &'a mut InterruptController,
    /// Machine-level requests.
    pub events: &'a mut SystemEvents,
}

/// Trait for memory-mapped register blocks attached to the bus.
pub trait Peripheral: Send {
    /// Returns a short name for this peripheral (e.g., `"UART0"`).
    fn name(&self) -> &str;

    /// Reads the register at `offset` (word aligned, relative to the block base).
    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32;

    /// Writes the register at `offset`.
    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>);

    /// Writes through one of the atomic aliases.
    ///
    /// The default performs a read-modify-write through [`Peripheral::read_u32`] and
    /// [`Peripheral::write_u32`].
    fn write_u32_atomic(
        &mut self,
        offset: u32,
        value: u32,
        kind: AtomicKind,
        ctx: &mut PeripheralContext<'_>,
    ) {
        let value = match kind {
            AtomicKind::Normal => value,
            _ => kind.apply(self.read_u32(offset, ctx), value),
        };
        self.write_u32(offset, value, ctx);
    }

    /// Returns the peripheral to its power-on state.
    fn reset(&mut self, _ctx: &mut PeripheralContext<'_>) {}

    /// Clock alarms owned by this peripheral.
    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        Vec::new()
    }

    /// Handles one of this peripheral's alarms firing.
    fn on_alarm(&mut self, _handle: AlarmHandle, _ctx: &mut PeripheralContext<'_>) {}

    /// Returns a mutable reference as `Uart` if this is a UART; otherwise `None`.
    fn as_uart_mut(&mut self) -> Option<&mut Uart> {
        None
    }
    /// Returns a mutable reference as `Spi` if this is an SPI controller; otherwise `None`.
    fn as_spi_mut(&mut self) -> Option<&mut Spi> {
        None
    }
    /// Returns a mutable reference as `Pwm` if this is the PWM block; otherwise `None`.
    fn as_pwm_mut(&mut self) -> Option<&mut Pwm> {
        None
    }
    /// Returns a mutable reference as `Watchdog` if this is the watchdog; otherwise `None`.
    fn as_watchdog_mut(&mut self) -> Option<&mut Watchdog> {
        None
    }
    /// Returns a mutable reference as `Timer` if this is the microsecond timer; otherwise `None`.
    fn as_timer_mut(&mut self) -> Option<&mut Timer> {
        None
    }
}

/// Logs an access to an unknown register offset.
pub(crate) fn unknown_read(name: &str, offset: u32) -> u32 {
    tracing::warn!(target: "soc", "{name}: read from unknown register {offset:#05x}");
    0
}

/// Logs a write to an unknown register offset.
pub(crate) fn unknown_write(name: &str, offset: u32, value: u32) {
    tracing::warn!(target: "soc", "{name}: write {value:#010x} to unknown register {offset:#05x}");
}
