//! Memory-mapped peripherals.
//!
//! This module contains the register models of the RP2040's on-chip devices: the
//! serial controllers (UART, SPI), timing blocks (TIMER, PWM, watchdog, SysTick in the
//! PPB), the single-cycle I/O block with its interpolators, and the system control
//! blocks the SDK touches during boot.

/// Clock generator block.
pub mod clocks;

/// SIO interpolator.
pub mod interpolator;

/// Cortex-M0+ private peripheral bus (NVIC, SCB, SysTick).
pub mod ppb;

/// PWM slices.
pub mod pwm;

/// Subsystem reset controller.
pub mod resets;

/// Single-cycle I/O block.
pub mod sio;

/// PL022 SPI controller.
pub mod spi;

/// Flash controller SSI.
pub mod ssi;

/// Storage-only and unimplemented placeholder blocks.
pub mod stub;

/// Chip identification blocks.
pub mod sysinfo;

/// Microsecond timer with four alarms.
pub mod timer;

/// PL011 UART.
pub mod uart;

/// Watchdog timer.
pub mod watchdog;

pub use clocks::Clocks;
pub use interpolator::Interpolator;
pub use ppb::Ppb;
pub use pwm::{Channel, Pwm};
pub use resets::Resets;
pub use sio::Sio;
pub use spi::Spi;
pub use ssi::Ssi;
pub use stub::{RegisterBank, Unimplemented};
pub use sysinfo::{SysInfo, Tbman};
pub use timer::Timer;
pub use uart::Uart;
pub use watchdog::Watchdog;

pub use crate::soc::traits::Peripheral;
