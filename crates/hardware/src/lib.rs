//! RP2040 system emulator library.
//!
//! This crate implements a deterministic emulator of the RP2040 microcontroller with the
//! following:
//! 1. **Clock:** A discrete-event virtual clock with one-shot alarms and a reusable
//!    32-bit hardware counter with match alarms.
//! 2. **Core:** A Cortex-M0+ executing ARMv6-M Thumb code, with the NVIC exception model.
//! 3. **ISA:** Thumb decoding and disassembly.
//! 4. **SoC:** The address-space router, memories and peripheral register models (UART,
//!    SPI, PWM, TIMER, watchdog, SIO with divider and interpolators, NVIC/SysTick).
//! 5. **Simulation:** Image loaders, configuration, the batch driver and statistics.

/// Virtual clock, alarms and the Timer32 counter.
pub mod clock;
/// Common types and constants (memory map, registers, errors).
pub mod common;
/// Emulator configuration (clocks, driver, boot).
pub mod config;
/// CPU core (arch, execution units, execution, exceptions).
pub mod core;
/// Instruction set (decode, instruction, disassembly).
pub mod isa;
/// Image loaders and the simulation driver.
pub mod sim;
/// System-on-chip (builder, bus, devices, memory, traits).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Main CPU type; holds registers, the system and stats.
pub use crate::core::Cpu;
/// Batch driver around the CPU.
pub use crate::sim::{RunOutcome, Simulator};
/// Top-level system (bus, memories, devices); construct with `System::new`.
pub use crate::soc::System;
