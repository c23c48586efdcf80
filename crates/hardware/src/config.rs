//! Configuration system for the RP2040 emulator.
//!
//! This module defines the configuration structures used to parameterize a machine. It
//! provides:
//! 1. **Defaults:** Clock rates and driver constants of a stock Pico board.
//! 2. **Structures:** Hierarchical config for clocks, simulation and boot.
//! 3. **Enums:** Boot mode selection.
//!
//! Configuration is supplied as JSON; every field is optional and falls back to the
//! defaults below, so `{}` is a valid configuration.

use std::path::Path;

use serde::Deserialize;

use crate::common::SimError;

/// Default configuration constants.
mod defaults {
    /// System clock after the SDK's clock setup (125 MHz).
    pub const SYS_HZ: f64 = 125_000_000.0;

    /// Peripheral clock, derived from `clk_sys` by the SDK (125 MHz).
    pub const PERI_HZ: f64 = 125_000_000.0;

    /// Reference clock, running from the 12 MHz crystal.
    pub const REF_HZ: f64 = 12_000_000.0;

    /// Instructions executed per driver batch before yielding to the host.
    pub const BATCH_STEPS: u64 = 1_000_000;

    /// Vector table address in flash, after the 256-byte boot stage 2.
    pub const VECTOR_TABLE: u32 = 0x1000_0100;
}

/// Where the core fetches its initial stack pointer and reset vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootMode {
    /// Run the boot ROM from address 0; requires a boot ROM image.
    Bootrom,
    /// Skip the boot ROM and boot stage 2, starting from the flash vector table.
    #[default]
    Flash,
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use picosim_core::config::{BootMode, Config};
///
/// let json = r#"{ "clocks": { "sys_hz": 48000000 }, "boot": { "mode": "bootrom" } }"#;
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.clocks.sys_hz, 48_000_000.0);
/// assert_eq!(config.clocks.peri_hz, 125_000_000.0);
/// assert_eq!(config.boot.mode, BootMode::Bootrom);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Clock frequencies.
    #[serde(default)]
    pub clocks: ClockConfig,
    /// Driver behaviour.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Reset behaviour.
    #[serde(default)]
    pub boot: BootConfig,
}

impl Config {
    /// Parses a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        serde_json::from_str(json).map_err(|e| SimError::Config(e.to_string()))
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }
}

/// Clock tree frequencies.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// Processor clock in Hz; one core cycle is `1e9 / sys_hz` ns.
    #[serde(default = "ClockConfig::default_sys_hz")]
    pub sys_hz: f64,

    /// Peripheral clock in Hz, feeding UART and SPI baud generators.
    #[serde(default = "ClockConfig::default_peri_hz")]
    pub peri_hz: f64,

    /// Reference clock in Hz, feeding the watchdog tick generator.
    #[serde(default = "ClockConfig::default_ref_hz")]
    pub ref_hz: f64,
}

impl ClockConfig {
    fn default_sys_hz() -> f64 {
        defaults::SYS_HZ
    }

    fn default_peri_hz() -> f64 {
        defaults::PERI_HZ
    }

    fn default_ref_hz() -> f64 {
        defaults::REF_HZ
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sys_hz: defaults::SYS_HZ,
            peri_hz: defaults::PERI_HZ,
            ref_hz: defaults::REF_HZ,
        }
    }
}

/// Simulator driver settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Maximum instructions per [`Simulator::run_batch`](crate::sim::Simulator::run_batch) call.
    #[serde(default = "SimulationConfig::default_batch_steps")]
    pub batch_steps: u64,

    /// Reset the machine when the watchdog fires.
    #[serde(default = "SimulationConfig::default_watchdog_reset")]
    pub watchdog_reset: bool,

    /// Log every executed instruction at `trace` level.
    #[serde(default)]
    pub trace_instructions: bool,
}

impl SimulationConfig {
    fn default_batch_steps() -> u64 {
        defaults::BATCH_STEPS
    }

    fn default_watchdog_reset() -> bool {
        true
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            batch_steps: defaults::BATCH_STEPS,
            watchdog_reset: true,
            trace_instructions: false,
        }
    }
}

/// Reset configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BootConfig {
    /// Boot path.
    #[serde(default)]
    pub mode: BootMode,

    /// Vector table used by [`BootMode::Flash`].
    #[serde(default = "BootConfig::default_vector_table")]
    pub vector_table: u32,
}

impl BootConfig {
    fn default_vector_table() -> u32 {
        defaults::VECTOR_TABLE
    }

    /// Address the core reads its initial SP and reset vector from.
    pub const fn vector_base(&self) -> u32 {
        match self.mode {
            BootMode::Bootrom => 0,
            BootMode::Flash => self.vector_table,
        }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            mode: BootMode::Flash,
            vector_table: defaults::VECTOR_TABLE,
        }
    }
}
