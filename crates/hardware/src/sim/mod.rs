//! Simulation driver and program loading.
//!
//! Provides the loaders that place firmware images into memory and the driver that
//! runs the core against the virtual clock.

/// Firmware image loaders (UF2, ELF, raw binary, boot ROM).
pub mod loader;

/// Batch execution driver.
pub mod simulator;

pub use loader::{ImageFormat, load_image};
pub use simulator::{RunOutcome, Simulator};
