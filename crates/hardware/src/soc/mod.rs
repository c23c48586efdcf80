//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated RP2040: the system
//! bus, memory regions, interrupt state, peripheral models, and the builder that
//! assembles them.

/// System builder and peripheral base addresses.
pub mod builder;

/// Memory-mapped peripheral implementations.
pub mod devices;

/// System bus interconnect and routing.
pub mod interconnect;

/// Flat memory regions.
pub mod memory;

/// NVIC and system exception state.
pub mod nvic;

/// Peripheral trait and access context.
pub mod traits;

pub use builder::System;
pub use interconnect::Bus;
pub use nvic::InterruptController;
