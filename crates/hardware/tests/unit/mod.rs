//! # Unit Components
//!
//! This module serves as the central hub for the unit tests. It organizes them the way
//! the library is laid out: time base, core, ISA, SoC and the simulation driver.




/// Unit tests for the System-on-Chip components.
///
/// This module organizes tests for the bus, memories and peripheral register models.
pub mod soc;

/// Unit tests for image loading and the batch driver.
pub mod sim;


/// Unit tests for statistics reporting.
pub mod stats;
