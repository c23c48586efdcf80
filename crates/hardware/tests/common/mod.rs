//! # Common Test Utilities
//!
//! Shared infrastructure used across the unit tests.


/// `TestContext`: a full machine with code loaded into SRAM.
pub mod harness;


/// Installs a test-friendly `tracing` subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::WARN)
        .try_init();
}
