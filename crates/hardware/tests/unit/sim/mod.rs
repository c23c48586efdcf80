
/// Batch outcomes, sleep skipping and machine resets.
pub mod simulator;
