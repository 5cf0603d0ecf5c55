//! Ports layer: Trait definitions for external operations.
//!
//! These traits define the boundaries between the scoring engine and the
//! systems it is configured from.

mod calibration_store;

pub use calibration_store::CalibrationStore;
