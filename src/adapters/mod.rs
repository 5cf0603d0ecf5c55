//! Adapters layer: Concrete implementations of ports.
//!
//! - `json`: calibration tables stored as JSON files
//! - `sanitize`: measurement redaction for logs

pub mod json;
pub mod sanitize;

// Re-export store error for lib.rs
pub use json::StoreError;
