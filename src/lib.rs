//! # Dimorphic
//!
//! Weighted multi-indicator anthropometric scoring.
//!
//! Given a partial set of body measurements (centimeters), the engine scores
//! seven indicators (three direct measurements and four derived ratios),
//! splits each indicator's weight between male and female according to its
//! local confidence, and normalizes the totals into a prediction with
//! confidence, certainty and a per-indicator breakdown.
//!
//! The heuristic reproduces population-level dimorphism patterns and is an
//! estimate only; it makes no medical or scientific claim.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Measurements, indicators, calibration tables, pure scoring
//! - `ports`: Trait definitions for calibration persistence
//! - `adapters`: JSON calibration files, log sanitization
//! - `application`: The thread-safe `ScoringEngine`
//! - `config`: Environment-driven settings
//!
//! ## Quick Start
//!
//! ```rust
//! use dimorphic::{Measurements, Prediction, ScoringEngine};
//!
//! let engine = ScoringEngine::with_reference();
//! let measurements = Measurements::new()
//!     .with("shoulder_breadth", 45.0)
//!     .with("standing_height", 182.0);
//!
//! let result = engine.predict_sex(&measurements);
//! assert_eq!(result.prediction, Prediction::Male);
//! assert_eq!(result.indicators_used, 2);
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::ScoringEngine;
pub use domain::{
    Calibration, Indicator, Measurements, Prediction, PredictionResult, Sex, UncertaintyPolicy,
};

/// Result type for Dimorphic operations
pub type Result<T> = std::result::Result<T, DimorphicError>;

/// Main error type for Dimorphic
///
/// Scoring itself never fails; only configuration and I/O do.
#[derive(Debug, thiserror::Error)]
pub enum DimorphicError {
    #[error("Invalid calibration: {0}")]
    Calibration(#[from] domain::CalibrationError),

    #[error("Calibration store failed: {0}")]
    Store(#[from] adapters::StoreError),

    #[error("Invalid measurement input: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Parse a JSON measurement object.
///
/// Non-numeric fields inside the object are dropped rather than rejected.
///
/// # Errors
/// Returns error if the text is not JSON or not a JSON object.
pub fn parse_measurements(input: &str) -> Result<Measurements> {
    match serde_json::from_str::<serde_json::Value>(input)? {
        serde_json::Value::Object(map) => Ok(Measurements::from_json_map(&map)),
        other => {
            let kind = match other {
                serde_json::Value::Null => "null",
                serde_json::Value::Bool(_) => "a boolean",
                serde_json::Value::Number(_) => "a number",
                serde_json::Value::String(_) => "a string",
                serde_json::Value::Array(_) => "an array",
                serde_json::Value::Object(_) => "an object",
            };
            Err(DimorphicError::Validation(format!(
                "expected a JSON object of measurements, got {kind}"
            )))
        }
    }
}
