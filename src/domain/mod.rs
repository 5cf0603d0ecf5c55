//! Domain layer: Core scoring types and logic.
//!
//! This module contains pure functions and serializable types only; no I/O
//! and no process-wide state.

mod body;
mod indicator;
mod measurements;
mod prediction;

pub use body::{estimate_bust_circumference_range, BustRange};
pub use indicator::{
    evaluate_indicator, Calibration, CalibrationError, Indicator, IndicatorConfig,
    IndicatorDetail, IndicatorRule, Sex, Verdict,
};
pub use measurements::{usable, DerivedRatios, Measurements, HIP_CIRCUMFERENCE_TO_BREADTH};
pub use prediction::{explain, predict_sex, Prediction, PredictionResult, Scores, UncertaintyPolicy};
