//! Garment-fit helpers derived from the same measurement set.

use serde::{Deserialize, Serialize};

use super::measurements::{usable, Measurements};

/// Plausible bust circumference range in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BustRange {
    pub min_cm: f64,
    pub max_cm: f64,
}

fn round_1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn positive(value: Option<f64>) -> Option<f64> {
    usable(value).filter(|v| *v > 0.0)
}

/// Estimate a bust circumference range from shoulder breadth plus waist
/// circumference and/or standing height.
///
/// Returns `None` unless shoulder breadth and at least one of the other two
/// are present.
#[must_use]
pub fn estimate_bust_circumference_range(m: &Measurements) -> Option<BustRange> {
    let shoulder = positive(m.shoulder_breadth)?;
    let waist = positive(m.waist_circumference);
    let height = positive(m.standing_height);
    if waist.is_none() && height.is_none() {
        return None;
    }

    let mut base = shoulder * 2.2;
    if let Some(waist) = waist {
        base += (waist - 70.0) * 0.25;
    }
    if let Some(height) = height {
        // Shorter stature reads as a relatively fuller bust.
        base += (160.0 - height) * 0.15;
    }

    Some(BustRange {
        min_cm: round_1(base * 0.95),
        max_cm: round_1(base * 1.05),
    })
}
