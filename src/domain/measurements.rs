//! Anthropometric measurement set and derived ratios.
//!
//! Measurements come from the pose/measurement pipeline as a loose JSON
//! object (centimeters). `Measurements` gives every recognized key a named,
//! nullable field so the scoring rules get compile-time coverage while still
//! tolerating partial data.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Hip breadth is estimated from a hip (or waist) circumference by this divisor.
pub const HIP_CIRCUMFERENCE_TO_BREADTH: f64 = 3.5;

/// Keys produced by the manual-input form, mapped onto canonical fields.
/// Canonical keys take precedence when both are present.
const KEY_ALIASES: [(&str, &str); 3] = [
    ("height_cm", "standing_height"),
    ("shoulder_breadth_cm", "shoulder_breadth"),
    ("head_circumference_cm", "head_circumference"),
];

/// A partial set of body measurements in centimeters.
///
/// Any field may be absent. Absence means the dependent indicators are not
/// evaluable, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Measurements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shoulder_breadth: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub standing_height: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_circumference: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hip_circumference: Option<f64>,

    /// Stands in for the hip circumference when that is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist_circumference: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub arm_span: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_arm_length: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_upper_arm_length: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_upper_arm_length: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forearm_length: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_forearm_length: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_forearm_length: Option<f64>,
}

/// Keep a value only if it is a finite, non-negative length.
#[must_use]
pub fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

impl Measurements {
    /// Recognized measurement keys, in field order.
    pub const KEYS: [&'static str; 12] = [
        "shoulder_breadth",
        "standing_height",
        "head_circumference",
        "hip_circumference",
        "waist_circumference",
        "arm_span",
        "upper_arm_length",
        "left_upper_arm_length",
        "right_upper_arm_length",
        "forearm_length",
        "left_forearm_length",
        "right_forearm_length",
    ];

    /// Create an empty measurement set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<f64>> {
        let slot = match key {
            "shoulder_breadth" => &mut self.shoulder_breadth,
            "standing_height" => &mut self.standing_height,
            "head_circumference" => &mut self.head_circumference,
            "hip_circumference" => &mut self.hip_circumference,
            "waist_circumference" => &mut self.waist_circumference,
            "arm_span" => &mut self.arm_span,
            "upper_arm_length" => &mut self.upper_arm_length,
            "left_upper_arm_length" => &mut self.left_upper_arm_length,
            "right_upper_arm_length" => &mut self.right_upper_arm_length,
            "forearm_length" => &mut self.forearm_length,
            "left_forearm_length" => &mut self.left_forearm_length,
            "right_forearm_length" => &mut self.right_forearm_length,
            _ => return None,
        };
        Some(slot)
    }

    /// Raw value stored under a recognized key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "shoulder_breadth" => self.shoulder_breadth,
            "standing_height" => self.standing_height,
            "head_circumference" => self.head_circumference,
            "hip_circumference" => self.hip_circumference,
            "waist_circumference" => self.waist_circumference,
            "arm_span" => self.arm_span,
            "upper_arm_length" => self.upper_arm_length,
            "left_upper_arm_length" => self.left_upper_arm_length,
            "right_upper_arm_length" => self.right_upper_arm_length,
            "forearm_length" => self.forearm_length,
            "left_forearm_length" => self.left_forearm_length,
            "right_forearm_length" => self.right_forearm_length,
            _ => None,
        }
    }

    /// Store a value under a recognized key.
    ///
    /// Returns `false` (and stores nothing) for unknown keys.
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        match self.slot_mut(key) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Builder-style variant of [`Measurements::set`].
    #[must_use]
    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.set(key, value);
        self
    }

    /// Build a measurement set from a loosely-typed JSON object.
    ///
    /// Unknown keys are ignored. Recognized keys holding anything other than
    /// a JSON number are dropped so that one bad field never fails the whole
    /// set.
    #[must_use]
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut measurements = Self::default();

        for key in Self::KEYS {
            let Some(value) = map.get(key) else {
                continue;
            };
            match value.as_f64() {
                Some(v) => {
                    measurements.set(key, v);
                }
                None => tracing::debug!(key, "dropping non-numeric measurement"),
            }
        }

        for (alias, canonical) in KEY_ALIASES {
            if measurements.get(canonical).is_some() {
                continue;
            }
            if let Some(v) = map.get(alias).and_then(Value::as_f64) {
                measurements.set(canonical, v);
            }
        }

        measurements
    }

    /// Number of recognized keys that carry a value (valid or not).
    #[must_use]
    pub fn len(&self) -> usize {
        Self::KEYS.iter().filter(|k| self.get(k).is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper arm length, resolved across sides.
    #[must_use]
    pub fn upper_arm(&self) -> Option<f64> {
        resolve_sided(
            self.upper_arm_length,
            self.left_upper_arm_length,
            self.right_upper_arm_length,
        )
    }

    /// Forearm length, resolved across sides.
    #[must_use]
    pub fn forearm(&self) -> Option<f64> {
        resolve_sided(
            self.forearm_length,
            self.left_forearm_length,
            self.right_forearm_length,
        )
    }

    /// Hip circumference, falling back to the waist circumference.
    #[must_use]
    pub fn hip_operand(&self) -> Option<f64> {
        usable(self.hip_circumference).or_else(|| usable(self.waist_circumference))
    }
}

/// An explicit unprefixed value wins, then the mean of both sides, then
/// whichever side is valid.
fn resolve_sided(both: Option<f64>, left: Option<f64>, right: Option<f64>) -> Option<f64> {
    if let Some(v) = usable(both) {
        return Some(v);
    }
    match (usable(left), usable(right)) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

impl<'de> Deserialize<'de> for Measurements {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_json_map(&map))
    }
}

impl<K: AsRef<str>> FromIterator<(K, f64)> for Measurements {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut measurements = Self::default();
        for (key, value) in iter {
            measurements.set(key.as_ref(), value);
        }
        measurements
    }
}

/// Body ratios derived from a measurement set.
///
/// A ratio is `None` when either operand is missing, invalid or zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedRatios {
    pub shoulder_hip_ratio: Option<f64>,
    pub armspan_height_ratio: Option<f64>,
    pub head_height_ratio: Option<f64>,
    pub upperarm_forearm_ratio: Option<f64>,
}

impl DerivedRatios {
    #[must_use]
    pub fn from_measurements(m: &Measurements) -> Self {
        let shoulder = usable(m.shoulder_breadth);
        let height = usable(m.standing_height);
        let hip_breadth = m.hip_operand().map(|c| c / HIP_CIRCUMFERENCE_TO_BREADTH);

        Self {
            shoulder_hip_ratio: ratio(shoulder, hip_breadth),
            armspan_height_ratio: ratio(usable(m.arm_span), height),
            head_height_ratio: ratio(usable(m.head_circumference), height),
            upperarm_forearm_ratio: ratio(m.upper_arm(), m.forearm()),
        }
    }

    /// Number of ratios that could be computed.
    #[must_use]
    pub fn available(&self) -> usize {
        [
            self.shoulder_hip_ratio,
            self.armspan_height_ratio,
            self.head_height_ratio,
            self.upperarm_forearm_ratio,
        ]
        .iter()
        .filter(|r| r.is_some())
        .count()
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if n == 0.0 || d == 0.0 {
        return None;
    }
    Some(n / d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_ingestion_ignores_noise() {
        let m: Measurements = serde_json::from_value(json!({
            "shoulder_breadth": 42.5,
            "standing_height": "tall",
            "arm_span": null,
            "pose_detected": true,
            "head_circumference": 57
        }))
        .expect("object should parse");

        assert_eq!(m.shoulder_breadth, Some(42.5));
        assert_eq!(m.standing_height, None);
        assert_eq!(m.arm_span, None);
        assert_eq!(m.head_circumference, Some(57.0));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_aliases_fill_missing_canonical_keys() {
        let m: Measurements = serde_json::from_value(json!({
            "height_cm": 171.0,
            "shoulder_breadth": 40.0,
            "shoulder_breadth_cm": 30.0
        }))
        .expect("object should parse");

        assert_eq!(m.standing_height, Some(171.0));
        assert_eq!(m.shoulder_breadth, Some(40.0));
    }

    #[test]
    fn test_non_object_input_is_rejected() {
        assert!(serde_json::from_value::<Measurements>(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_sided_lengths_are_averaged() {
        let m = Measurements::new()
            .with("left_upper_arm_length", 30.0)
            .with("right_upper_arm_length", 32.0)
            .with("right_forearm_length", 22.0);

        assert_eq!(m.upper_arm(), Some(31.0));
        assert_eq!(m.forearm(), Some(22.0));

        let explicit = m.clone().with("upper_arm_length", 29.0);
        assert_eq!(explicit.upper_arm(), Some(29.0));

        let bad_side = Measurements::new()
            .with("left_forearm_length", -1.0)
            .with("right_forearm_length", 21.0);
        assert_eq!(bad_side.forearm(), Some(21.0));
    }

    #[test]
    fn test_waist_is_hip_proxy() {
        let m = Measurements::new().with("waist_circumference", 70.0);
        assert_eq!(m.hip_operand(), Some(70.0));

        let both = m.with("hip_circumference", 98.0);
        assert_eq!(both.hip_operand(), Some(98.0));
    }

    #[test]
    fn test_ratios_require_both_operands() {
        let m = Measurements::new()
            .with("shoulder_breadth", 42.0)
            .with("waist_circumference", 105.0)
            .with("arm_span", 180.0)
            .with("head_circumference", 57.0);

        let ratios = DerivedRatios::from_measurements(&m);
        let shoulder_hip = ratios.shoulder_hip_ratio.expect("hip proxy present");
        assert!((shoulder_hip - 1.4).abs() < 1e-12);
        assert_eq!(ratios.armspan_height_ratio, None);
        assert_eq!(ratios.head_height_ratio, None);
        assert_eq!(ratios.upperarm_forearm_ratio, None);
        assert_eq!(ratios.available(), 1);
    }

    #[test]
    fn test_zero_denominator_leaves_ratio_undefined() {
        let m = Measurements::new()
            .with("arm_span", 170.0)
            .with("standing_height", 0.0);
        assert_eq!(DerivedRatios::from_measurements(&m).armspan_height_ratio, None);
    }

    #[test]
    fn test_from_pairs_skips_unknown_keys() {
        let m: Measurements = [("arm_span", 175.0), ("shoe_size", 44.0)].into_iter().collect();
        assert_eq!(m.arm_span, Some(175.0));
        assert_eq!(m.len(), 1);
    }
}
