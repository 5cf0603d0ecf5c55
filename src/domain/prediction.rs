//! Prediction result types and the aggregate scoring procedure.
//!
//! `predict_sex` is a pure function of a measurement set and a calibration
//! table: every evaluable indicator splits its weight between the two sexes
//! according to its local confidence, and the totals are normalized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::indicator::{evaluate_indicator, Calibration, Indicator, IndicatorDetail, Sex};
use super::measurements::{DerivedRatios, Measurements};

/// Discrete outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Male,
    Female,
    /// Only produced by a caller-side [`UncertaintyPolicy`].
    Uncertain,
    InsufficientData,
}

impl From<Sex> for Prediction {
    fn from(sex: Sex) -> Self {
        match sex {
            Sex::Male => Self::Male,
            Sex::Female => Self::Female,
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Uncertain => write!(f, "uncertain"),
            Self::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

/// Normalized aggregate scores. `male + female == 1` whenever any indicator
/// was used.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub male: f64,
    pub female: f64,
}

impl Scores {
    /// Normalize raw weighted totals. An all-zero total (every used weight is
    /// zero) yields an even split.
    #[must_use]
    pub fn normalize(male_total: f64, female_total: f64) -> Self {
        let total = male_total + female_total;
        if total <= 0.0 {
            return Self {
                male: 0.5,
                female: 0.5,
            };
        }
        let male = male_total / total;
        Self {
            male,
            female: 1.0 - male,
        }
    }

    /// The sex with the larger score, `tie_break` on an exact tie.
    #[must_use]
    pub fn leader(&self, tie_break: Sex) -> Sex {
        if self.male > self.female {
            Sex::Male
        } else if self.female > self.male {
            Sex::Female
        } else {
            tie_break
        }
    }
}

/// Full outcome of [`predict_sex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: Prediction,

    /// Winning normalized score, `max(scores.male, scores.female)`.
    pub confidence: f64,

    /// Separation between the two scores, `|male - female|`.
    pub certainty: f64,

    pub scores: Scores,

    pub indicators_used: usize,

    pub total_possible_indicators: usize,

    pub indicator_details: BTreeMap<Indicator, IndicatorDetail>,
}

impl PredictionResult {
    /// Result for a measurement set with no evaluable indicator.
    #[must_use]
    pub fn insufficient_data() -> Self {
        Self {
            prediction: Prediction::InsufficientData,
            confidence: 0.0,
            certainty: 0.0,
            scores: Scores::default(),
            indicators_used: 0,
            total_possible_indicators: Indicator::COUNT,
            indicator_details: BTreeMap::new(),
        }
    }

    /// Human-readable summary of the result.
    #[must_use]
    pub fn explain(&self) -> String {
        explain(self)
    }
}

/// Look up the value an indicator is scored on.
fn indicator_value(indicator: Indicator, m: &Measurements, ratios: &DerivedRatios) -> Option<f64> {
    match indicator {
        Indicator::ShoulderBreadth => m.shoulder_breadth,
        Indicator::StandingHeight => m.standing_height,
        Indicator::HeadCircumference => m.head_circumference,
        Indicator::ShoulderHipRatio => ratios.shoulder_hip_ratio,
        Indicator::ArmspanHeightRatio => ratios.armspan_height_ratio,
        Indicator::HeadHeightRatio => ratios.head_height_ratio,
        Indicator::UpperarmForearmRatio => ratios.upperarm_forearm_ratio,
    }
}

/// Score a measurement set against a calibration table.
///
/// Never fails: unusable fields are excluded, and a set with no evaluable
/// indicator yields [`Prediction::InsufficientData`]. The table is expected
/// to have passed [`Calibration::validate`]; weights that are negative or
/// non-finite count as zero.
#[must_use]
pub fn predict_sex(measurements: &Measurements, calibration: &Calibration) -> PredictionResult {
    let ratios = DerivedRatios::from_measurements(measurements);

    let mut details = BTreeMap::new();
    let mut male_total = 0.0;
    let mut female_total = 0.0;

    for indicator in Indicator::ALL {
        let Some(config) = calibration.get(indicator) else {
            continue;
        };
        let Some(value) = indicator_value(indicator, measurements, &ratios) else {
            continue;
        };
        let Some(detail) = evaluate_indicator(indicator, value, config, calibration.tie_break)
        else {
            continue;
        };

        let (male, female) = detail.components(config.weight);
        male_total += male;
        female_total += female;
        details.insert(indicator, detail);
    }

    if details.is_empty() {
        return PredictionResult::insufficient_data();
    }

    let scores = Scores::normalize(male_total, female_total);

    PredictionResult {
        prediction: scores.leader(calibration.tie_break).into(),
        confidence: scores.male.max(scores.female),
        certainty: (scores.male - scores.female).abs(),
        scores,
        indicators_used: details.len(),
        total_possible_indicators: Indicator::COUNT,
        indicator_details: details,
    }
}

/// Caller-side labelling of weak calls as `uncertain`.
///
/// The engine always commits to male or female once an indicator is used;
/// this policy relabels results whose confidence falls below `cutoff`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyPolicy {
    pub cutoff: f64,
}

impl Default for UncertaintyPolicy {
    fn default() -> Self {
        Self { cutoff: 0.55 }
    }
}

impl UncertaintyPolicy {
    #[must_use]
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    #[must_use]
    pub fn classify(&self, result: &PredictionResult) -> Prediction {
        match result.prediction {
            Prediction::Male | Prediction::Female if result.confidence < self.cutoff => {
                Prediction::Uncertain
            }
            other => other,
        }
    }

    /// Copy of `result` with the policy applied to its prediction.
    #[must_use]
    pub fn apply(&self, result: &PredictionResult) -> PredictionResult {
        PredictionResult {
            prediction: self.classify(result),
            ..result.clone()
        }
    }
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a prediction result as plain text.
#[must_use]
pub fn explain(result: &PredictionResult) -> String {
    if result.prediction == Prediction::InsufficientData {
        return "Insufficient anthropometric data available for reliable sex prediction."
            .to_string();
    }

    let mut text = String::new();
    text.push_str(&format!(
        "Prediction: {}\n",
        result.prediction.to_string().to_uppercase()
    ));
    text.push_str(&format!("Confidence: {:.1}%\n", result.confidence * 100.0));
    text.push_str(&format!("Certainty: {:.1}%\n", result.certainty * 100.0));
    text.push_str(&format!(
        "Based on {} of {} anthropometric indicators\n\n",
        result.indicators_used, result.total_possible_indicators
    ));

    text.push_str("Key indicators:\n");
    for (indicator, detail) in &result.indicator_details {
        let value = if indicator.is_ratio() {
            format!("{:.3}", detail.value)
        } else {
            format!("{:.1}cm", detail.value)
        };
        text.push_str(&format!(
            "• {}: {} → {} ({:.1}%)\n",
            title_case(indicator.name()),
            value,
            detail.prediction,
            detail.confidence * 100.0
        ));
    }

    text.push_str(
        "\nNote: This prediction is based on statistical patterns of sexual dimorphism \
         in human anthropometry and should be interpreted as an estimate only.",
    );
    text
}
