//! Indicators, classification rules and the calibration table.
//!
//! Each indicator is one scalar (a direct measurement or a derived ratio)
//! with a rule that turns its value into a local verdict and a weight that
//! sets its share of the aggregate score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Biological sex as scored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// The seven scored indicators, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    ShoulderBreadth,
    StandingHeight,
    HeadCircumference,
    ShoulderHipRatio,
    ArmspanHeightRatio,
    HeadHeightRatio,
    UpperarmForearmRatio,
}

impl Indicator {
    pub const ALL: [Indicator; 7] = [
        Self::ShoulderBreadth,
        Self::StandingHeight,
        Self::HeadCircumference,
        Self::ShoulderHipRatio,
        Self::ArmspanHeightRatio,
        Self::HeadHeightRatio,
        Self::UpperarmForearmRatio,
    ];

    /// Total number of indicators a prediction can draw on.
    pub const COUNT: usize = Self::ALL.len();

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShoulderBreadth => "shoulder_breadth",
            Self::StandingHeight => "standing_height",
            Self::HeadCircumference => "head_circumference",
            Self::ShoulderHipRatio => "shoulder_hip_ratio",
            Self::ArmspanHeightRatio => "armspan_height_ratio",
            Self::HeadHeightRatio => "head_height_ratio",
            Self::UpperarmForearmRatio => "upperarm_forearm_ratio",
        }
    }

    /// Whether the indicator is a derived ratio (as opposed to a length in cm).
    #[must_use]
    pub fn is_ratio(&self) -> bool {
        !matches!(
            self,
            Self::ShoulderBreadth | Self::StandingHeight | Self::HeadCircumference
        )
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.name() == name)
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification rule for one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorRule {
    /// Direct measurement with an overlap zone `[female_max, male_min]`.
    Threshold { male_min: f64, female_max: f64 },

    /// Ratio scored by distance to a male-typical and a female-typical target.
    Ratio {
        male_typical: f64,
        female_typical: f64,
        /// Score values lying beyond the nearer target at full confidence
        /// instead of decaying with distance.
        #[serde(default)]
        saturate: bool,
    },
}

/// Local outcome of one indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub sex: Sex,
    pub confidence: f64,
}

impl IndicatorRule {
    /// Classify a value, or `None` if it is non-finite or negative.
    #[must_use]
    pub fn evaluate(&self, value: f64, tie_break: Sex) -> Option<Verdict> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }

        let verdict = match *self {
            Self::Threshold {
                male_min,
                female_max,
            } => threshold_verdict(value, male_min, female_max, tie_break),
            Self::Ratio {
                male_typical,
                female_typical,
                saturate,
            } => ratio_verdict(value, male_typical, female_typical, saturate, tie_break),
        };
        Some(verdict)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => "threshold",
            Self::Ratio { .. } => "ratio",
        }
    }
}

fn threshold_verdict(value: f64, male_min: f64, female_max: f64, tie_break: Sex) -> Verdict {
    if value >= male_min {
        return Verdict {
            sex: Sex::Male,
            confidence: 1.0,
        };
    }
    if value <= female_max {
        return Verdict {
            sex: Sex::Female,
            confidence: 1.0,
        };
    }

    // Inside the overlap zone: 0.5 at the midpoint, approaching 1.0 at the edges.
    let midpoint = (male_min + female_max) / 2.0;
    let half_width = (male_min - female_max) / 2.0;
    let sex = if value > midpoint {
        Sex::Male
    } else if value < midpoint {
        Sex::Female
    } else {
        tie_break
    };
    let confidence = 0.5 + 0.5 * (value - midpoint).abs() / half_width;

    Verdict {
        sex,
        confidence: confidence.min(1.0),
    }
}

fn ratio_verdict(
    value: f64,
    male_typical: f64,
    female_typical: f64,
    saturate: bool,
    tie_break: Sex,
) -> Verdict {
    let to_male = (value - male_typical).abs();
    let to_female = (value - female_typical).abs();
    let span = (male_typical - female_typical).abs();

    let (sex, nearest) = if to_male < to_female {
        (Sex::Male, to_male)
    } else if to_female < to_male {
        (Sex::Female, to_female)
    } else {
        (tie_break, to_male)
    };

    let outside = value > male_typical.max(female_typical) || value < male_typical.min(female_typical);
    let confidence = if saturate && outside {
        1.0
    } else {
        (1.0 - nearest / span).clamp(0.0, 1.0)
    };

    Verdict { sex, confidence }
}

/// One row of the calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub rule: IndicatorRule,
    /// Relative weight. Weights need not sum to one.
    pub weight: f64,
}

impl IndicatorConfig {
    #[must_use]
    pub const fn threshold(female_max: f64, male_min: f64, weight: f64) -> Self {
        Self {
            rule: IndicatorRule::Threshold {
                male_min,
                female_max,
            },
            weight,
        }
    }

    #[must_use]
    pub const fn ratio(male_typical: f64, female_typical: f64, weight: f64) -> Self {
        Self {
            rule: IndicatorRule::Ratio {
                male_typical,
                female_typical,
                saturate: false,
            },
            weight,
        }
    }
}

/// Errors raised when a calibration table is not usable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("Missing configuration for indicator {0}")]
    MissingIndicator(Indicator),

    #[error("Invalid weight {weight} for indicator {indicator}: must be finite and non-negative")]
    InvalidWeight { indicator: Indicator, weight: f64 },

    #[error("Invalid thresholds for {indicator}: male_min ({male_min}) must exceed female_max ({female_max})")]
    InvalidThreshold {
        indicator: Indicator,
        male_min: f64,
        female_max: f64,
    },

    #[error("Invalid targets for {indicator}: male ({male_typical}) and female ({female_typical}) must be distinct finite values")]
    InvalidTargets {
        indicator: Indicator,
        male_typical: f64,
        female_typical: f64,
    },

    #[error("Indicator {indicator} requires a {expected} rule")]
    RuleKindMismatch {
        indicator: Indicator,
        expected: &'static str,
    },
}

fn default_tie_break() -> Sex {
    Sex::Male
}

/// The full indicator table plus tie-break policy.
///
/// Loaded once and swapped wholesale on reconfiguration; never mutated while
/// evaluations read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Sex chosen on exact ties (overlap midpoint, equidistant ratio, 50/50 aggregate).
    #[serde(default = "default_tie_break")]
    pub tie_break: Sex,

    pub indicators: BTreeMap<Indicator, IndicatorConfig>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::reference()
    }
}

impl Calibration {
    /// Reference table for an adult population (ANSUR-style approximations).
    #[must_use]
    pub fn reference() -> Self {
        let indicators = BTreeMap::from([
            (Indicator::ShoulderBreadth, IndicatorConfig::threshold(36.0, 38.0, 0.25)),
            (Indicator::StandingHeight, IndicatorConfig::threshold(165.0, 170.0, 0.15)),
            (Indicator::HeadCircumference, IndicatorConfig::threshold(55.0, 56.0, 0.15)),
            (Indicator::ShoulderHipRatio, IndicatorConfig::ratio(1.35, 1.25, 0.20)),
            (Indicator::ArmspanHeightRatio, IndicatorConfig::ratio(1.03, 1.00, 0.10)),
            (Indicator::HeadHeightRatio, IndicatorConfig::ratio(0.33, 0.31, 0.10)),
            (Indicator::UpperarmForearmRatio, IndicatorConfig::ratio(1.45, 1.40, 0.05)),
        ]);

        Self {
            tie_break: Sex::Male,
            indicators,
        }
    }

    #[must_use]
    pub fn get(&self, indicator: Indicator) -> Option<&IndicatorConfig> {
        self.indicators.get(&indicator)
    }

    #[must_use]
    pub fn weight(&self, indicator: Indicator) -> f64 {
        self.get(indicator).map_or(0.0, |c| c.weight)
    }

    pub fn set_weight(&mut self, indicator: Indicator, weight: f64) {
        if let Some(config) = self.indicators.get_mut(&indicator) {
            config.weight = weight;
        }
    }

    pub fn set_rule(&mut self, indicator: Indicator, rule: IndicatorRule) {
        if let Some(config) = self.indicators.get_mut(&indicator) {
            config.rule = rule;
        }
    }

    #[must_use]
    pub fn with_weight(mut self, indicator: Indicator, weight: f64) -> Self {
        self.set_weight(indicator, weight);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, indicator: Indicator, rule: IndicatorRule) -> Self {
        self.set_rule(indicator, rule);
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: Sex) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Check every row of the table.
    ///
    /// # Errors
    /// Returns the first problem found, in indicator order.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for indicator in Indicator::ALL {
            let config = self
                .get(indicator)
                .ok_or(CalibrationError::MissingIndicator(indicator))?;

            if !config.weight.is_finite() || config.weight < 0.0 {
                return Err(CalibrationError::InvalidWeight {
                    indicator,
                    weight: config.weight,
                });
            }

            let expected = if indicator.is_ratio() { "ratio" } else { "threshold" };
            if config.rule.kind() != expected {
                return Err(CalibrationError::RuleKindMismatch {
                    indicator,
                    expected,
                });
            }

            match config.rule {
                IndicatorRule::Threshold {
                    male_min,
                    female_max,
                } => {
                    if !male_min.is_finite() || !female_max.is_finite() || male_min <= female_max {
                        return Err(CalibrationError::InvalidThreshold {
                            indicator,
                            male_min,
                            female_max,
                        });
                    }
                }
                IndicatorRule::Ratio {
                    male_typical,
                    female_typical,
                    ..
                } => {
                    if !male_typical.is_finite()
                        || !female_typical.is_finite()
                        || male_typical == female_typical
                    {
                        return Err(CalibrationError::InvalidTargets {
                            indicator,
                            male_typical,
                            female_typical,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// SHA-256 of the canonical JSON encoding, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        // Serializing plain numbers and enum-keyed maps cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Per-indicator outcome reported in a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDetail {
    pub value: f64,
    pub prediction: Sex,
    pub confidence: f64,
}

impl IndicatorDetail {
    /// Split `weight` into (male, female) components.
    ///
    /// The side matching the local prediction gets `weight * confidence`,
    /// the other side the remainder.
    #[must_use]
    pub fn components(&self, weight: f64) -> (f64, f64) {
        // Negative or non-finite weights contribute nothing.
        let weight = if weight.is_finite() && weight > 0.0 { weight } else { 0.0 };
        let agree = weight * self.confidence;
        let oppose = weight * (1.0 - self.confidence);
        match self.prediction {
            Sex::Male => (agree, oppose),
            Sex::Female => (oppose, agree),
        }
    }
}

/// Evaluate one indicator value against its calibration row.
///
/// Returns `None` when the value is not evaluable (non-finite or negative).
#[must_use]
pub fn evaluate_indicator(
    indicator: Indicator,
    value: f64,
    config: &IndicatorConfig,
    tie_break: Sex,
) -> Option<IndicatorDetail> {
    match config.rule.evaluate(value, tie_break) {
        Some(verdict) => Some(IndicatorDetail {
            value,
            prediction: verdict.sex,
            confidence: verdict.confidence,
        }),
        None => {
            tracing::debug!(%indicator, "indicator not evaluable, excluded");
            None
        }
    }
}
