//! Runtime settings.
//!
//! Read once at startup from the environment:
//! - `DIMORPHIC_CALIBRATION`: path to a calibration JSON file
//! - `DIMORPHIC_UNCERTAINTY_CUTOFF`: confidence below which reported calls are
//!   relabelled `uncertain` (0.5..=1.0); unset means no relabelling
//! - `DIMORPHIC_LOG_MODE`: `stderr` (default) or `file`
//! - `DIMORPHIC_LOG_FILE`: log path for file mode
//!
//! Invalid values fall back to defaults; the rejected entries are kept so the
//! caller can report them once logging is up.

use std::path::PathBuf;

use crate::domain::UncertaintyPolicy;

pub const CALIBRATION_ENV: &str = "DIMORPHIC_CALIBRATION";
pub const UNCERTAINTY_CUTOFF_ENV: &str = "DIMORPHIC_UNCERTAINTY_CUTOFF";
pub const LOG_MODE_ENV: &str = "DIMORPHIC_LOG_MODE";
pub const LOG_FILE_ENV: &str = "DIMORPHIC_LOG_FILE";
/// Read by the log sanitizer, not by [`Settings`].
pub const SANITIZE_MAX_BYTES_ENV: &str = "DIMORPHIC_SANITIZE_MAX_BYTES";

const DEFAULT_LOG_FILE: &str = "dimorphic.log";

/// Where log output goes. Never stdout, which carries results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub calibration_path: Option<PathBuf>,
    pub uncertainty_cutoff: Option<f64>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Environment entries that were present but unusable.
    pub rejected: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibration_path: None,
            uncertainty_cutoff: None,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            rejected: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment (best-effort).
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup(CALIBRATION_ENV).filter(|v| !v.trim().is_empty()) {
            settings.calibration_path = Some(PathBuf::from(path.trim()));
        }

        if let Some(raw) = lookup(UNCERTAINTY_CUTOFF_ENV) {
            match raw.trim().parse::<f64>() {
                Ok(x) if (0.5..=1.0).contains(&x) => settings.uncertainty_cutoff = Some(x),
                _ => settings
                    .rejected
                    .push(format!("{UNCERTAINTY_CUTOFF_ENV}={raw}")),
            }
        }

        if let Some(raw) = lookup(LOG_MODE_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "stderr" | "auto" | "" => settings.log_mode = LogMode::Stderr,
                "file" => settings.log_mode = LogMode::File,
                _ => settings.rejected.push(format!("{LOG_MODE_ENV}={raw}")),
            }
        }

        if let Some(path) = lookup(LOG_FILE_ENV).filter(|v| !v.trim().is_empty()) {
            settings.log_file = PathBuf::from(path.trim());
        }

        settings
    }

    /// Policy for relabelling weak calls, if any.
    ///
    /// An explicit `cutoff` (e.g. from the command line) wins over the
    /// environment.
    #[must_use]
    pub fn uncertainty_policy(&self, cutoff: Option<f64>) -> Option<UncertaintyPolicy> {
        cutoff.or(self.uncertainty_cutoff).map(UncertaintyPolicy::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{predict_sex, Calibration, Measurements, Prediction};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.uncertainty_cutoff, None);
        assert_eq!(settings.uncertainty_policy(None), None);
        assert_eq!(settings.log_mode, LogMode::Stderr);
    }

    #[test]
    fn test_reads_all_keys() {
        let settings = Settings::from_lookup(lookup(&[
            (CALIBRATION_ENV, "/etc/dimorphic/calibration.json"),
            (UNCERTAINTY_CUTOFF_ENV, "0.6"),
            (LOG_MODE_ENV, "FILE"),
            (LOG_FILE_ENV, "/var/log/dimorphic.log"),
        ]));

        assert_eq!(
            settings.calibration_path,
            Some(PathBuf::from("/etc/dimorphic/calibration.json"))
        );
        assert_eq!(settings.uncertainty_cutoff, Some(0.6));
        assert_eq!(settings.log_mode, LogMode::File);
        assert_eq!(settings.log_file, PathBuf::from("/var/log/dimorphic.log"));
        assert!(settings.rejected.is_empty());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            (UNCERTAINTY_CUTOFF_ENV, "0.2"),
            (LOG_MODE_ENV, "syslog"),
        ]));

        assert_eq!(settings.uncertainty_cutoff, None);
        assert_eq!(settings.log_mode, LogMode::Stderr);
        assert_eq!(settings.rejected.len(), 2);
    }

    #[test]
    fn test_env_cutoff_relabels_weak_calls() {
        let settings = Settings::from_lookup(lookup(&[(UNCERTAINTY_CUTOFF_ENV, "0.9")]));
        let weak = predict_sex(
            &Measurements::new().with("shoulder_breadth", 37.05),
            &Calibration::reference(),
        );
        assert_eq!(weak.prediction, Prediction::Male);

        let policy = settings.uncertainty_policy(None).expect("cutoff from environment");
        assert_eq!(policy.cutoff, 0.9);
        assert_eq!(policy.apply(&weak).prediction, Prediction::Uncertain);
    }

    #[test]
    fn test_explicit_cutoff_overrides_env() {
        let settings = Settings::from_lookup(lookup(&[(UNCERTAINTY_CUTOFF_ENV, "0.9")]));
        assert_eq!(settings.uncertainty_policy(Some(0.5)), Some(UncertaintyPolicy::new(0.5)));

        let unset = Settings::default();
        assert_eq!(unset.uncertainty_policy(Some(0.7)), Some(UncertaintyPolicy::new(0.7)));
    }
}
