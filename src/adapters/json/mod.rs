//! JSON adapter: Implementation of CalibrationStore over a single file.
//!
//! The file holds the serde encoding of [`Calibration`]. Tables are validated
//! on both load and save, so an invalid file is never handed to the engine.
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so a crash never leaves a half-written table behind.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::{Calibration, CalibrationError};
use crate::ports::CalibrationStore;

/// Error type for calibration store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No calibration stored at {0}")]
    NotFound(String),

    #[error("Invalid calibration format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Invalid calibration: {0}")]
    Invalid(#[from] CalibrationError),
}

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Calibration table stored as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonCalibrationFile {
    path: PathBuf,
}

impl JsonCalibrationFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl CalibrationStore for JsonCalibrationFile {
    type Error = StoreError;

    fn load(&self) -> Result<Option<Calibration>, StoreError> {
        let Some(bytes) = self.read_bytes()? else {
            return Ok(None);
        };

        let calibration: Calibration = serde_json::from_slice(&bytes)?;
        calibration.validate()?;

        tracing::debug!(
            "Loaded calibration from {} (sha256 {})",
            self.path.display(),
            sha256_hex_bytes(&bytes)
        );
        Ok(Some(calibration))
    }

    fn save(&self, calibration: &Calibration) -> Result<(), StoreError> {
        calibration.validate()?;

        let mut bytes = serde_json::to_vec_pretty(calibration)?;
        bytes.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).map_err(|e| self.write_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.write_err(e))?;

        tracing::info!(
            "Saved calibration to {} (sha256 {})",
            self.path.display(),
            sha256_hex_bytes(&bytes)
        );
        Ok(())
    }

    fn fingerprint(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_bytes()?.map(|bytes| sha256_hex_bytes(&bytes)))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Indicator;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_none() {
        let temp = tempdir().expect("tempdir");
        let store = JsonCalibrationFile::new(temp.path().join("absent.json"));

        assert!(store.load().expect("load").is_none());
        assert!(store.fingerprint().expect("fingerprint").is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempdir().expect("tempdir");
        let store = JsonCalibrationFile::new(temp.path().join("nested").join("calibration.json"));

        let calibration = Calibration::reference().with_weight(Indicator::StandingHeight, 0.4);
        store.save(&calibration).expect("save");

        let loaded = store.load().expect("load").expect("stored");
        assert_eq!(loaded, calibration);

        let fingerprint = store.fingerprint().expect("fingerprint").expect("stored");
        assert_eq!(fingerprint.len(), 64);
        assert!(!temp.path().join("nested").join("calibration.json.tmp").exists());
    }

    #[test]
    fn test_save_rejects_invalid_table() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("calibration.json");
        let store = JsonCalibrationFile::new(&path);

        let invalid = Calibration::reference().with_weight(Indicator::ShoulderBreadth, f64::NAN);
        assert!(matches!(store.save(&invalid), Err(StoreError::Invalid(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_garbage_and_invalid_tables() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("calibration.json");
        let store = JsonCalibrationFile::new(&path);

        std::fs::write(&path, b"{ not json").expect("write");
        assert!(matches!(store.load(), Err(StoreError::Format(_))));

        let mut json = serde_json::to_value(Calibration::reference()).expect("serialize");
        json["indicators"]["standing_height"]["rule"]["male_min"] = serde_json::json!(150.0);
        std::fs::write(&path, serde_json::to_vec(&json).expect("encode")).expect("write");
        assert!(matches!(store.load(), Err(StoreError::Invalid(_))));
    }
}
