//! Calibration store port: Trait for persisting indicator tables.
//!
//! Recalibrating for a different reference population means replacing the
//! whole table; this trait abstracts where that table lives.

use crate::domain::Calibration;

/// Trait for calibration persistence.
pub trait CalibrationStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the stored calibration.
    ///
    /// # Returns
    /// `None` if nothing has been stored yet.
    ///
    /// # Errors
    /// Returns error if the stored table cannot be read, parsed or validated.
    fn load(&self) -> Result<Option<Calibration>, Self::Error>;

    /// Persist a calibration, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if the table is invalid or cannot be written.
    fn save(&self, calibration: &Calibration) -> Result<(), Self::Error>;

    /// SHA-256 fingerprint of the stored bytes, `None` if nothing is stored.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    fn fingerprint(&self) -> Result<Option<String>, Self::Error>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}
