//! Scoring engine: Owns the active calibration and runs predictions.
//!
//! This service coordinates:
//! - Calibration loading (built-in reference table or a store)
//! - Reconfiguration by whole-table replacement
//! - Prediction and single-indicator evaluation
//!
//! # Concurrency
//!
//! The calibration sits behind `RwLock<Arc<Calibration>>`. Each prediction
//! clones the `Arc` under a short read lock and then scores without holding
//! any lock, so any number of threads may predict at once. `reconfigure`
//! validates the new table and swaps the `Arc` under the write lock.
//!
//! Predictions already in flight finish on the table they started with.
//! Reconfiguring while a batch of evaluations is running is not supported:
//! results within that batch may mix old and new tables.

use std::sync::{Arc, RwLock};

use crate::domain::{
    self, evaluate_indicator, Calibration, DerivedRatios, Indicator, IndicatorDetail,
    Measurements, PredictionResult,
};
use crate::ports::CalibrationStore;
use crate::DimorphicError;

/// Thread-safe front end over the pure scoring functions.
#[derive(Debug)]
pub struct ScoringEngine {
    calibration: RwLock<Arc<Calibration>>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::with_reference()
    }
}

impl ScoringEngine {
    /// Create an engine with the given calibration.
    ///
    /// # Errors
    /// Returns error if the calibration fails validation.
    pub fn new(calibration: Calibration) -> Result<Self, DimorphicError> {
        calibration.validate()?;
        tracing::info!(
            "Scoring engine ready (calibration {})",
            short_fingerprint(&calibration)
        );
        Ok(Self {
            calibration: RwLock::new(Arc::new(calibration)),
        })
    }

    /// Create an engine with the built-in reference calibration.
    #[must_use]
    pub fn with_reference() -> Self {
        Self {
            calibration: RwLock::new(Arc::new(Calibration::reference())),
        }
    }

    /// Create an engine from a calibration store, falling back to the
    /// reference table when the store is empty.
    ///
    /// # Errors
    /// Returns error if the store holds an unreadable or invalid table.
    pub fn from_store<S>(store: &S) -> Result<Self, DimorphicError>
    where
        S: CalibrationStore,
        S::Error: Into<crate::adapters::StoreError>,
    {
        match store.load() {
            Ok(Some(calibration)) => {
                tracing::info!("Loaded calibration from {}", store.location());
                Self::new(calibration)
            }
            Ok(None) => {
                tracing::warn!(
                    "No calibration at {}, using reference table",
                    store.location()
                );
                Ok(Self::with_reference())
            }
            Err(e) => Err(DimorphicError::Store(e.into())),
        }
    }

    /// Create an engine from a calibration store that must hold a table.
    ///
    /// Used when the caller named the store explicitly: a missing table is
    /// an error rather than a silent switch to the reference population.
    ///
    /// # Errors
    /// Returns error if the store is empty, unreadable or invalid.
    pub fn from_store_strict<S>(store: &S) -> Result<Self, DimorphicError>
    where
        S: CalibrationStore,
        S::Error: Into<crate::adapters::StoreError>,
    {
        match store.load() {
            Ok(Some(calibration)) => {
                tracing::info!("Loaded calibration from {}", store.location());
                Self::new(calibration)
            }
            Ok(None) => Err(DimorphicError::Store(
                crate::adapters::StoreError::NotFound(store.location()),
            )),
            Err(e) => Err(DimorphicError::Store(e.into())),
        }
    }

    /// Snapshot of the active calibration.
    #[must_use]
    pub fn calibration(&self) -> Arc<Calibration> {
        match self.calibration.read() {
            Ok(guard) => Arc::clone(&guard),
            // The lock only ever guards an `Arc` swap, which cannot leave it
            // half-written.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the active calibration.
    ///
    /// # Errors
    /// Returns error if the new table fails validation; the old table stays
    /// active in that case.
    pub fn reconfigure(&self, calibration: Calibration) -> Result<(), DimorphicError> {
        calibration.validate()?;
        let fingerprint = short_fingerprint(&calibration);

        let next = Arc::new(calibration);
        match self.calibration.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }

        tracing::info!("Calibration replaced ({fingerprint})");
        Ok(())
    }

    /// Edit a copy of the active calibration and install it.
    ///
    /// # Errors
    /// Returns error if the edited table fails validation.
    pub fn update<F>(&self, edit: F) -> Result<(), DimorphicError>
    where
        F: FnOnce(&mut Calibration),
    {
        let mut next = Calibration::clone(&self.calibration());
        edit(&mut next);
        self.reconfigure(next)
    }

    /// Persist the active calibration.
    ///
    /// # Errors
    /// Returns error if the store rejects the write.
    pub fn save_to<S>(&self, store: &S) -> Result<(), DimorphicError>
    where
        S: CalibrationStore,
        S::Error: Into<crate::adapters::StoreError>,
    {
        store
            .save(&self.calibration())
            .map_err(|e| DimorphicError::Store(e.into()))
    }

    /// Score a measurement set.
    #[must_use]
    pub fn predict_sex(&self, measurements: &Measurements) -> PredictionResult {
        let calibration = self.calibration();
        let result = domain::predict_sex(measurements, &calibration);

        tracing::debug!(
            prediction = %result.prediction,
            confidence = result.confidence,
            indicators_used = result.indicators_used,
            "prediction complete"
        );
        result
    }

    /// Evaluate one indicator value against the active calibration.
    #[must_use]
    pub fn evaluate_indicator(&self, indicator: Indicator, value: f64) -> Option<IndicatorDetail> {
        let calibration = self.calibration();
        let config = calibration.get(indicator)?;
        evaluate_indicator(indicator, value, config, calibration.tie_break)
    }

    /// Ratios the engine would score for a measurement set.
    #[must_use]
    pub fn derive_ratios(&self, measurements: &Measurements) -> DerivedRatios {
        DerivedRatios::from_measurements(measurements)
    }

    /// Human-readable summary of a result.
    #[must_use]
    pub fn explain(&self, result: &PredictionResult) -> String {
        domain::explain(result)
    }
}

fn short_fingerprint(calibration: &Calibration) -> String {
    let mut fingerprint = calibration.fingerprint();
    fingerprint.truncate(12);
    fingerprint
}
