//! Prediction workflow: input record in, recorded prediction out.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::errors::QuakecastError;
use crate::estimator::ModelSource;
use crate::features::{FeatureRow, FeatureValue};
use crate::geocode::{Geocoder, resolve_location};
use crate::models::{EarthquakeRecord, LastPrediction, PredictionForm};
use crate::session::Session;

/// Runs predictions against a model source and a geocoder.
///
/// The workflow itself is stateless; all state lives in the [`Session`]
/// passed to each call.
#[derive(Clone)]
pub struct PredictionWorkflow {
    model: Arc<dyn ModelSource>,
    geocoder: Arc<dyn Geocoder>,
}

impl PredictionWorkflow {
    #[must_use]
    pub fn new(model: Arc<dyn ModelSource>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { model, geocoder }
    }

    /// Parse a submitted form and predict for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid or inference fails. The
    /// session is left untouched in either case.
    pub fn submit<'s>(
        &self,
        session: &'s mut Session,
        form: PredictionForm,
    ) -> Result<&'s LastPrediction, QuakecastError> {
        let record = form.into_record()?;
        self.predict(session, record)
    }

    /// Predict the magnitude for a record and store it in the session.
    ///
    /// The model is loaded first, so a missing artifact fails without a
    /// geocoding round trip. An empty location is then filled in by reverse
    /// geocoding before the feature row is assembled.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or rejects the row.
    #[instrument(skip_all, fields(id = %record.id))]
    pub fn predict<'s>(
        &self,
        session: &'s mut Session,
        mut record: EarthquakeRecord,
    ) -> Result<&'s LastPrediction, QuakecastError> {
        let estimator = self.model.load()?;

        if record.location.trim().is_empty() {
            record.location = resolve_location(self.geocoder.as_ref(), record.coordinates());
        }

        let row = FeatureRow::from_record(&record);
        let missing = row
            .columns()
            .filter(|c| row.get(c).is_some_and(FeatureValue::is_missing))
            .count();
        debug!(missing, "feature row assembled");

        let predicted = estimator.predict(&row)?;

        info!(
            predicted_magnitude = predicted,
            location = %record.location,
            "magnitude predicted"
        );

        Ok(session.record(record, predicted))
    }
}
