//! Per-user prediction session.
//!
//! A session owns the latest prediction and the append-only history of
//! every prediction made in it. Nothing outside the session mutates either.

use std::io::Write;

use crate::errors::QuakecastError;
use crate::features::{FEATURE_COLUMNS, FeatureRow};
use crate::models::{EarthquakeRecord, LastPrediction, PredictionHistoryEntry};

/// File name offered for history downloads.
pub const EXPORT_FILE_NAME: &str = "predictions.csv";

/// Export column holding the predicted magnitude.
pub const PREDICTION_COLUMN: &str = "predicted_magnitude";

/// Prediction state of one interactive session.
#[derive(Debug, Default, Clone)]
pub struct Session {
    last: Option<LastPrediction>,
    history: Vec<PredictionHistoryEntry>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent prediction, if any was made.
    #[must_use]
    pub fn last_prediction(&self) -> Option<&LastPrediction> {
        self.last.as_ref()
    }

    /// All predictions in the order they were made.
    #[must_use]
    pub fn history(&self) -> &[PredictionHistoryEntry] {
        &self.history
    }

    /// Record a successful prediction.
    ///
    /// Overwrites the latest prediction and appends to the history.
    pub fn record(
        &mut self,
        record: EarthquakeRecord,
        predicted_magnitude: f64,
    ) -> &LastPrediction {
        self.history.push(PredictionHistoryEntry {
            record: record.clone(),
            predicted_magnitude,
        });

        let coordinates = record.coordinates();
        self.last.insert(LastPrediction {
            record,
            predicted_magnitude,
            coordinates,
        })
    }

    /// Write the full history as CSV, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_history_csv<W: Write>(&self, writer: W) -> Result<(), QuakecastError> {
        let mut csv = csv::Writer::from_writer(writer);

        csv.write_record(FEATURE_COLUMNS.iter().copied().chain([PREDICTION_COLUMN]))?;
        for entry in &self.history {
            let mut cells = FeatureRow::from_record(&entry.record).to_cells();
            cells.push(entry.predicted_magnitude.to_string());
            csv.write_record(&cells)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// The full history as CSV bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_history(&self) -> Result<Vec<u8>, QuakecastError> {
        let mut buf = Vec::new();
        self.write_history_csv(&mut buf)?;
        Ok(buf)
    }
}
