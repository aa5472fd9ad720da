//! Error types for quakecast.
//!
//! Uses `thiserror` for library-style error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in quakecast operations.
#[derive(Error, Debug)]
pub enum QuakecastError {
    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text could not be read or written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Dataset could not be loaded for exploration
    #[error("Failed to load dataset {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },

    /// Model artifact is missing, unreadable or malformed
    #[error("Failed to load model artifact {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Feature row lacks columns the estimator was trained on
    #[error("Feature row does not match model schema, missing columns: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// A feature value has the wrong kind for its column
    #[error("Invalid value for feature '{column}': {reason}")]
    InvalidFeature { column: String, reason: String },

    /// User-supplied form value could not be parsed
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl QuakecastError {
    /// Whether the error was caused by the submitted input rather than the model.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_lists_columns() {
        let err = QuakecastError::SchemaMismatch {
            missing: vec!["gap".into(), "rms".into()],
        };
        assert_eq!(
            err.to_string(),
            "Feature row does not match model schema, missing columns: gap, rms"
        );
        assert!(!err.is_input_error());
    }
}
