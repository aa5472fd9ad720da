//! Pretrained magnitude estimator.
//!
//! The artifact is a fitted linear regression pipeline serialized as JSON:
//! per-column imputation and scaling for numeric features, one-hot
//! coefficients for categorical features, and an intercept.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::errors::QuakecastError;
use crate::features::{FeatureRow, FeatureValue};

/// A loaded estimator: single feature row in, scalar out.
pub trait Estimator {
    /// Predict the magnitude for one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not satisfy the estimator's schema.
    fn predict(&self, row: &FeatureRow) -> Result<f64, QuakecastError>;
}

/// Where estimators come from. Called once per prediction request.
pub trait ModelSource: Send + Sync {
    /// Load the estimator.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact is missing or malformed.
    fn load(&self) -> Result<Box<dyn Estimator>, QuakecastError>;
}

/// Numeric feature term.
#[derive(Debug, Clone, Deserialize)]
pub struct NumericTerm {
    pub column: String,
    pub coefficient: f64,
    /// Value substituted when the feature is missing
    pub impute: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// One-hot encoded categorical feature term.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoricalTerm {
    pub column: String,
    /// Coefficient per known level; unseen levels contribute nothing
    pub levels: BTreeMap<String, f64>,
}

/// Fitted linear regression pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearPipeline {
    /// Columns the pipeline was trained on
    pub columns: Vec<String>,
    pub intercept: f64,
    #[serde(default)]
    pub numeric: Vec<NumericTerm>,
    #[serde(default)]
    pub categorical: Vec<CategoricalTerm>,
}

impl LinearPipeline {
    /// Parse a pipeline from its JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a term is unusable.
    pub fn from_json(path: &Path, json: &str) -> Result<Self, QuakecastError> {
        let load_err = |reason: String| QuakecastError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        let pipeline: Self = serde_json::from_str(json).map_err(|e| load_err(e.to_string()))?;

        for term in &pipeline.numeric {
            if term.scale == 0.0 || !term.scale.is_finite() {
                return Err(load_err(format!(
                    "column '{}' has unusable scale {}",
                    term.column, term.scale
                )));
            }
        }

        let trained: HashSet<&str> = pipeline.columns.iter().map(String::as_str).collect();
        let terms = pipeline
            .numeric
            .iter()
            .map(|t| &t.column)
            .chain(pipeline.categorical.iter().map(|t| &t.column));
        for column in terms {
            if !trained.contains(column.as_str()) {
                return Err(load_err(format!(
                    "term column '{column}' is not a trained column"
                )));
            }
        }

        Ok(pipeline)
    }

    fn check_schema(&self, row: &FeatureRow) -> Result<(), QuakecastError> {
        let present: HashSet<&str> = row.columns().collect();
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !present.contains(c.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(QuakecastError::SchemaMismatch { missing })
        }
    }
}

impl Estimator for LinearPipeline {
    fn predict(&self, row: &FeatureRow) -> Result<f64, QuakecastError> {
        self.check_schema(row)?;

        let mut prediction = self.intercept;

        for term in &self.numeric {
            let value = match row.get(&term.column) {
                Some(FeatureValue::Number(value)) => value.unwrap_or(term.impute),
                Some(FeatureValue::Text(_)) => {
                    return Err(QuakecastError::InvalidFeature {
                        column: term.column.clone(),
                        reason: "expected a numeric value".into(),
                    });
                }
                None => term.impute,
            };
            prediction += term.coefficient * (value - term.mean) / term.scale;
        }

        for term in &self.categorical {
            match row.get(&term.column) {
                Some(FeatureValue::Text(Some(level))) => {
                    prediction += term.levels.get(level).copied().unwrap_or(0.0);
                }
                Some(FeatureValue::Text(None)) | None => {}
                Some(FeatureValue::Number(_)) => {
                    return Err(QuakecastError::InvalidFeature {
                        column: term.column.clone(),
                        reason: "expected a categorical value".into(),
                    });
                }
            }
        }

        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(QuakecastError::InvalidFeature {
                column: "*".into(),
                reason: format!("estimator produced a non-finite result ({prediction})"),
            })
        }
    }
}

/// Loads the pipeline artifact from disk on every request.
#[derive(Debug, Clone)]
pub struct FileModelSource {
    path: PathBuf,
}

impl FileModelSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelSource for FileModelSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Box<dyn Estimator>, QuakecastError> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| QuakecastError::ModelLoad {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let pipeline = LinearPipeline::from_json(&self.path, &json)?;
        debug!(
            "loaded pipeline with {} numeric and {} categorical terms",
            pipeline.numeric.len(),
            pipeline.categorical.len()
        );
        Ok(Box::new(pipeline))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;
    use crate::features::FEATURE_COLUMNS;
    use crate::models::{EarthquakeRecord, MagType};

    /// A small pipeline artifact trained on every feature column.
    pub(crate) fn sample_artifact() -> String {
        serde_json::json!({
            "columns": FEATURE_COLUMNS,
            "intercept": 4.0,
            "numeric": [
                { "column": "nst", "coefficient": 0.01, "impute": 20.0 },
                { "column": "depth", "coefficient": -0.5, "impute": 30.0, "mean": 30.0, "scale": 10.0 }
            ],
            "categorical": [
                { "column": "magType", "levels": { "mb": 0.25, "mw": 0.75 } }
            ]
        })
        .to_string()
    }

    fn pipeline() -> LinearPipeline {
        LinearPipeline::from_json(Path::new("model.json"), &sample_artifact()).unwrap()
    }

    #[test]
    fn test_predict_linear_terms() {
        let record = EarthquakeRecord {
            nst: Some(40),
            depth: Some(10.0),
            mag_type: MagType::Mw,
            ..Default::default()
        };
        let row = FeatureRow::from_record(&record);

        // 4.0 + 0.01*40 - 0.5*(10-30)/10 + 0.75
        let prediction = pipeline().predict(&row).unwrap();
        assert!((prediction - 6.15).abs() < 1e-9);
    }

    #[test]
    fn test_missing_values_are_imputed() {
        let row = FeatureRow::from_record(&EarthquakeRecord::default());

        // nst imputed to 20, depth imputed to its mean, magType mb
        let prediction = pipeline().predict(&row).unwrap();
        assert!((prediction - 4.45).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let row = FeatureRow::from_record(&EarthquakeRecord {
            gap: Some(65.0),
            ..Default::default()
        });
        let model = pipeline();
        assert_eq!(model.predict(&row).unwrap(), model.predict(&row).unwrap());
    }

    #[test]
    fn test_schema_mismatch_is_hard_failure() {
        let row = FeatureRow::from_record(&EarthquakeRecord::default()).without("nst");
        let err = pipeline().predict(&row).unwrap_err();
        assert!(
            matches!(err, QuakecastError::SchemaMismatch { ref missing } if missing == &["nst"])
        );
    }

    #[test]
    fn test_malformed_artifact() {
        let err = LinearPipeline::from_json(Path::new("model.json"), "{ not json").unwrap_err();
        assert!(matches!(err, QuakecastError::ModelLoad { .. }));

        let bad_scale = r#"{"columns":["depth"],"intercept":1,"numeric":[{"column":"depth","coefficient":1,"impute":0,"scale":0}]}"#;
        assert!(LinearPipeline::from_json(Path::new("model.json"), bad_scale).is_err());

        let unknown = r#"{"columns":["depth"],"intercept":1,"numeric":[{"column":"gap","coefficient":1,"impute":0}]}"#;
        assert!(LinearPipeline::from_json(Path::new("model.json"), unknown).is_err());
    }

    #[test]
    fn test_file_source_loads_fresh() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_artifact().as_bytes()).unwrap();

        let source = FileModelSource::new(file.path());
        let row = FeatureRow::from_record(&EarthquakeRecord::default());
        assert!(source.load().unwrap().predict(&row).is_ok());
    }

    #[test]
    fn test_file_source_missing_file() {
        let source = FileModelSource::new("/nonexistent/model.json");
        let err = source.load().err().unwrap();
        assert!(matches!(err, QuakecastError::ModelLoad { .. }));
    }
}
