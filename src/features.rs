//! Single-row feature tables handed to the estimator.
//!
//! The row carries every input attribute of an [`EarthquakeRecord`] under the
//! dataset's column names. The observed `mag` column is the regression target
//! and is never part of a feature row.

use crate::models::{DATE_FORMAT, EarthquakeRecord, TIME_FORMAT};

/// Feature column names, in export order.
pub const FEATURE_COLUMNS: [&str; 21] = [
    "time",
    "latitude",
    "longitude",
    "depth",
    "magType",
    "nst",
    "gap",
    "dmin",
    "rms",
    "horizontalError",
    "depthError",
    "magError",
    "magNst",
    "status",
    "locationSource",
    "magSource",
    "Date",
    "type",
    "location",
    "net",
    "id",
];

/// A single cell of a feature row.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Numeric column; `None` is a missing value
    Number(Option<f64>),
    /// Categorical or free-text column; `None` is a missing value
    Text(Option<String>),
}

impl FeatureValue {
    fn text(value: &str) -> Self {
        if value.is_empty() {
            Self::Text(None)
        } else {
            Self::Text(Some(value.to_string()))
        }
    }

    /// Whether the cell holds a missing value.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Number(None) | Self::Text(None))
    }

    /// Render the cell for delimited text; missing values are empty.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            Self::Number(Some(n)) => n.to_string(),
            Self::Text(Some(s)) => s.clone(),
            Self::Number(None) | Self::Text(None) => String::new(),
        }
    }
}

/// One named row of features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    cells: Vec<(&'static str, FeatureValue)>,
}

impl FeatureRow {
    /// Assemble the feature row for a record.
    #[must_use]
    pub fn from_record(record: &EarthquakeRecord) -> Self {
        let count = |value: Option<u32>| FeatureValue::Number(value.map(f64::from));

        let values = [
            FeatureValue::Text(record.time.map(|t| t.format(TIME_FORMAT).to_string())),
            FeatureValue::Number(record.latitude),
            FeatureValue::Number(record.longitude),
            FeatureValue::Number(record.depth),
            FeatureValue::text(record.mag_type.as_str()),
            count(record.nst),
            FeatureValue::Number(record.gap),
            FeatureValue::Number(record.dmin),
            FeatureValue::Number(record.rms),
            FeatureValue::Number(record.horizontal_error),
            FeatureValue::Number(record.depth_error),
            FeatureValue::Number(record.mag_error),
            count(record.mag_nst),
            FeatureValue::text(record.status.as_str()),
            FeatureValue::text(&record.location_source),
            FeatureValue::text(&record.mag_source),
            FeatureValue::Text(record.date.map(|d| d.format(DATE_FORMAT).to_string())),
            FeatureValue::text(&record.event_type),
            FeatureValue::text(&record.location),
            FeatureValue::text(&record.net),
            FeatureValue::text(&record.id),
        ];

        Self {
            cells: FEATURE_COLUMNS.into_iter().zip(values).collect(),
        }
    }

    /// Look up a cell by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Column names present in the row.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    /// Cells rendered for delimited text, in column order.
    #[must_use]
    pub fn to_cells(&self) -> Vec<String> {
        self.cells.iter().map(|(_, value)| value.to_cell()).collect()
    }

    /// Drop a column from the row.
    #[cfg(test)]
    pub fn without(mut self, column: &str) -> Self {
        self.cells.retain(|(name, _)| *name != column);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MagType;

    #[test]
    fn test_row_has_every_feature_column() {
        let row = FeatureRow::from_record(&EarthquakeRecord::default());
        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, FEATURE_COLUMNS);
        assert!(row.get("mag").is_none());
    }

    #[test]
    fn test_missing_numbers_stay_missing() {
        let record = EarthquakeRecord {
            depth: Some(0.0),
            ..Default::default()
        };
        let row = FeatureRow::from_record(&record);

        assert_eq!(row.get("depth"), Some(&FeatureValue::Number(Some(0.0))));
        assert_eq!(row.get("gap"), Some(&FeatureValue::Number(None)));
        assert!(row.get("nst").is_some_and(FeatureValue::is_missing));
        assert!(row.get("location").is_some_and(FeatureValue::is_missing));
    }

    #[test]
    fn test_cells_render_values() {
        let record = EarthquakeRecord {
            latitude: Some(-8.65),
            nst: Some(40),
            mag_type: MagType::MbLg,
            date: chrono::NaiveDate::from_ymd_opt(2025, 8, 9),
            time: chrono::NaiveTime::from_hms_opt(14, 23, 0),
            ..Default::default()
        };
        let cells = FeatureRow::from_record(&record).to_cells();

        assert_eq!(cells[0], "14:23:00");
        assert_eq!(cells[1], "-8.65");
        assert_eq!(cells[2], "");
        assert_eq!(cells[4], "mb_lg");
        assert_eq!(cells[5], "40");
        assert_eq!(cells[16], "2025-08-09");
        assert_eq!(cells[17], "earthquake");
    }
}
