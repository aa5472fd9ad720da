//! Data models for earthquake records and prediction results.
//!
//! Column names follow the historical dataset header
//! (`magType`, `horizontalError`, `Date`, ...).

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::QuakecastError;

/// Date format used by the dataset and the input form.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format used by the dataset and the input form.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Magnitude scale used to compute an event's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MagType {
    #[default]
    Mb,
    Ml,
    Ms,
    Mw,
    Me,
    Mi,
    MbLg,
    Mwb,
    Mwc,
}

impl MagType {
    /// All magnitude types in form order; the first is the default.
    pub const ALL: [Self; 9] = [
        Self::Mb,
        Self::Ml,
        Self::Ms,
        Self::Mw,
        Self::Me,
        Self::Mi,
        Self::MbLg,
        Self::Mwb,
        Self::Mwc,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mb => "mb",
            Self::Ml => "ml",
            Self::Ms => "ms",
            Self::Mw => "mw",
            Self::Me => "me",
            Self::Mi => "mi",
            Self::MbLg => "mb_lg",
            Self::Mwb => "mwb",
            Self::Mwc => "mwc",
        }
    }
}

impl std::str::FromStr for MagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown magnitude type: {s} (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                )
            })
    }
}

impl std::fmt::Display for MagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of an event solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Reviewed,
    Automatic,
}

impl EventStatus {
    pub const ALL: [Self; 2] = [Self::Reviewed, Self::Automatic];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reviewed => "reviewed",
            Self::Automatic => "automatic",
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reviewed" => Ok(Self::Reviewed),
            "automatic" => Ok(Self::Automatic),
            _ => Err(format!("unknown status: {s} (expected: reviewed, automatic)")),
        }
    }
}

/// One observed or user-submitted seismic event.
///
/// Numeric attributes are `None` when absent; absence is never encoded as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeRecord {
    /// Calendar date of the event
    pub date: Option<NaiveDate>,
    /// Time of day of the event
    pub time: Option<NaiveTime>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Depth in kilometers
    pub depth: Option<f64>,

    pub mag_type: MagType,
    /// Observed magnitude; only populated for historical records
    pub mag: Option<f64>,
    pub mag_error: Option<f64>,
    /// Stations used to compute the magnitude
    pub mag_nst: Option<u32>,

    /// Stations used to locate the event
    pub nst: Option<u32>,
    /// Largest azimuthal gap between stations (degrees)
    pub gap: Option<f64>,
    /// Distance to the nearest station (degrees)
    pub dmin: Option<f64>,
    /// RMS travel time residual
    pub rms: Option<f64>,
    pub horizontal_error: Option<f64>,
    pub depth_error: Option<f64>,

    pub status: EventStatus,
    pub location_source: String,
    pub mag_source: String,
    pub net: String,
    pub id: String,
    pub event_type: String,
    /// Human-readable place description; empty until resolved
    pub location: String,
}

impl Default for EarthquakeRecord {
    fn default() -> Self {
        Self {
            date: None,
            time: None,
            latitude: None,
            longitude: None,
            depth: None,
            mag_type: MagType::default(),
            mag: None,
            mag_error: None,
            mag_nst: None,
            nst: None,
            gap: None,
            dmin: None,
            rms: None,
            horizontal_error: None,
            depth_error: None,
            status: EventStatus::default(),
            location_source: "us".to_string(),
            mag_source: "us".to_string(),
            net: "us".to_string(),
            id: String::new(),
            event_type: "earthquake".to_string(),
            location: String::new(),
        }
    }
}

impl EarthquakeRecord {
    /// Coordinate pair, if both latitude and longitude are set.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// A submitted record together with the magnitude predicted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionHistoryEntry {
    pub record: EarthquakeRecord,
    pub predicted_magnitude: f64,
}

/// The most recent prediction, used for the result panel and map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastPrediction {
    pub record: EarthquakeRecord,
    pub predicted_magnitude: f64,
    /// Map center as (latitude, longitude)
    pub coordinates: Option<(f64, f64)>,
}

impl LastPrediction {
    /// Predicted magnitude with two decimals, as displayed to the user.
    #[must_use]
    pub fn formatted_magnitude(&self) -> String {
        format!("{:.2}", self.predicted_magnitude)
    }
}

/// Raw prediction form as submitted by the browser.
///
/// Every control arrives as text; [`PredictionForm::into_record`] turns it
/// into a typed [`EarthquakeRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PredictionForm {
    #[serde(rename = "Date")]
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub depth: String,
    #[serde(rename = "magType")]
    pub mag_type: String,
    pub nst: String,
    pub gap: String,
    pub dmin: String,
    pub rms: String,
    #[serde(rename = "horizontalError")]
    pub horizontal_error: String,
    #[serde(rename = "depthError")]
    pub depth_error: String,
    #[serde(rename = "magError")]
    pub mag_error: String,
    #[serde(rename = "magNst")]
    pub mag_nst: String,
    pub status: String,
    #[serde(rename = "locationSource")]
    pub location_source: String,
    #[serde(rename = "magSource")]
    pub mag_source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub location: String,
    pub net: String,
    pub id: String,
}

impl PredictionForm {
    /// Parse the submitted controls into a record.
    ///
    /// Blank numeric controls become `None`. Blank provenance controls fall
    /// back to their form defaults.
    ///
    /// # Errors
    ///
    /// Returns [`QuakecastError::InvalidInput`] for any non-blank value that
    /// does not parse.
    pub fn into_record(self) -> Result<EarthquakeRecord, QuakecastError> {
        let defaults = EarthquakeRecord::default();

        Ok(EarthquakeRecord {
            date: parse_optional("Date", &self.date, |s| {
                NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| e.to_string())
            })?,
            time: parse_optional("time", &self.time, |s| {
                NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| e.to_string())
            })?,
            latitude: parse_number("latitude", &self.latitude)?,
            longitude: parse_number("longitude", &self.longitude)?,
            depth: parse_number("depth", &self.depth)?,
            mag_type: parse_optional("magType", &self.mag_type, str::parse)?
                .unwrap_or(defaults.mag_type),
            mag: None,
            mag_error: parse_number("magError", &self.mag_error)?,
            mag_nst: parse_count("magNst", &self.mag_nst)?,
            nst: parse_count("nst", &self.nst)?,
            gap: parse_number("gap", &self.gap)?,
            dmin: parse_number("dmin", &self.dmin)?,
            rms: parse_number("rms", &self.rms)?,
            horizontal_error: parse_number("horizontalError", &self.horizontal_error)?,
            depth_error: parse_number("depthError", &self.depth_error)?,
            status: parse_optional("status", &self.status, str::parse)?
                .unwrap_or(defaults.status),
            location_source: text_or(&self.location_source, defaults.location_source),
            mag_source: text_or(&self.mag_source, defaults.mag_source),
            net: text_or(&self.net, defaults.net),
            id: self.id.trim().to_string(),
            event_type: text_or(&self.event_type, defaults.event_type),
            location: self.location.trim().to_string(),
        })
    }
}

fn parse_optional<T>(
    field: &'static str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, QuakecastError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse(raw)
        .map(Some)
        .map_err(|reason| QuakecastError::InvalidInput { field, reason })
}

fn parse_number(field: &'static str, raw: &str) -> Result<Option<f64>, QuakecastError> {
    parse_optional(field, raw, |s| {
        let value: f64 = s.parse().map_err(|e| format!("{e}: {s:?}"))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("value must be finite, got {s}"))
        }
    })
}

fn parse_count(field: &'static str, raw: &str) -> Result<Option<u32>, QuakecastError> {
    parse_optional(field, raw, |s| {
        s.parse::<u32>()
            .map_err(|e| format!("expected a whole station count: {e}"))
    })
}

fn text_or(raw: &str, default: String) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mag_type_parse() {
        assert_eq!("mb".parse::<MagType>().unwrap(), MagType::Mb);
        assert_eq!("MB_LG".parse::<MagType>().unwrap(), MagType::MbLg);
        assert_eq!("mwc".parse::<MagType>().unwrap(), MagType::Mwc);
        assert!("mww".parse::<MagType>().is_err());
        assert_eq!(MagType::default(), MagType::ALL[0]);
    }

    #[test]
    fn test_blank_form_keeps_numbers_absent() {
        let record = PredictionForm::default().into_record().unwrap();

        assert_eq!(record.latitude, None);
        assert_eq!(record.nst, None);
        assert_eq!(record.gap, None);
        assert_eq!(record.mag_type, MagType::Mb);
        assert_eq!(record.status, EventStatus::Reviewed);
        assert_eq!(record.location_source, "us");
        assert_eq!(record.mag_source, "us");
        assert_eq!(record.net, "us");
        assert_eq!(record.event_type, "earthquake");
        assert!(record.location.is_empty());
    }

    #[test]
    fn test_zero_is_not_absent() {
        let form = PredictionForm {
            depth: "0".into(),
            nst: "0".into(),
            ..Default::default()
        };
        let record = form.into_record().unwrap();
        assert_eq!(record.depth, Some(0.0));
        assert_eq!(record.nst, Some(0));
        assert_eq!(record.gap, None);
    }

    #[test]
    fn test_full_form() {
        let form = PredictionForm {
            date: "2025-08-09".into(),
            time: "14:23:00".into(),
            latitude: "-8.65".into(),
            longitude: " 115.22 ".into(),
            depth: "10.2".into(),
            mag_type: "mw".into(),
            nst: "40".into(),
            status: "automatic".into(),
            location: "Bali".into(),
            ..Default::default()
        };
        let record = form.into_record().unwrap();

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 8, 9));
        assert_eq!(record.time, NaiveTime::from_hms_opt(14, 23, 0));
        assert_eq!(record.coordinates(), Some((-8.65, 115.22)));
        assert_eq!(record.mag_type, MagType::Mw);
        assert_eq!(record.status, EventStatus::Automatic);
        assert_eq!(record.location, "Bali");
    }

    #[test]
    fn test_invalid_input_names_field() {
        let form = PredictionForm {
            gap: "wide".into(),
            ..Default::default()
        };
        let err = form.into_record().unwrap_err();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("'gap'"));

        let form = PredictionForm {
            nst: "4.5".into(),
            ..Default::default()
        };
        assert!(form.into_record().is_err());

        let form = PredictionForm {
            mag_type: "richter".into(),
            ..Default::default()
        };
        assert!(form.into_record().is_err());
    }

    #[test]
    fn test_formatted_magnitude() {
        let last = LastPrediction {
            record: EarthquakeRecord::default(),
            predicted_magnitude: 5.4,
            coordinates: None,
        };
        assert_eq!(last.formatted_magnitude(), "5.40");
    }
}
