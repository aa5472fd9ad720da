//! Descriptive views over the historical earthquake dataset.
//!
//! Each view needs one or two columns and is skipped when they are absent.
//! Cells that are blank or do not parse count as missing for that view only.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::errors::QuakecastError;
use crate::models::DATE_FORMAT;

/// Number of locations in the frequency ranking.
pub const TOP_LOCATIONS: usize = 10;

/// Number of leading rows shown in the dataset preview.
pub const PREVIEW_ROWS: usize = 100;

const DATE_COLUMNS: [&str; 2] = ["Date", "date"];
const LOCATION_COLUMNS: [&str; 2] = ["location", "place"];

/// A loaded dataset: header names plus raw records.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl Dataset {
    /// Load a comma-delimited dataset with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid CSV.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, QuakecastError> {
        let dataset_err = |reason: String| QuakecastError::Dataset {
            path: path.to_path_buf(),
            reason,
        };

        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| dataset_err(e.to_string()))?;

        let dataset = Self::from_reader(reader).map_err(|e| dataset_err(e.to_string()))?;
        debug!("loaded {} rows, {} columns", dataset.rows.len(), dataset.headers.len());
        Ok(dataset)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader.records().collect::<Result<Vec<_>, csv::Error>>()?;
        Ok(Self { headers, rows })
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.headers.iter().position(|h| h == name))
    }

    /// Text cells of the first matching column; blank cells are `None`.
    fn text_column(&self, names: &[&str]) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(names)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).filter(|cell| !cell.is_empty()))
                .collect(),
        )
    }

    /// Numeric cells of a column; blank or non-numeric cells are `None`.
    fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let cells = self.text_column(&[name])?;
        Some(
            cells
                .into_iter()
                .map(|cell| cell.and_then(|c| c.parse::<f64>().ok()).filter(|v| v.is_finite()))
                .collect(),
        )
    }

    /// Compute every view the dataset's columns allow.
    #[must_use]
    pub fn explore(&self) -> ExplorerReport {
        ExplorerReport {
            rows: self.len(),
            preview: self.preview(PREVIEW_ROWS),
            monthly_counts: self.monthly_counts(),
            top_locations: self.top_locations(TOP_LOCATIONS),
            stations_vs_magnitude: self.relationship("nst", "mag"),
            magnitude_categories: self.magnitude_categories(),
            depth_vs_magnitude: self.relationship("depth", "mag"),
        }
    }

    /// The header with column descriptions and the first `limit` rows as text.
    #[must_use]
    pub fn preview(&self, limit: usize) -> DatasetPreview {
        DatasetPreview {
            columns: self
                .headers
                .iter()
                .map(|name| ColumnInfo {
                    name: name.clone(),
                    description: describe_column(name),
                })
                .collect(),
            rows: self
                .rows
                .iter()
                .take(limit)
                .map(|row| row.iter().map(str::to_string).collect())
                .collect(),
        }
    }

    /// Event counts per calendar month, oldest first.
    #[must_use]
    pub fn monthly_counts(&self) -> Option<Vec<MonthlyCount>> {
        let dates = self.text_column(&DATE_COLUMNS)?;

        let mut counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for date in dates.into_iter().flatten().filter_map(parse_date) {
            *counts.entry((date.year(), date.month())).or_default() += 1;
        }

        Some(
            counts
                .into_iter()
                .map(|((year, month), count)| MonthlyCount {
                    month: format!("{year:04}-{month:02}"),
                    count,
                })
                .collect(),
        )
    }

    /// The most frequent location descriptions, most frequent first.
    #[must_use]
    pub fn top_locations(&self, limit: usize) -> Option<Vec<LocationCount>> {
        let locations = self.text_column(&LOCATION_COLUMNS)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for location in locations.into_iter().flatten() {
            *counts.entry(location).or_default() += 1;
        }

        let mut ranked: Vec<LocationCount> = counts
            .into_iter()
            .map(|(location, count)| LocationCount {
                location: location.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
        ranked.truncate(limit);
        Some(ranked)
    }

    /// Event counts per magnitude category, in category order.
    #[must_use]
    pub fn magnitude_categories(&self) -> Option<Vec<CategoryCount>> {
        let magnitudes = self.numeric_column("mag")?;

        let mut counts = [0usize; MagnitudeCategory::ALL.len()];
        for category in magnitudes.into_iter().flatten().filter_map(MagnitudeCategory::of) {
            counts[category as usize] += 1;
        }

        Some(
            MagnitudeCategory::ALL
                .into_iter()
                .zip(counts)
                .map(|(category, count)| CategoryCount {
                    category: category.label(),
                    count,
                })
                .collect(),
        )
    }

    /// Scatter points of two numeric columns with a fitted trend line.
    #[must_use]
    pub fn relationship(&self, x_column: &str, y_column: &str) -> Option<Relationship> {
        let xs = self.numeric_column(x_column)?;
        let ys = self.numeric_column(y_column)?;

        let points: Vec<[f64; 2]> = xs
            .into_iter()
            .zip(ys)
            .filter_map(|(x, y)| Some([x?, y?]))
            .collect();
        let fit = LinearFit::of(&points);

        Some(Relationship {
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            points,
            fit,
        })
    }
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell, DATE_FORMAT)
        .ok()
        .or_else(|| {
            cell.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
        })
}

/// What a dataset column holds. `None` for columns outside the catalog schema.
#[must_use]
pub fn describe_column(name: &str) -> Option<&'static str> {
    Some(match name {
        "time" => "Time of day of the event (HH:MM:SS)",
        "latitude" => "Latitude of the epicenter",
        "longitude" => "Longitude of the epicenter",
        "depth" => "Depth of the hypocenter in km",
        "mag" => "Event magnitude",
        "magType" => "Magnitude type, e.g. mb, mww, ml",
        "nst" => "Number of seismic stations used to locate the event",
        "gap" => "Largest azimuthal gap between stations in degrees; smaller is better",
        "dmin" => "Distance from the epicenter to the nearest station in degrees",
        "rms" => "Root mean square travel time residual, a location uncertainty indicator",
        "net" => "Network that recorded the event",
        "id" => "Unique event identifier",
        "type" => "Event type, usually \"earthquake\"",
        "horizontalError" => "Estimated horizontal location error in km",
        "depthError" => "Estimated depth error in km",
        "magError" => "Estimated magnitude error",
        "magNst" => "Number of stations used to compute the magnitude",
        "status" => "Review status: reviewed or automatic",
        "locationSource" => "Network that sourced the location",
        "magSource" => "Network that sourced the magnitude",
        "location" | "place" => "Name of the region where the event was recorded",
        "Date" | "date" => "Calendar date of the event (YYYY-MM-DD)",
        _ => return None,
    })
}

/// Magnitude bins with right-open boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeCategory {
    Micro = 0,
    Minor = 1,
    Moderate = 2,
    Strong = 3,
    Major = 4,
}

impl MagnitudeCategory {
    /// Categories in display order.
    pub const ALL: [Self; 5] = [
        Self::Micro,
        Self::Minor,
        Self::Moderate,
        Self::Strong,
        Self::Major,
    ];

    /// Bin a magnitude. Negative and non-finite values fall outside every bin.
    #[must_use]
    pub fn of(mag: f64) -> Option<Self> {
        if !mag.is_finite() || mag < 0.0 {
            return None;
        }
        Some(match mag {
            m if m < 3.0 => Self::Micro,
            m if m < 4.0 => Self::Minor,
            m if m < 5.0 => Self::Moderate,
            m if m < 6.0 => Self::Strong,
            _ => Self::Major,
        })
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Micro => "Micro (<3)",
            Self::Minor => "Minor (3-3.9)",
            Self::Moderate => "Moderate (4-4.9)",
            Self::Strong => "Strong (5-5.9)",
            Self::Major => "Major (>=6)",
        }
    }
}

/// Ordinary least squares line with Pearson correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Absent when the dependent column has no variance
    pub correlation: Option<f64>,
}

impl LinearFit {
    /// Fit a line through `[x, y]` points.
    ///
    /// Needs at least two points and some spread in `x`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(points: &[[f64; 2]]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for [x, y] in points {
            let (dx, dy) = (x - mean_x, y - mean_y);
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }

        if sxx <= f64::EPSILON {
            return None;
        }

        let slope = sxy / sxx;
        let correlation = (syy > f64::EPSILON).then(|| sxy / (sxx * syy).sqrt());

        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
            correlation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// Calendar month as `YYYY-MM`
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: &'static str,
    pub count: usize,
}

/// Scatter data of `y_column` against `x_column`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub x_column: String,
    pub y_column: String,
    pub points: Vec<[f64; 2]>,
    pub fit: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub description: Option<&'static str>,
}

/// Leading rows of the dataset, cells as they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetPreview {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<String>>,
}

/// All views over one dataset. A `None` view had its columns missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerReport {
    pub rows: usize,
    pub preview: DatasetPreview,
    pub monthly_counts: Option<Vec<MonthlyCount>>,
    pub top_locations: Option<Vec<LocationCount>>,
    pub stations_vs_magnitude: Option<Relationship>,
    pub magnitude_categories: Option<Vec<CategoryCount>>,
    pub depth_vs_magnitude: Option<Relationship>,
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    pub(crate) const SAMPLE: &str = "\
time,latitude,longitude,depth,mag,magType,nst,gap,location,Date
01:00:00,-7.1,129.9,40.5,4.6,mb,32,60,\"Kepulauan Tanimbar, Indonesia\",2023-01-08
02:00:00,-7.2,130.1,35.0,5.1,mb,80,45,\"Kepulauan Tanimbar, Indonesia\",2023-01-19
03:00:00,-10.3,110.4,12.0,4.2,mb,,90,\"south of Java, Indonesia\",2023-02-02
04:00:00,-3.1,100.2,60.0,6.3,mww,210,20,\"southwest of Sumatra, Indonesia\",2022-11-30
05:00:00,-8.1,124.9,,2.9,ml,10,120,,2023-01-25
";

    fn dataset(csv: &str) -> Dataset {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv.as_bytes());
        Dataset::from_reader(reader).unwrap()
    }

    #[test]
    fn test_magnitude_bins_are_right_open() {
        assert_eq!(MagnitudeCategory::of(2.9), Some(MagnitudeCategory::Micro));
        assert_eq!(MagnitudeCategory::of(3.0), Some(MagnitudeCategory::Minor));
        assert_eq!(MagnitudeCategory::of(5.9999), Some(MagnitudeCategory::Strong));
        assert_eq!(MagnitudeCategory::of(6.0), Some(MagnitudeCategory::Major));
        assert_eq!(MagnitudeCategory::of(9.5), Some(MagnitudeCategory::Major));
        assert_eq!(MagnitudeCategory::of(-0.5), None);

        assert_eq!(MagnitudeCategory::Micro.label(), "Micro (<3)");
        assert_eq!(MagnitudeCategory::Minor.label(), "Minor (3-3.9)");
        assert_eq!(MagnitudeCategory::Strong.label(), "Strong (5-5.9)");
        assert_eq!(MagnitudeCategory::Major.label(), "Major (>=6)");
    }

    #[test]
    fn test_category_counts_keep_fixed_order() {
        let counts = dataset(SAMPLE).magnitude_categories().unwrap();
        let labels: Vec<_> = counts.iter().map(|c| c.category).collect();
        let values: Vec<_> = counts.iter().map(|c| c.count).collect();

        assert_eq!(
            labels,
            ["Micro (<3)", "Minor (3-3.9)", "Moderate (4-4.9)", "Strong (5-5.9)", "Major (>=6)"]
        );
        assert_eq!(values, [1, 0, 2, 1, 1]);
    }

    #[test]
    fn test_monthly_counts_chronological() {
        let months = dataset(SAMPLE).monthly_counts().unwrap();
        assert_eq!(
            months,
            vec![
                MonthlyCount { month: "2022-11".into(), count: 1 },
                MonthlyCount { month: "2023-01".into(), count: 3 },
                MonthlyCount { month: "2023-02".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_top_locations_ranked() {
        let top = dataset(SAMPLE).top_locations(TOP_LOCATIONS).unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].location, "Kepulauan Tanimbar, Indonesia");
        assert_eq!(top[0].count, 2);
        // ties broken alphabetically
        assert_eq!(top[1].location, "south of Java, Indonesia");
        assert_eq!(top[2].location, "southwest of Sumatra, Indonesia");
    }

    #[test]
    fn test_top_locations_limited() {
        let mut csv = String::from("location\n");
        for i in 0..15 {
            for _ in 0..=i {
                csv.push_str(&format!("place {i:02}\n"));
            }
        }
        let top = dataset(&csv).top_locations(TOP_LOCATIONS).unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].location, "place 14");
        assert_eq!(top[9].location, "place 05");
    }

    #[test]
    fn test_relationship_skips_incomplete_pairs() {
        let rel = dataset(SAMPLE).relationship("nst", "mag").unwrap();
        assert_eq!(rel.points.len(), 4);
        let fit = rel.fit.unwrap();
        assert!(fit.slope > 0.0);
        assert!(fit.correlation.unwrap() > 0.8);

        let depth = dataset(SAMPLE).relationship("depth", "mag").unwrap();
        assert_eq!(depth.points.len(), 4);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let fit = LinearFit::of(&[[0.0, 1.0], [1.0, 3.0], [2.0, 5.0]]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.correlation.unwrap() - 1.0).abs() < 1e-12);

        assert!(LinearFit::of(&[[1.0, 1.0]]).is_none());
        assert!(LinearFit::of(&[[1.0, 1.0], [1.0, 2.0]]).is_none());
        assert_eq!(LinearFit::of(&[[1.0, 2.0], [3.0, 2.0]]).unwrap().correlation, None);
    }

    #[test]
    fn test_missing_columns_skip_views() {
        let report = dataset("mag,depth\n4.5,10\n5.0,30\n").explore();

        assert_eq!(report.rows, 2);
        assert!(report.monthly_counts.is_none());
        assert!(report.top_locations.is_none());
        assert!(report.stations_vs_magnitude.is_none());
        assert!(report.magnitude_categories.is_some());
        assert!(report.depth_vs_magnitude.is_some());
    }

    #[test]
    fn test_legacy_column_names() {
        let report =
            dataset("date,place\n2024-06-01T10:00:00Z,Papua\n2024-06-03,Papua\n").explore();
        let months = report.monthly_counts.unwrap();
        assert_eq!(months, vec![MonthlyCount { month: "2024-06".into(), count: 2 }]);
        assert_eq!(report.top_locations.unwrap()[0].count, 2);
    }

    #[test]
    fn test_preview_is_bounded_and_described() {
        let data = dataset(SAMPLE);

        let preview = data.preview(2);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[0][8], "Kepulauan Tanimbar, Indonesia");
        assert_eq!(preview.columns.len(), 10);
        assert_eq!(preview.columns[0].name, "time");
        assert!(preview.columns.iter().all(|c| c.description.is_some()));

        // blank cells stay blank
        assert_eq!(data.preview(PREVIEW_ROWS).rows[4][3], "");
        assert_eq!(data.explore().preview.rows.len(), 5);
    }

    #[test]
    fn test_unknown_column_has_no_description() {
        let preview = dataset("mag,felt\n4.5,3\n").preview(PREVIEW_ROWS);
        assert_eq!(preview.columns[0].description, Some("Event magnitude"));
        assert_eq!(preview.columns[1].description, None);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 5);
    }

    #[test]
    fn test_load_failure() {
        let err = Dataset::load(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert!(matches!(err, QuakecastError::Dataset { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"mag,depth\n4.5,10\n5.0\n").unwrap();
        assert!(Dataset::load(file.path()).is_err());
    }
}
