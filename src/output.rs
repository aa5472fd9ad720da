//! Output formatters for explorer reports and predictions.
//!
//! Supports human-readable (with colors) and JSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::explorer::{ExplorerReport, MagnitudeCategory, Relationship};
use crate::models::LastPrediction;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude category colors
const RED: &str = "\x1b[91m"; // Major
const YELLOW: &str = "\x1b[93m"; // Strong
const CYAN: &str = "\x1b[96m"; // Moderate
const GREEN: &str = "\x1b[92m"; // Minor
const WHITE: &str = "\x1b[97m"; // Micro

const ICON_QUAKE: &str = "🌍";

/// Widest bar drawn for a count.
const BAR_WIDTH: usize = 40;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown format: {s} (expected: human, json)")),
        }
    }
}

/// Get the color code for a magnitude value.
fn magnitude_color(mag: f64) -> &'static str {
    match MagnitudeCategory::of(mag) {
        Some(MagnitudeCategory::Major) => RED,
        Some(MagnitudeCategory::Strong) => YELLOW,
        Some(MagnitudeCategory::Moderate) => CYAN,
        Some(MagnitudeCategory::Minor) => GREEN,
        _ => WHITE,
    }
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "█".repeat(width)
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

fn write_section<W: Write>(writer: &mut W, title: &str) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{BOLD}{title}{RESET}")
}

fn write_skipped<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, "  {DIM}(required columns not in dataset){RESET}")
}

fn write_relationship<W: Write>(writer: &mut W, rel: Option<&Relationship>) -> io::Result<()> {
    let Some(rel) = rel else {
        return write_skipped(writer);
    };

    writeln!(writer, "  {} points", rel.points.len())?;
    match rel.fit {
        Some(fit) => {
            writeln!(
                writer,
                "  trend: {y} = {slope:.4} × {x} {sign} {intercept:.4}",
                y = rel.y_column,
                x = rel.x_column,
                slope = fit.slope,
                sign = if fit.intercept < 0.0 { '-' } else { '+' },
                intercept = fit.intercept.abs(),
            )?;
            match fit.correlation {
                Some(r) => writeln!(writer, "  correlation: {r:.3}"),
                None => writeln!(writer, "  correlation: {DIM}undefined{RESET}"),
            }
        }
        None => writeln!(writer, "  {DIM}not enough data for a trend line{RESET}"),
    }
}

/// Write an explorer report as terminal tables.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report_human<W: Write>(writer: &mut W, report: &ExplorerReport) -> io::Result<()> {
    writeln!(
        writer,
        "{ICON_QUAKE} {BOLD}Earthquake dataset{RESET} {DIM}({} rows){RESET}",
        report.rows
    )?;

    if !report.preview.columns.is_empty() {
        write_section(writer, "Columns")?;
        for column in &report.preview.columns {
            writeln!(
                writer,
                "  {:<16} {DIM}{}{RESET}",
                column.name,
                column.description.unwrap_or("-")
            )?;
        }
    }

    write_section(writer, "1. Events per month")?;
    match &report.monthly_counts {
        Some(months) => {
            let max = months.iter().map(|m| m.count).max().unwrap_or(0);
            for m in months {
                let filled = bar(m.count, max);
                writeln!(writer, "  {} {:>6} {CYAN}{filled}{RESET}", m.month, m.count)?;
            }
        }
        None => write_skipped(writer)?,
    }

    write_section(writer, "2. Most frequent locations")?;
    match &report.top_locations {
        Some(locations) => {
            let width = locations.iter().map(|l| l.location.chars().count()).max().unwrap_or(0);
            let max = locations.first().map_or(0, |l| l.count);
            for l in locations {
                writeln!(
                    writer,
                    "  {:<width$} {:>6} {GREEN}{}{RESET}",
                    l.location,
                    l.count,
                    bar(l.count, max)
                )?;
            }
        }
        None => write_skipped(writer)?,
    }

    write_section(writer, "3. Stations (nst) vs magnitude")?;
    write_relationship(writer, report.stations_vs_magnitude.as_ref())?;

    write_section(writer, "4. Events per magnitude category")?;
    match &report.magnitude_categories {
        Some(categories) => {
            let max = categories.iter().map(|c| c.count).max().unwrap_or(0);
            for c in categories {
                let filled = bar(c.count, max);
                writeln!(writer, "  {:<16} {:>6} {YELLOW}{filled}{RESET}", c.category, c.count)?;
            }
        }
        None => write_skipped(writer)?,
    }

    write_section(writer, "5. Depth vs magnitude")?;
    write_relationship(writer, report.depth_vs_magnitude.as_ref())
}

/// Write an explorer report in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(
    writer: &mut W,
    report: &ExplorerReport,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_report_human(writer, report),
        Format::Json => write_json(writer, report),
    }
}

/// Write a prediction in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_prediction<W: Write>(
    writer: &mut W,
    last: &LastPrediction,
    format: Format,
) -> io::Result<()> {
    if format == Format::Json {
        return write_json(writer, last);
    }

    let color = magnitude_color(last.predicted_magnitude);
    let label =
        MagnitudeCategory::of(last.predicted_magnitude).map_or("?", MagnitudeCategory::label);
    let coords = last
        .coordinates
        .map_or_else(|| "?".to_string(), |(lat, lon)| format!("{lat:.2}°, {lon:.2}°"));

    writeln!(
        writer,
        "{ICON_QUAKE} {color}{BOLD}M{mag}{RESET} {DIM}{mag_type}{RESET} │ \
         {color}{label}{RESET} │ {coords} │ {location}",
        mag = last.formatted_magnitude(),
        mag_type = last.record.mag_type,
        location = last.record.location,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::{CategoryCount, ColumnInfo, DatasetPreview, LinearFit};
    use crate::models::EarthquakeRecord;

    fn report() -> ExplorerReport {
        ExplorerReport {
            rows: 3,
            preview: DatasetPreview {
                columns: vec![ColumnInfo {
                    name: "nst".into(),
                    description: Some("Number of seismic stations used to locate the event"),
                }],
                rows: vec![vec!["10".into()], vec!["20".into()]],
            },
            monthly_counts: None,
            top_locations: None,
            stations_vs_magnitude: Some(Relationship {
                x_column: "nst".into(),
                y_column: "mag".into(),
                points: vec![[10.0, 4.0], [20.0, 5.0]],
                fit: LinearFit::of(&[[10.0, 4.0], [20.0, 5.0]]),
            }),
            magnitude_categories: Some(vec![CategoryCount {
                category: "Micro (<3)",
                count: 2,
            }]),
            depth_vs_magnitude: None,
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!("ndjson".parse::<Format>().is_err());
    }

    #[test]
    fn test_human_report_marks_skipped_views() {
        let mut out = Vec::new();
        write_report(&mut out, &report(), Format::Human).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("(3 rows)"));
        assert!(text.contains("Number of seismic stations used to locate the event"));
        assert!(text.contains("Micro (<3)"));
        assert!(text.contains("trend: mag = 0.1000 × nst + 3.0000"));
        assert_eq!(text.matches("required columns not in dataset").count(), 3);
    }

    #[test]
    fn test_json_report() {
        let mut out = Vec::new();
        write_report(&mut out, &report(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["rows"], 3);
        assert!(value["monthly_counts"].is_null());
        assert_eq!(value["magnitude_categories"][0]["count"], 2);
    }

    #[test]
    fn test_prediction_human() {
        let last = LastPrediction {
            record: EarthquakeRecord {
                location: "Bali".into(),
                ..Default::default()
            },
            predicted_magnitude: 5.4,
            coordinates: Some((-8.65, 115.22)),
        };
        let mut out = Vec::new();
        write_prediction(&mut out, &last, Format::Human).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("M5.40"));
        assert!(text.contains("Strong (5-5.9)"));
        assert!(text.contains("-8.65°, 115.22°"));
        assert!(text.contains("Bali"));
    }

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(10, 10).chars().count(), BAR_WIDTH);
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(3, 0), "");
    }
}
