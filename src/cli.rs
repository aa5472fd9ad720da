//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};

use crate::geocode::{DEFAULT_TIMEOUT_SECS, NOMINATIM_BASE_URL};
use crate::models::{DATE_FORMAT, EarthquakeRecord, EventStatus, MagType, TIME_FORMAT};
use crate::output::Format;
use crate::server::SESSION_IDLE_TIMEOUT;

/// Earthquake dataset explorer and magnitude prediction dashboard.
#[derive(Parser, Debug)]
#[command(name = "quakecast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web dashboard
    Ui(UiArgs),

    /// Summarize the historical dataset
    Explore(ExploreArgs),

    /// Predict the magnitude of one event
    Predict(PredictArgs),
}

/// Files and services shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
    /// Historical earthquake dataset (CSV)
    #[arg(long, env = "QUAKECAST_DATASET", default_value = "data_gempa.csv")]
    pub dataset: PathBuf,

    /// Pretrained model artifact (JSON)
    #[arg(long, env = "QUAKECAST_MODEL", default_value = "model.json")]
    pub model: PathBuf,

    /// Reverse geocoding service base URL
    #[arg(long, env = "QUAKECAST_GEOCODER_URL", default_value = NOMINATIM_BASE_URL)]
    pub geocoder_url: String,

    /// Reverse geocoding timeout in seconds
    #[arg(long, env = "QUAKECAST_GEOCODE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub geocode_timeout: u64,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    /// Minutes a browser session may stay idle before its history is discarded
    #[arg(
        long,
        env = "QUAKECAST_SESSION_IDLE_MINUTES",
        default_value_t = SESSION_IDLE_TIMEOUT.as_secs() / 60
    )]
    pub session_idle_minutes: u64,

    #[command(flatten)]
    pub resources: ResourceArgs,
}

/// Arguments for the `explore` command.
#[derive(Parser, Debug)]
pub struct ExploreArgs {
    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,

    #[command(flatten)]
    pub resources: ResourceArgs,
}

/// Arguments for the `predict` command.
#[derive(Parser, Debug)]
pub struct PredictArgs {
    /// Event date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Event time of day (HH:MM:SS)
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    /// Depth in km
    #[arg(long)]
    pub depth: Option<f64>,

    /// Magnitude type
    #[arg(long, default_value = "mb", value_parser = parse_mag_type)]
    pub mag_type: MagType,

    /// Number of stations used for location
    #[arg(long)]
    pub nst: Option<u32>,

    /// Azimuthal gap in degrees
    #[arg(long)]
    pub gap: Option<f64>,

    /// Distance to nearest station
    #[arg(long)]
    pub dmin: Option<f64>,

    /// RMS travel time residual
    #[arg(long)]
    pub rms: Option<f64>,

    /// Horizontal location error in km
    #[arg(long)]
    pub horizontal_error: Option<f64>,

    /// Depth error in km
    #[arg(long)]
    pub depth_error: Option<f64>,

    /// Magnitude error
    #[arg(long)]
    pub mag_error: Option<f64>,

    /// Number of stations used for magnitude
    #[arg(long)]
    pub mag_nst: Option<u32>,

    /// Review status: reviewed or automatic
    #[arg(long, default_value = "reviewed", value_parser = parse_status)]
    pub status: EventStatus,

    /// Location source network
    #[arg(long, default_value = "us")]
    pub location_source: String,

    /// Magnitude source network
    #[arg(long, default_value = "us")]
    pub mag_source: String,

    /// Recording network
    #[arg(long, default_value = "us")]
    pub net: String,

    /// Event identifier
    #[arg(long, default_value = "")]
    pub id: String,

    /// Event type
    #[arg(long = "type", default_value = "earthquake")]
    pub event_type: String,

    /// Location description (resolved from coordinates when omitted)
    #[arg(long, default_value = "")]
    pub location: String,

    /// Write the prediction history to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,

    #[command(flatten)]
    pub resources: ResourceArgs,
}

impl PredictArgs {
    /// The event record described by the arguments.
    #[must_use]
    pub fn record(&self) -> EarthquakeRecord {
        EarthquakeRecord {
            date: self.date,
            time: self.time,
            latitude: self.latitude,
            longitude: self.longitude,
            depth: self.depth,
            mag_type: self.mag_type,
            mag: None,
            mag_error: self.mag_error,
            mag_nst: self.mag_nst,
            nst: self.nst,
            gap: self.gap,
            dmin: self.dmin,
            rms: self.rms,
            horizontal_error: self.horizontal_error,
            depth_error: self.depth_error,
            status: self.status,
            location_source: self.location_source.clone(),
            mag_source: self.mag_source.clone(),
            net: self.net.clone(),
            id: self.id.clone(),
            event_type: self.event_type.clone(),
            location: self.location.clone(),
        }
    }
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a magnitude type from string.
fn parse_mag_type(s: &str) -> Result<MagType, String> {
    s.parse()
}

/// Parse an event status from string.
fn parse_status(s: &str) -> Result<EventStatus, String> {
    s.parse()
}

/// Parse a calendar date from string.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| format!("invalid date {s}: {e}"))
}

/// Parse a time of day from string.
fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| format!("invalid time {s}: {e}"))
}
