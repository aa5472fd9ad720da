//! Reverse geocoding client.
//!
//! Provides blocking HTTP access to a Nominatim-compatible reverse
//! geocoding endpoint. Uses reqwest with rustls for TLS.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Location text used whenever reverse geocoding yields nothing.
pub const UNKNOWN_LOCATION: &str = "unknown location";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Public Nominatim instance.
pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// User agent string for geocoding requests.
const USER_AGENT: &str = concat!("quakecast/", env!("CARGO_PKG_VERSION"));

/// Ways a reverse geocoding lookup can fail.
#[derive(Error, Debug)]
pub enum GeocodeError {
    /// The service did not answer within the timeout
    #[error("geocoding request timed out")]
    Timeout,

    /// DNS, connect or transport failure
    #[error("geocoding request failed: {0}")]
    Connect(String),

    /// The service answered with an error status
    #[error("geocoding service returned HTTP {status}")]
    Status { status: u16 },

    /// The response body was not the expected JSON
    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Connect(e.to_string())
        }
    }
}

/// Converts a coordinate pair into a human-readable place description.
pub trait Geocoder: Send + Sync {
    /// Look up the address at a coordinate pair.
    ///
    /// Returns `Ok(None)` when the service knows no address there.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup could not be completed.
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocodeError>;
}

/// Reverse geocoding response, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Client for a Nominatim reverse geocoding endpoint.
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    /// Create a new client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimClient {
    #[instrument(skip(self))]
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        debug!("reverse geocoding via {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let body: ReverseResponse = response.json()?;
        if let Some(error) = body.error {
            // Nominatim answers 200 with an error field for open ocean etc.
            debug!("no address found: {}", error);
            return Ok(None);
        }

        Ok(body
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()))
    }
}

/// Resolve a location description for a coordinate pair.
///
/// Never fails: missing coordinates, lookup errors and empty results all
/// yield [`UNKNOWN_LOCATION`].
pub fn resolve_location(geocoder: &dyn Geocoder, coordinates: Option<(f64, f64)>) -> String {
    let Some((latitude, longitude)) = coordinates else {
        warn!("coordinates incomplete, skipping reverse geocoding");
        return UNKNOWN_LOCATION.to_string();
    };

    match geocoder.reverse(latitude, longitude) {
        Ok(Some(address)) if !address.trim().is_empty() => address,
        Ok(_) => {
            warn!(latitude, longitude, "no address for coordinates");
            UNKNOWN_LOCATION.to_string()
        }
        Err(e) => {
            warn!(latitude, longitude, "reverse geocoding failed: {}", e);
            UNKNOWN_LOCATION.to_string()
        }
    }
}
