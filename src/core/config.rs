//! Process-wide configuration for facility-matrix
//!
//! Loaded once per invocation, from the environment, and passed explicitly
//! into whatever needs it. Nothing reads the environment after startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::coords::CoordinateColumns;
use crate::core::error::{Error, Result};

/// Default endpoint of the distance-matrix API
pub const DEFAULT_DISTANCE_API_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Default source of state boundaries
pub const DEFAULT_BOUNDARY_URL: &str =
    "https://raw.githubusercontent.com/python-visualization/folium/master/examples/data/us-states.json";

/// Configuration for a siting-study run
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Credential sent with every distance query
    pub api_key: Option<String>,

    /// Distance-matrix endpoint
    pub api_url: String,

    /// Travel mode passed to the API
    pub travel_mode: String,

    /// Candidate facilities (matrix rows)
    pub origins_path: PathBuf,
    pub origin_columns: CoordinateColumns,

    /// Existing plants (matrix columns)
    pub destinations_path: PathBuf,
    pub destination_columns: CoordinateColumns,

    /// Append-only checkpoint log
    pub log_path: PathBuf,

    /// Final dense matrix
    pub matrix_path: PathBuf,

    /// Concurrent in-flight queries
    pub workers: usize,

    /// Flush the checkpoint log after this many appends
    pub flush_every: usize,

    /// Per-query timeout
    pub request_timeout: Duration,

    /// GeoJSON feature collection holding state boundaries
    pub boundary_url: String,

    /// `properties.name` of the boundary feature
    pub boundary_name: String,

    /// Approximate number of candidate facilities to generate
    pub grid_target_points: usize,

    /// Raw plant list fed to `clean`
    pub raw_plants_path: PathBuf,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_DISTANCE_API_URL.to_string(),
            travel_mode: "driving".to_string(),
            origins_path: PathBuf::from("possible_facilities.csv"),
            origin_columns: CoordinateColumns { latitude: 0, longitude: 1 },
            destinations_path: PathBuf::from("cleaned_plant_locations.csv"),
            destination_columns: CoordinateColumns { latitude: 1, longitude: 2 },
            log_path: PathBuf::from("progress_log.csv"),
            matrix_path: PathBuf::from("distance_matrix.csv"),
            workers: 10,
            flush_every: 100,
            request_timeout: Duration::from_secs(10),
            boundary_url: DEFAULT_BOUNDARY_URL.to_string(),
            boundary_name: "Massachusetts".to_string(),
            grid_target_points: 150,
            raw_plants_path: PathBuf::from("plant_locations.csv"),
        }
    }
}

impl MatrixConfig {
    /// Build configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unset keys keep their defaults; set but unparseable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.api_key = get("GOOGLE_API_KEY");
        if let Some(url) = get("DISTANCE_API_URL") {
            config.api_url = url;
        }
        if let Some(mode) = get("TRAVEL_MODE") {
            config.travel_mode = mode;
        }
        if let Some(path) = get("ORIGINS_FILE") {
            config.origins_path = PathBuf::from(path);
        }
        if let Some(path) = get("DESTINATIONS_FILE") {
            config.destinations_path = PathBuf::from(path);
        }
        if let Some(path) = get("PROGRESS_LOG") {
            config.log_path = PathBuf::from(path);
        }
        if let Some(path) = get("MATRIX_FILE") {
            config.matrix_path = PathBuf::from(path);
        }
        if let Some(path) = get("RAW_PLANTS_FILE") {
            config.raw_plants_path = PathBuf::from(path);
        }
        if let Some(url) = get("BOUNDARY_URL") {
            config.boundary_url = url;
        }
        if let Some(name) = get("BOUNDARY_NAME") {
            config.boundary_name = name;
        }

        if let Some(v) = get("MATRIX_WORKERS") {
            config.workers = parse_value("MATRIX_WORKERS", &v)?;
        }
        if let Some(v) = get("MATRIX_FLUSH_EVERY") {
            config.flush_every = parse_value("MATRIX_FLUSH_EVERY", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_value("REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("GRID_TARGET_POINTS") {
            config.grid_target_points = parse_value("GRID_TARGET_POINTS", &v)?;
        }
        if let Some(v) = get("ORIGIN_LAT_COLUMN") {
            config.origin_columns.latitude = parse_value("ORIGIN_LAT_COLUMN", &v)?;
        }
        if let Some(v) = get("ORIGIN_LON_COLUMN") {
            config.origin_columns.longitude = parse_value("ORIGIN_LON_COLUMN", &v)?;
        }
        if let Some(v) = get("DESTINATION_LAT_COLUMN") {
            config.destination_columns.latitude = parse_value("DESTINATION_LAT_COLUMN", &v)?;
        }
        if let Some(v) = get("DESTINATION_LON_COLUMN") {
            config.destination_columns.longitude = parse_value("DESTINATION_LON_COLUMN", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the builder cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::ConfigError("MATRIX_WORKERS must be at least 1".to_string()));
        }
        if self.flush_every == 0 {
            return Err(Error::ConfigError("MATRIX_FLUSH_EVERY must be at least 1".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::ConfigError("REQUEST_TIMEOUT_SECS must be at least 1".to_string()));
        }
        Ok(())
    }

    /// API key, required before any query is issued
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ConfigError("GOOGLE_API_KEY is not set".to_string()))
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("{key}: cannot parse '{raw}'")))
}
