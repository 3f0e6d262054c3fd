//! Pipeline configuration and its resolution
//!
//! Values are resolved in priority order:
//! 1. Command-line flags (applied by the binary after resolution)
//! 2. Environment variables (`DYFI_DATA_DIR`, `DYFI_SEARCH_URL`)
//! 3. TOML config file (`DYFI_CONFIG`, else `<config_dir>/dyfi/config.toml`)
//! 4. Compiled defaults for the South Carolina swarm
//!
//! The resolved [`PipelineConfig`] is built once at startup and passed by
//! reference to every pipeline component; nothing mutates it afterwards.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// USGS FDSN event search endpoint (GeoJSON flavour)
pub const DEFAULT_SEARCH_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query.geojson";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "DYFI_DATA_DIR";

/// Environment variable overriding the search endpoint
pub const SEARCH_URL_ENV: &str = "DYFI_SEARCH_URL";

/// Environment variable naming an explicit TOML config file
pub const CONFIG_PATH_ENV: &str = "DYFI_CONFIG";

/// Geographic search box in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min_latitude: 31.977,
            max_latitude: 35.261,
            min_longitude: -83.485,
            max_longitude: -77.86,
        }
    }
}

/// Retry settings for idempotent HTTP requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts in total, including the first one
    pub max_attempts: u32,
    /// Base of the exponential backoff schedule
    pub backoff_factor_ms: u64,
    /// Response statuses that trigger a retry
    pub retry_statuses: Vec<u16>,
    /// HTTP methods eligible for retry
    pub allowed_methods: Vec<String>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor_ms: 1000,
            retry_statuses: vec![429, 500, 502, 503, 504],
            allowed_methods: vec!["HEAD".to_string(), "GET".to_string(), "OPTIONS".to_string()],
        }
    }
}

/// HTTP client settings shared by every request of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub user_agent: String,
    pub retry: RetrySettings,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_050,
            read_timeout_ms: 27_000,
            user_agent: format!("dyfi-fetch/{}", env!("CARGO_PKG_VERSION")),
            retry: RetrySettings::default(),
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the persisted per-event tree
    pub data_dir: PathBuf,
    /// Event search endpoint
    pub search_url: String,
    pub bounding_box: BoundingBox,
    /// First day of the search window; the window always ends today
    pub start_date: NaiveDate,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    /// Concurrent detail-document fetches
    pub detail_workers: usize,
    /// Concurrent resource fetches per persist phase
    pub persist_workers: usize,
    /// Upper bound on the wall time of a single fan-out phase
    pub phase_deadline_secs: u64,
    pub http: HttpSettings,
    /// Write the raw discovery response to `SC_Earthquake.geojson`
    pub save_raw_discovery: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            bounding_box: BoundingBox::default(),
            // 2021-12-01 is always a valid calendar date
            start_date: NaiveDate::from_ymd_opt(2021, 12, 1).unwrap_or_default(),
            min_magnitude: 1.0,
            max_magnitude: 10.0,
            detail_workers: 8,
            persist_workers: 6,
            phase_deadline_secs: 600,
            http: HttpSettings::default(),
            save_raw_discovery: false,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from TOML text; absent keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load a configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply `DYFI_DATA_DIR` / `DYFI_SEARCH_URL` when set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = non_empty_env(DATA_DIR_ENV) {
            debug!(data_dir = %dir, "Data directory overridden from environment");
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty_env(SEARCH_URL_ENV) {
            debug!(search_url = %url, "Search URL overridden from environment");
            self.search_url = url;
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.detail_workers == 0 || self.persist_workers == 0 {
            return Err(Error::Config("worker counts must be at least 1".to_string()));
        }
        if self.min_magnitude > self.max_magnitude {
            return Err(Error::Config(format!(
                "min_magnitude {} exceeds max_magnitude {}",
                self.min_magnitude, self.max_magnitude
            )));
        }
        let bbox = &self.bounding_box;
        if bbox.min_latitude > bbox.max_latitude || bbox.min_longitude > bbox.max_longitude {
            return Err(Error::Config(format!("inverted bounding box: {:?}", bbox)));
        }
        if self.http.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.search_url.trim().is_empty() {
            return Err(Error::Config("search_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn phase_deadline(&self) -> Duration {
        Duration::from_secs(self.phase_deadline_secs)
    }
}

/// Resolve the pipeline configuration from TOML, environment and defaults
pub fn resolve_pipeline_config() -> Result<PipelineConfig> {
    let mut config = match locate_config_file()? {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::load_from_file(&path)?
        }
        None => {
            debug!("No config file found, using compiled defaults");
            PipelineConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Find the TOML config file, if any
///
/// An explicit `DYFI_CONFIG` path must exist; the per-user default is optional.
fn locate_config_file() -> Result<Option<PathBuf>> {
    if let Some(explicit) = non_empty_env(CONFIG_PATH_ENV) {
        let path = PathBuf::from(explicit);
        if !path.exists() {
            return Err(Error::Config(format!(
                "{} points to a missing file: {}",
                CONFIG_PATH_ENV,
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    match default_config_path() {
        Some(path) if path.exists() => Ok(Some(path)),
        Some(path) => {
            debug!("Config file not present: {}", path.display());
            Ok(None)
        }
        None => {
            warn!("Could not determine a config directory for this platform");
            Ok(None)
        }
    }
}

/// `<config_dir>/dyfi/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dyfi").join("config.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
