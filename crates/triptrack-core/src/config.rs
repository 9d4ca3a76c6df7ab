//! Client configuration
//!
//! Every field has a default matching the stock dashboard, so an empty JSON
//! object (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable that overrides [`ClientConfig::base_url`]
pub const URL_ENV_VAR: &str = "TRIPTRACK_URL";

/// Default backend address (the stock backend listens on port 5000)
pub const DEFAULT_BASE_URL: &str = "https://127.0.0.1:5000";

/// Speed (km/h) that fills the gauge completely
pub const MAX_SPEED_GAUGE: f64 = 100.0;

/// Total length of the gauge ring, in renderer units
pub const GAUGE_ARC_LENGTH: f64 = 440.0;

/// Poll period for `/api/status`
pub const POLL_INTERVAL_MS: u64 = 1000;

/// A snapshot older than this is considered stale
pub const STALE_THRESHOLD_SECS: f64 = 5.0;

/// Map zoom used when following the latest path point
pub const FOLLOW_ZOOM: u8 = 16;

/// Delay before GPS acquisition starts
pub const GPS_START_DELAY_MS: u64 = 1000;

/// Timeout for the initial position request
pub const INITIAL_FIX_TIMEOUT_MS: u64 = 10_000;

/// Maximum age of a cached fix the watch subscription may return
pub const WATCH_MAX_AGE_MS: u64 = 1000;

/// Timeout for each watch callback
pub const WATCH_TIMEOUT_MS: u64 = 10_000;

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing `/api`
    pub base_url: String,

    /// Poll period in milliseconds
    pub poll_interval_ms: u64,

    /// Delay before GPS acquisition starts, in milliseconds
    pub gps_start_delay_ms: u64,

    /// User agent sent with every backend request
    pub user_agent: String,

    /// Skip TLS certificate verification (self-signed LAN backends only)
    pub accept_invalid_certs: bool,

    /// Dashboard derivation settings
    pub dashboard: DashboardConfig,

    /// Geolocation request settings
    pub geolocation: GeolocationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: POLL_INTERVAL_MS,
            gps_start_delay_ms: GPS_START_DELAY_MS,
            user_agent: format!("TripTrack/{}", crate::VERSION),
            accept_invalid_certs: false,
            dashboard: DashboardConfig::default(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

/// Settings for the dashboard state computer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Speed (km/h) at which the gauge is full
    pub max_speed_gauge: f64,

    /// Ring length handed to renderers
    pub gauge_arc_length: f64,

    /// Snapshot age (seconds) at which the connection is reported offline
    pub stale_threshold_secs: f64,

    /// Camera zoom when auto-following
    pub follow_zoom: u8,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            max_speed_gauge: MAX_SPEED_GAUGE,
            gauge_arc_length: GAUGE_ARC_LENGTH,
            stale_threshold_secs: STALE_THRESHOLD_SECS,
            follow_zoom: FOLLOW_ZOOM,
        }
    }
}

/// Settings passed to the geolocation provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Ask the provider for its most accurate source
    pub high_accuracy: bool,

    /// Timeout for the one-shot initial request
    pub initial_timeout_ms: u64,

    /// Cache tolerance for the continuous watch
    pub watch_max_age_ms: u64,

    /// Timeout for each watch callback
    pub watch_timeout_ms: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            initial_timeout_ms: INITIAL_FIX_TIMEOUT_MS,
            watch_max_age_ms: WATCH_MAX_AGE_MS,
            watch_timeout_ms: WATCH_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Load a configuration file, falling back to defaults for missing fields
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `TRIPTRACK_URL` if it is set and non-empty
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(URL_ENV_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                self.base_url = url.to_string();
            }
        }
        self
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".into()));
        }
        if reqwest::Url::parse(url).is_err() {
            return Err(ConfigError::Invalid(format!("base_url '{}' is not a URL", url)));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        if !(self.dashboard.max_speed_gauge > 0.0) {
            return Err(ConfigError::Invalid("dashboard.max_speed_gauge must be positive".into()));
        }
        if !(self.dashboard.stale_threshold_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "dashboard.stale_threshold_secs must be positive".into(),
            ));
        }
        if self.geolocation.initial_timeout_ms == 0 || self.geolocation.watch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("geolocation timeouts must be > 0".into()));
        }
        Ok(())
    }

    /// Poll period as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// GPS start delay as a [`Duration`]
    pub fn gps_start_delay(&self) -> Duration {
        Duration::from_millis(self.gps_start_delay_ms)
    }
}
