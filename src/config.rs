//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `SMARTTRANSIT_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::Position;
use crate::polling::clamp_interval;

pub const DEFAULT_LIVE_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_TRACKING_INTERVAL_MS: u64 = 5000;

/// Poll intervals below this are raised to it
pub const MIN_POLL_INTERVAL_MS: u64 = 500;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SmartTransit backend connection
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Refresh cadence of live views
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_live_interval")]
    pub live_interval_ms: u64,

    #[serde(default = "default_tracking_interval")]
    pub tracking_interval_ms: u64,
}

fn default_live_interval() -> u64 {
    DEFAULT_LIVE_INTERVAL_MS
}

fn default_tracking_interval() -> u64 {
    DEFAULT_TRACKING_INTERVAL_MS
}

impl PollingConfig {
    pub fn live_interval(&self) -> Duration {
        clamp_interval(Duration::from_millis(self.live_interval_ms))
    }

    pub fn tracking_interval(&self) -> Duration {
        clamp_interval(Duration::from_millis(self.tracking_interval_ms))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            live_interval_ms: default_live_interval(),
            tracking_interval_ms: default_tracking_interval(),
        }
    }
}

/// Initial viewport and per-view zoom levels
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    #[serde(default = "default_center_lng")]
    pub center_lng: f64,

    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    #[serde(default = "default_tracking_zoom")]
    pub tracking_zoom: u8,

    #[serde(default = "default_journey_zoom")]
    pub journey_zoom: u8,
}

// Kolkata
fn default_center_lat() -> f64 {
    22.5726
}

fn default_center_lng() -> f64 {
    88.3639
}

fn default_zoom() -> u8 {
    12
}

fn default_tracking_zoom() -> u8 {
    15
}

fn default_journey_zoom() -> u8 {
    13
}

impl MapConfig {
    pub fn center(&self) -> Position {
        Position::new(self.center_lat, self.center_lng)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            default_zoom: default_zoom(),
            tracking_zoom: default_tracking_zoom(),
            journey_zoom: default_journey_zoom(),
        }
    }
}

/// OpenRouteService settings for journeys
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_ors_url")]
    pub ors_url: String,

    /// Empty means "ask the backend's /config"
    #[serde(default)]
    pub ors_key: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default = "default_routing_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ors_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_profile() -> String {
    "driving-car".to_string()
}

fn default_country() -> String {
    "IN".to_string()
}

fn default_routing_timeout() -> u64 {
    15
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ors_url: default_ors_url(),
            ors_key: String::new(),
            profile: default_profile(),
            country: default_country(),
            request_timeout_secs: default_routing_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("smarttransit").join("config.toml")),
            Some(PathBuf::from("/etc/smarttransit/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `SMARTTRANSIT_*` overrides from `lookup`. Unparseable numbers
    /// are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SMARTTRANSIT_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(ms) = lookup("SMARTTRANSIT_LIVE_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.polling.live_interval_ms = ms;
        }
        if let Some(ms) = lookup("SMARTTRANSIT_TRACKING_INTERVAL_MS").and_then(|v| v.parse().ok())
        {
            self.polling.tracking_interval_ms = ms;
        }

        if let Some(url) = lookup("SMARTTRANSIT_ORS_URL") {
            self.routing.ors_url = url;
        }
        if let Some(key) = lookup("SMARTTRANSIT_ORS_KEY") {
            self.routing.ors_key = key;
        }

        if let Some(level) = lookup("SMARTTRANSIT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SMARTTRANSIT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            polling: PollingConfig::default(),
            map: MapConfig::default(),
            routing: RoutingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# SmartTransit Configuration
#
# Environment variables override these settings:
# - SMARTTRANSIT_BACKEND_URL
# - SMARTTRANSIT_LIVE_INTERVAL_MS
# - SMARTTRANSIT_TRACKING_INTERVAL_MS
# - SMARTTRANSIT_ORS_URL
# - SMARTTRANSIT_ORS_KEY
# - SMARTTRANSIT_LOG_LEVEL
# - SMARTTRANSIT_LOG_FORMAT

[backend]
# SmartTransit backend base URL
url = "http://127.0.0.1:8000"

# Request timeout in seconds
request_timeout_secs = 10

[polling]
# Live bus map refresh (ms)
live_interval_ms = 5000

# Single-bus tracking refresh (ms)
tracking_interval_ms = 5000

[map]
# Initial map center (Kolkata)
center_lat = 22.5726
center_lng = 88.3639

# Zoom levels: overview, following a bus, journey overview
default_zoom = 12
tracking_zoom = 15
journey_zoom = 13

[routing]
# OpenRouteService base URL
ors_url = "https://api.openrouteservice.org"

# OpenRouteService API key; leave empty to fetch it from the backend's /config
ors_key = ""

# Directions profile
profile = "driving-car"

# Restrict geocoding to this ISO country code (empty for worldwide)
country = "IN"

# Request timeout in seconds
request_timeout_secs = 15

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.url, "http://127.0.0.1:8000");
        assert_eq!(config.polling.live_interval(), Duration::from_secs(5));
        assert_eq!(config.map.center(), Position::new(22.5726, 88.3639));
        assert_eq!(config.map.tracking_zoom, 15);
        assert!(config.routing.ors_key.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [backend]
            url = "http://transit.local:9000"

            [polling]
            tracking_interval_ms = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "http://transit.local:9000");
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.polling.tracking_interval(), Duration::from_secs(2));
        assert_eq!(config.polling.live_interval_ms, 5000);
        assert_eq!(config.routing.profile, "driving-car");
    }

    #[test]
    fn test_generated_template_matches_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.backend.url, defaults.backend.url);
        assert_eq!(config.polling.live_interval_ms, defaults.polling.live_interval_ms);
        assert_eq!(config.map.journey_zoom, defaults.map.journey_zoom);
        assert_eq!(config.routing.country, defaults.routing.country);
        assert_eq!(config.logging.format, defaults.logging.format);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SMARTTRANSIT_BACKEND_URL", "http://10.0.0.2:8000"),
            ("SMARTTRANSIT_LIVE_INTERVAL_MS", "3000"),
            ("SMARTTRANSIT_TRACKING_INTERVAL_MS", "soon"),
            ("SMARTTRANSIT_ORS_KEY", "ors-123"),
            ("SMARTTRANSIT_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "http://10.0.0.2:8000");
        assert_eq!(config.polling.live_interval_ms, 3000);
        assert_eq!(config.polling.tracking_interval_ms, 5000);
        assert_eq!(config.routing.ors_key, "ors-123");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_interval_floor() {
        let polling = PollingConfig {
            live_interval_ms: 0,
            tracking_interval_ms: 100,
        };
        assert_eq!(polling.live_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
        assert_eq!(polling.tracking_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[backend\nurl = 1").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[map]\ntracking_zoom = 17\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.map.tracking_zoom, 17);
        assert_eq!(config.map.default_zoom, 12);
    }
}
