//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "clubhub.toml",
    "./config/config.toml",
    "/etc/clubhub/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found), apply environment overrides, validate.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [`load`](Self::load) without the final validation step.
    pub fn load_unvalidated(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config)?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("CLUBHUB_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        // HTTP
        if let Some(port) = parsed("CLUBHUB_HTTP_PORT")? {
            config.http.port = port;
        }
        if let Ok(val) = env::var("CLUBHUB_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("CLUBHUB_CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Auth
        if let Ok(val) = env::var("CLUBHUB_JWT_SECRET") {
            config.auth.jwt_secret = val;
        }
        if let Ok(val) = env::var("CLUBHUB_JWT_ISSUER") {
            config.auth.issuer = val;
        }
        if let Ok(val) = env::var("CLUBHUB_JWT_AUDIENCE") {
            config.auth.audience = val;
        }

        // Cache
        if let Some(ttl) = parsed("CLUBHUB_CACHE_DASHBOARD_TTL_SECS")? {
            config.cache.dashboard_ttl_secs = ttl;
        }
        if let Some(ttl) = parsed("CLUBHUB_CACHE_AVAILABILITY_TTL_SECS")? {
            config.cache.availability_ttl_secs = ttl;
        }
        if let Some(max) = parsed("CLUBHUB_CACHE_MAX_ENTRIES")? {
            config.cache.max_entries = max;
        }
        if let Ok(val) = env::var("CLUBHUB_CACHE_SINGLE_FLIGHT") {
            config.cache.single_flight = val.parse().unwrap_or(true);
        }

        // Upstream collaborators
        let upstream = &mut config.upstream;
        for (var, target) in [
            ("CLUBHUB_IDENTITY_URL", &mut upstream.identity_url),
            ("CLUBHUB_ANALYTICS_URL", &mut upstream.analytics_url),
            ("CLUBHUB_CLIENTS_URL", &mut upstream.clients_url),
            ("CLUBHUB_RESERVATIONS_URL", &mut upstream.reservations_url),
            ("CLUBHUB_COURTS_URL", &mut upstream.courts_url),
            ("CLUBHUB_PRICING_URL", &mut upstream.pricing_url),
        ] {
            if let Ok(val) = env::var(var) {
                *target = val;
            }
        }
        if let Ok(val) = env::var("CLUBHUB_UPSTREAM_SERVICE_TOKEN") {
            upstream.service_token = Some(val).filter(|t| !t.is_empty());
        }
        if let Some(timeout) = parsed("CLUBHUB_UPSTREAM_TIMEOUT_MS")? {
            upstream.request_timeout_ms = timeout;
        }

        // Availability
        if let Some(minutes) = parsed("CLUBHUB_SLOT_MINUTES")? {
            config.availability.slot_minutes = minutes;
        }

        // Features
        if let Ok(val) = env::var("CLUBHUB_FEATURE_DASHBOARD") {
            config.features.dashboard_enabled = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("CLUBHUB_FEATURE_AVAILABILITY") {
            config.features.availability_enabled = val.parse().unwrap_or(true);
        }

        // Metrics
        if let Ok(val) = env::var("CLUBHUB_METRICS_ENABLED") {
            config.metrics.enabled = val.parse().unwrap_or(true);
        }
        if let Some(port) = parsed("CLUBHUB_METRICS_PORT")? {
            config.metrics.port = port;
        }

        Ok(())
    }
}

/// Read and parse a numeric env var. Unset is `None`; unparsable is an error.
fn parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvError(format!("{} has an invalid value: {}", key, val))),
        Err(_) => Ok(None),
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
