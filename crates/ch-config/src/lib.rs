//! ClubHub BFF Configuration System
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub availability: AvailabilityConfig,
    pub features: FeatureFlags,
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Credential verification settings (HS256 bearer tokens)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    /// Clock skew tolerated on `exp`
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "clubhub".to_string(),
            audience: "clubhub-bff".to_string(),
            leeway_secs: 30,
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dashboard_ttl_secs: u64,
    pub availability_ttl_secs: u64,
    pub max_entries: usize,
    /// Coalesce concurrent misses for the same key
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dashboard_ttl_secs: 300,   // 5 minutes
            availability_ttl_secs: 60, // 1 minute
            max_entries: 10_000,
            single_flight: true,
        }
    }
}

/// Upstream collaborator endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub identity_url: String,
    pub analytics_url: String,
    pub clients_url: String,
    pub reservations_url: String,
    pub courts_url: String,
    pub pricing_url: String,
    /// Bearer token presented to upstream services
    pub service_token: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            identity_url: "http://localhost:8081".to_string(),
            analytics_url: "http://localhost:8082".to_string(),
            clients_url: "http://localhost:8083".to_string(),
            reservations_url: "http://localhost:8084".to_string(),
            courts_url: "http://localhost:8085".to_string(),
            pricing_url: "http://localhost:8086".to_string(),
            service_token: None,
            connect_timeout_ms: 2_000,
            request_timeout_ms: 5_000,
        }
    }
}

/// Slot generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    pub slot_minutes: u32,
    /// Opening time used when the club profile is unavailable (HH:MM)
    pub default_open: String,
    /// Closing time used when the club profile is unavailable (HH:MM)
    pub default_close: String,
    pub default_currency: String,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 90,
            default_open: "08:00".to_string(),
            default_close: "22:00".to_string(),
            default_currency: "EUR".to_string(),
        }
    }
}

/// Per-route feature flags. A disabled route answers 501.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub dashboard_enabled: bool,
    pub availability_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            dashboard_enabled: true,
            availability_enabled: true,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

/// Parse `HH:MM` into minutes after midnight. `24:00` is accepted.
pub fn minutes_of_day(value: &str) -> Option<u32> {
    let (h, m) = value.trim().split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set".to_string(),
            ));
        }
        if self.cache.dashboard_ttl_secs == 0 || self.cache.availability_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache TTLs must be greater than zero".to_string(),
            ));
        }
        if self.availability.slot_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "availability.slot_minutes must be greater than zero".to_string(),
            ));
        }

        let open = minutes_of_day(&self.availability.default_open).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "availability.default_open is not HH:MM: {}",
                self.availability.default_open
            ))
        })?;
        let close = minutes_of_day(&self.availability.default_close).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "availability.default_close is not HH:MM: {}",
                self.availability.default_close
            ))
        })?;
        if open >= close {
            return Err(ConfigError::ValidationError(
                "availability.default_open must be before default_close".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# ClubHub BFF Configuration
# Environment variables (CLUBHUB_*) override these settings

[http]
port = 8080
host = "0.0.0.0"
cors_origins = ["http://localhost:3000"]

[auth]
jwt_secret = "change-me"
issuer = "clubhub"
audience = "clubhub-bff"
leeway_secs = 30

[cache]
dashboard_ttl_secs = 300
availability_ttl_secs = 60
max_entries = 10000
single_flight = true

[upstream]
identity_url = "http://localhost:8081"
analytics_url = "http://localhost:8082"
clients_url = "http://localhost:8083"
reservations_url = "http://localhost:8084"
courts_url = "http://localhost:8085"
pricing_url = "http://localhost:8086"
connect_timeout_ms = 2000
request_timeout_ms = 5000

[availability]
slot_minutes = 90
default_open = "08:00"
default_close = "22:00"
default_currency = "EUR"

[features]
dashboard_enabled = true
availability_enabled = true

[metrics]
enabled = true
port = 9090
"#
        .to_string()
    }
}
