//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use ch_config::AppConfig;

use crate::auth::{TenantResolver, TokenVerifier};
use crate::availability::TimeRange;
use crate::cache::{InMemoryResponseCache, ResponseCache, SingleFlight};
use crate::error::{BffError, Result};
use crate::gateway::Collaborators;
use crate::model::TimeOfDay;
use crate::policy::RoutePolicy;

/// Availability fallbacks used when the club profile is missing data
#[derive(Debug, Clone)]
pub struct AvailabilityDefaults {
    pub hours: TimeRange,
    pub currency: String,
    pub slot_minutes: u32,
}

#[derive(Clone)]
pub struct BffState {
    pub resolver: TenantResolver,
    pub cache: Arc<dyn ResponseCache>,
    pub flights: Arc<SingleFlight>,
    pub collaborators: Arc<dyn Collaborators>,
    pub dashboard: RoutePolicy,
    pub availability: RoutePolicy,
    pub defaults: AvailabilityDefaults,
    /// Per-collaborator ceiling applied by the orchestrator
    pub call_timeout: Option<Duration>,
    pub single_flight: bool,
}

impl BffState {
    pub fn from_config(config: &AppConfig, collaborators: Arc<dyn Collaborators>) -> Result<Self> {
        let parse = |name: &str, raw: &str| {
            raw.parse::<TimeOfDay>()
                .map_err(|e| BffError::internal(format!("availability.{}: {}", name, e)))
        };
        let hours = TimeRange {
            start: parse("default_open", &config.availability.default_open)?,
            end: parse("default_close", &config.availability.default_close)?,
        };

        Ok(Self {
            resolver: TenantResolver::new(TokenVerifier::new(&config.auth)),
            cache: Arc::new(InMemoryResponseCache::new(config.cache.max_entries)),
            flights: Arc::new(SingleFlight::new()),
            collaborators,
            dashboard: RoutePolicy::dashboard(config),
            availability: RoutePolicy::availability(config),
            defaults: AvailabilityDefaults {
                hours,
                currency: config.availability.default_currency.clone(),
                slot_minutes: config.availability.slot_minutes,
            },
            call_timeout: Some(Duration::from_millis(config.upstream.request_timeout_ms)),
            single_flight: config.cache.single_flight,
        })
    }
}
