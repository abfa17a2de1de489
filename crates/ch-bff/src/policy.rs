//! Per-route access, caching and feature policy.

use std::time::Duration;

use ch_config::AppConfig;

use crate::auth::tenant::Role;

/// Roles allowed on the staff-facing aggregation routes
pub const STAFF_ROLES: &[Role] = &[Role::Owner, Role::Admin, Role::Staff];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    Dashboard,
    Availability,
}

impl RouteId {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteId::Dashboard => "dashboard",
            RouteId::Availability => "availability",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            RouteId::Dashboard => "/api/bff/dashboard/overview",
            RouteId::Availability => "/api/bff/reservations/availability",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub id: RouteId,
    pub allowed_roles: &'static [Role],
    pub ttl: Duration,
    pub enabled: bool,
}

impl RoutePolicy {
    pub fn dashboard(config: &AppConfig) -> Self {
        Self {
            id: RouteId::Dashboard,
            allowed_roles: STAFF_ROLES,
            ttl: Duration::from_secs(config.cache.dashboard_ttl_secs),
            enabled: config.features.dashboard_enabled,
        }
    }

    pub fn availability(config: &AppConfig) -> Self {
        Self {
            id: RouteId::Availability,
            allowed_roles: STAFF_ROLES,
            ttl: Duration::from_secs(config.cache.availability_ttl_secs),
            enabled: config.features.availability_enabled,
        }
    }
}
