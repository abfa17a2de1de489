//! Fallback Composer
//!
//! Zero-value bodies for orchestrations that failed outright. They match the
//! route's normal schema so the UI renders them without special cases; only
//! `meta` and the response headers say the data is not real.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::availability::{AvailabilityParams, AvailabilityResponse, AvailabilitySummary};
use crate::dashboard::{DashboardMetrics, DashboardOverview, DashboardParams};
use crate::model::ClubProfile;
use crate::orchestrator::FallbackReason;

/// Envelope metadata carried by every aggregated response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields that degraded to their zero value
    #[serde(default)]
    pub degraded: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ResponseMeta {
    pub fn fresh(degraded: Vec<String>) -> Self {
        Self {
            fallback: false,
            error: None,
            degraded,
            generated_at: Utc::now(),
        }
    }

    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            fallback: true,
            error: Some(reason.tag().to_string()),
            degraded: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.fallback || !self.degraded.is_empty()
    }
}

pub fn availability(
    params: &AvailabilityParams,
    currency: &str,
    reason: FallbackReason,
) -> AvailabilityResponse {
    AvailabilityResponse {
        club_id: params.club_id.clone(),
        date: params.date,
        currency: currency.to_string(),
        courts: Vec::new(),
        summary: AvailabilitySummary::default(),
        meta: ResponseMeta::fallback(reason),
    }
}

pub fn dashboard(params: &DashboardParams, reason: FallbackReason) -> DashboardOverview {
    DashboardOverview {
        club: ClubProfile {
            id: params.club_id.clone(),
            ..ClubProfile::default()
        },
        period: params.period,
        range: params.range(),
        metrics: DashboardMetrics::default(),
        revenue_chart: Vec::new(),
        occupancy_heatmap: Vec::new(),
        upcoming_reservations: Vec::new(),
        top_courts: Vec::new(),
        meta: ResponseMeta::fallback(reason),
    }
}
