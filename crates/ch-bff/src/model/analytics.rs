//! Metrics served by the analytics and clients services.
//!
//! Every type has a zero `Default`, which is what a failed collaborator
//! contributes to the dashboard.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RevenueMetrics {
    pub total: f64,
    pub previous_period: f64,
    pub growth_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct OccupancyMetrics {
    /// Booked share of bookable hours, 0.0 - 1.0
    pub rate: f64,
    pub booked_hours: f64,
    pub available_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CustomerMetrics {
    pub total: u32,
    pub active: u32,
    pub new_this_period: u32,
    pub retention_rate: f64,
}

/// Analytics service summary for a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AnalyticsSummary {
    pub revenue: RevenueMetrics,
    pub occupancy: OccupancyMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}
