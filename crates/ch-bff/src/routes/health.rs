//! Health Check Endpoints
//!
//! - /health/live - Liveness probe
//! - /health/ready - Readiness probe (reports cache occupancy)

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::BffState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LivenessResponse {
    pub status: HealthStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub cache_entries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Cache keys currently being computed
    pub in_flight: usize,
}

pub fn health_routes() -> Router<BffState> {
    Router::new()
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = LivenessResponse))
)]
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: HealthStatus::Up })
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses((status = 200, description = "Ready to serve", body = ReadinessResponse))
)]
pub async fn readiness(State(state): State<BffState>) -> Json<ReadinessResponse> {
    let stats = state.cache.stats();
    Json(ReadinessResponse {
        status: HealthStatus::Up,
        timestamp: Utc::now(),
        cache_entries: stats.entries,
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        in_flight: state.flights.in_flight(),
    })
}
