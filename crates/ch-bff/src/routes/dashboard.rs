//! Dashboard overview endpoint.

use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::Response,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{serve, AggregateRoute};
use crate::auth::TenantContext;
use crate::cache::CacheKey;
use crate::dashboard::{assemble, DashboardOverview, DashboardParams, DashboardPeriod, DashboardSources};
use crate::error::{BffError, ErrorResponse, Result};
use crate::fallback::{self, ResponseMeta};
use crate::gateway::ReservationQuery;
use crate::model::AnalyticsSummary;
use crate::orchestrator::{fields, FallbackReason, FanOut, OrchestrationFailure, DASHBOARD_POLICY};
use crate::policy::{RouteId, RoutePolicy};
use crate::state::BffState;

/// Dashboard query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    pub club_id: Option<String>,
    /// today, week, month or year (default week)
    pub period: Option<String>,
    /// Period anchor, ISO date (default today, UTC)
    pub date: Option<String>,
}

impl DashboardQuery {
    pub fn into_params(self) -> Result<DashboardParams> {
        let club_id = self
            .club_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BffError::invalid("club_id is required"))?;

        let period = match self.period.as_deref().map(str::trim) {
            None | Some("") => DashboardPeriod::default(),
            Some(raw) => raw.parse().map_err(BffError::invalid)?,
        };

        let anchor = match self.date.as_deref().map(str::trim) {
            None | Some("") => Utc::now().date_naive(),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                BffError::invalid(format!("date '{}' is not an ISO date (YYYY-MM-DD)", raw))
            })?,
        };

        Ok(DashboardParams { club_id, period, anchor })
    }
}

pub struct DashboardRoute;

#[async_trait]
impl AggregateRoute for DashboardRoute {
    type Params = DashboardParams;
    type Payload = DashboardOverview;

    fn policy(state: &BffState) -> &RoutePolicy {
        &state.dashboard
    }

    fn club_id(params: &DashboardParams) -> &str {
        &params.club_id
    }

    fn cache_key(params: &DashboardParams) -> CacheKey {
        params.cache_key()
    }

    async fn compute(
        state: &BffState,
        tenant: &TenantContext,
        params: &DashboardParams,
    ) -> std::result::Result<DashboardOverview, OrchestrationFailure> {
        let club_id = tenant.club_id.as_str();
        let upstream = state.collaborators.as_ref();
        let range = params.range();
        let query = ReservationQuery::between(params.reservation_window());

        let mut gathered = FanOut::new(&DASHBOARD_POLICY)
            .with_timeout(state.call_timeout)
            .call(fields::CLUB, upstream.club_profile(club_id))
            .call(fields::SUMMARY, upstream.analytics_summary(club_id, range))
            .call(fields::CUSTOMERS, upstream.customer_metrics(club_id, range))
            .call(fields::REVENUE_CHART, upstream.revenue_trend(club_id, range))
            .call(fields::RESERVATIONS, upstream.reservations(club_id, &query))
            .call(fields::COURTS, upstream.courts(club_id))
            .join()
            .await?;

        let degraded = gathered.degraded().iter().map(|f| f.to_string()).collect();
        let summary: AnalyticsSummary = gathered.take(fields::SUMMARY);
        let sources = DashboardSources {
            club: gathered.require(RouteId::Dashboard, fields::CLUB)?,
            revenue: summary.revenue,
            occupancy: summary.occupancy,
            customers: gathered.take(fields::CUSTOMERS),
            revenue_chart: gathered.take(fields::REVENUE_CHART),
            reservations: gathered.take(fields::RESERVATIONS),
            courts: gathered.take(fields::COURTS),
        };

        Ok(assemble(params, sources, ResponseMeta::fresh(degraded)))
    }

    fn fallback(
        _state: &BffState,
        params: &DashboardParams,
        reason: FallbackReason,
    ) -> DashboardOverview {
        fallback::dashboard(params, reason)
    }

    fn meta(payload: &DashboardOverview) -> &ResponseMeta {
        &payload.meta
    }
}

/// Aggregated club dashboard
#[utoipa::path(
    get,
    path = "/api/bff/dashboard/overview",
    tag = "bff",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard overview (X-Fallback: true when degraded to zero values)", body = DashboardOverview),
        (status = 400, description = "Missing or malformed parameters", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Club or role not permitted", body = ErrorResponse),
        (status = 501, description = "Route disabled", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dashboard_overview(
    State(state): State<BffState>,
    headers: HeaderMap,
    query: std::result::Result<Query<DashboardQuery>, QueryRejection>,
) -> Response {
    let params = query
        .map_err(|e| BffError::invalid(e.body_text()))
        .and_then(|Query(q)| q.into_params());
    serve::<DashboardRoute>(&state, &headers, params).await
}
