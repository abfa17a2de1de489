//! Reservation availability endpoint (GET query or POST body).

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, HeaderName},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use super::{serve, set_header, AggregateRoute};
use crate::auth::TenantContext;
use crate::availability::{
    self as engine, AvailabilityFlags, AvailabilityInput, AvailabilityParams,
    AvailabilityResponse, ScheduleWindow, TimeRange,
};
use crate::cache::CacheKey;
use crate::error::{BffError, ErrorResponse, Result};
use crate::fallback::{self, ResponseMeta};
use crate::gateway::ReservationQuery;
use crate::model::{BlockedSlot, ClubProfile, Court, PricingRule, Promotion, Reservation, TimeOfDay};
use crate::orchestrator::{fields, FallbackReason, FanOut, OrchestrationFailure, AVAILABILITY_POLICY};
use crate::policy::{RouteId, RoutePolicy};
use crate::state::BffState;

pub const X_COURTS_COUNT: HeaderName = HeaderName::from_static("x-courts-count");
pub const X_TOTAL_SLOTS: HeaderName = HeaderName::from_static("x-total-slots");
pub const X_AVAILABLE_SLOTS: HeaderName = HeaderName::from_static("x-available-slots");

/// Availability query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Club to query (must be one of the caller's clubs)
    pub club_id: Option<String>,
    /// ISO date, e.g. 2024-03-15
    pub date: Option<String>,
    /// Comma-separated court ids
    pub court_ids: Option<String>,
    /// true/false/1/0, default true
    pub include_pricing: Option<String>,
    /// true/false/1/0, default true
    pub include_conflicts: Option<String>,
    /// HH:MM, requires `end`
    pub start: Option<String>,
    /// HH:MM, requires `start`
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TimeRangeRequest {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Availability request body
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub club_id: Option<String>,
    pub date: Option<String>,
    pub court_ids: Option<Vec<String>>,
    #[schema(value_type = Option<bool>)]
    pub include_pricing: Option<Value>,
    #[schema(value_type = Option<bool>)]
    pub include_conflicts: Option<Value>,
    pub time_range: Option<TimeRangeRequest>,
}

impl AvailabilityQuery {
    pub fn into_params(self) -> Result<AvailabilityParams> {
        Ok(AvailabilityParams {
            club_id: required("club_id", self.club_id)?,
            date: parse_date(&required("date", self.date)?)?,
            court_ids: self
                .court_ids
                .and_then(|raw| normalize_ids(raw.split(',').map(str::to_string).collect())),
            flags: AvailabilityFlags {
                include_pricing: parse_flag("include_pricing", self.include_pricing.as_deref())?,
                include_conflicts: parse_flag("include_conflicts", self.include_conflicts.as_deref())?,
            },
            time_range: parse_time_range(self.start.as_deref(), self.end.as_deref())?,
        })
    }
}

impl AvailabilityRequest {
    pub fn into_params(self) -> Result<AvailabilityParams> {
        let (start, end) = self
            .time_range
            .map(|r| (r.start, r.end))
            .unwrap_or((None, None));

        Ok(AvailabilityParams {
            club_id: required("club_id", self.club_id)?,
            date: parse_date(&required("date", self.date)?)?,
            court_ids: self.court_ids.and_then(normalize_ids),
            flags: AvailabilityFlags {
                include_pricing: json_flag("include_pricing", self.include_pricing.as_ref())?,
                include_conflicts: json_flag("include_conflicts", self.include_conflicts.as_ref())?,
            },
            time_range: parse_time_range(start.as_deref(), end.as_deref())?,
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BffError::invalid(format!("{} is required", name)))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| BffError::invalid(format!("date '{}' is not an ISO date (YYYY-MM-DD)", raw)))
}

/// Trimmed, non-empty ids. An empty filter means no filter.
fn normalize_ids(ids: Vec<String>) -> Option<Vec<String>> {
    let ids: Vec<String> = ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    (!ids.is_empty()).then_some(ids)
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(true),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(BffError::invalid(format!(
            "{} must be true, false, 1 or 0 (got '{}')",
            name, other
        ))),
    }
}

fn json_flag(name: &str, value: Option<&Value>) -> Result<bool> {
    match value {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) if n.as_u64() == Some(1) => Ok(true),
        Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(false),
        Some(Value::String(s)) => parse_flag(name, Some(s.as_str())),
        Some(other) => Err(BffError::invalid(format!(
            "{} must be a boolean (got {})",
            name, other
        ))),
    }
}

fn parse_time_range(start: Option<&str>, end: Option<&str>) -> Result<Option<TimeRange>> {
    let parse = |name: &str, raw: &str| {
        raw.parse::<TimeOfDay>()
            .map_err(|e| BffError::invalid(format!("{}: {}", name, e)))
    };
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = parse("time_range.start", start)?;
            let range = TimeRange {
                start,
                end: parse("time_range.end", end)?.as_end_after(start),
            };
            if range.start >= range.end {
                return Err(BffError::invalid("time_range.start must be before time_range.end"));
            }
            Ok(Some(range))
        }
        _ => Err(BffError::invalid("time_range requires both start and end")),
    }
}

pub struct AvailabilityRoute;

impl AvailabilityRoute {
    /// Caller range, else the club's opening hours, else configured defaults.
    fn window(state: &BffState, params: &AvailabilityParams, club: Option<&ClubProfile>) -> ScheduleWindow {
        let club_hours = club
            .and_then(|c| {
                let start = c.opening_time?;
                Some(TimeRange { start, end: c.closing_time?.as_end_after(start) })
            })
            .filter(|r| r.start < r.end);
        let hours = params
            .time_range
            .or(club_hours)
            .unwrap_or(state.defaults.hours);

        ScheduleWindow {
            start: hours.start,
            end: hours.end,
            slot_minutes: state.defaults.slot_minutes,
        }
    }
}

#[async_trait]
impl AggregateRoute for AvailabilityRoute {
    type Params = AvailabilityParams;
    type Payload = AvailabilityResponse;

    fn policy(state: &BffState) -> &RoutePolicy {
        &state.availability
    }

    fn club_id(params: &AvailabilityParams) -> &str {
        &params.club_id
    }

    fn cache_key(params: &AvailabilityParams) -> CacheKey {
        params.cache_key()
    }

    async fn compute(
        state: &BffState,
        tenant: &TenantContext,
        params: &AvailabilityParams,
    ) -> std::result::Result<AvailabilityResponse, OrchestrationFailure> {
        let club_id = tenant.club_id.as_str();
        let upstream = state.collaborators.as_ref();
        let court_filter = params.court_ids.as_deref();
        let query = ReservationQuery::on(params.date).with_courts(params.court_ids.clone());

        let mut fan_out = FanOut::new(&AVAILABILITY_POLICY)
            .with_timeout(state.call_timeout)
            .call(fields::COURTS, upstream.courts(club_id))
            .call(fields::CLUB, upstream.club_profile(club_id))
            .call(fields::RESERVATIONS, upstream.reservations(club_id, &query))
            .call(
                fields::BLOCKED_SLOTS,
                upstream.blocked_slots(club_id, params.date, court_filter),
            );
        if params.flags.include_pricing {
            fan_out = fan_out
                .call(fields::PRICING_RULES, upstream.pricing_rules(club_id, court_filter))
                .call(fields::PROMOTIONS, upstream.promotions(club_id, params.date));
        }

        let mut gathered = fan_out.join().await?;
        let degraded = gathered.degraded().iter().map(|f| f.to_string()).collect();

        let courts: Vec<Court> = gathered.require(RouteId::Availability, fields::COURTS)?;
        let club: Option<ClubProfile> = gathered.try_take(fields::CLUB);
        let reservations: Vec<Reservation> = gathered.take(fields::RESERVATIONS);
        let blocked_slots: Vec<BlockedSlot> = gathered.take(fields::BLOCKED_SLOTS);
        let pricing_rules: Vec<PricingRule> = gathered.take(fields::PRICING_RULES);
        let promotions: Vec<Promotion> = gathered.take(fields::PROMOTIONS);

        let courts: Vec<Court> = courts
            .into_iter()
            .filter(|c| c.active)
            .filter(|c| court_filter.map_or(true, |ids| ids.contains(&c.id)))
            .collect();
        let currency = club
            .as_ref()
            .and_then(|c| c.currency.clone())
            .unwrap_or_else(|| state.defaults.currency.clone());

        let result = engine::compute(&AvailabilityInput {
            date: params.date,
            window: Self::window(state, params, club.as_ref()),
            currency: &currency,
            courts: &courts,
            reservations: &reservations,
            blocked_slots: &blocked_slots,
            pricing_rules: &pricing_rules,
            promotions: &promotions,
            flags: params.flags,
        });

        Ok(AvailabilityResponse {
            club_id: tenant.club_id.clone(),
            date: params.date,
            currency,
            courts: result.courts,
            summary: result.summary,
            meta: ResponseMeta::fresh(degraded),
        })
    }

    fn fallback(
        state: &BffState,
        params: &AvailabilityParams,
        reason: FallbackReason,
    ) -> AvailabilityResponse {
        fallback::availability(params, &state.defaults.currency, reason)
    }

    fn meta(payload: &AvailabilityResponse) -> &ResponseMeta {
        &payload.meta
    }

    fn summary_headers(payload: &AvailabilityResponse, headers: &mut HeaderMap) {
        set_header(headers, X_COURTS_COUNT, &payload.courts.len().to_string());
        set_header(headers, X_TOTAL_SLOTS, &payload.summary.total_slots.to_string());
        set_header(headers, X_AVAILABLE_SLOTS, &payload.summary.available_slots.to_string());
    }
}

/// Court availability for one date
#[utoipa::path(
    get,
    path = "/api/bff/reservations/availability",
    tag = "bff",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability (X-Fallback: true when degraded to zero values)", body = AvailabilityResponse),
        (status = 400, description = "Missing or malformed parameters", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Club or role not permitted", body = ErrorResponse),
        (status = 501, description = "Route disabled", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_availability(
    State(state): State<BffState>,
    headers: HeaderMap,
    query: std::result::Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Response {
    let params = query
        .map_err(|e| BffError::invalid(e.body_text()))
        .and_then(|Query(q)| q.into_params());
    serve::<AvailabilityRoute>(&state, &headers, params).await
}

/// Court availability for one date (JSON body)
#[utoipa::path(
    post,
    path = "/api/bff/reservations/availability",
    tag = "bff",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability (X-Fallback: true when degraded to zero values)", body = AvailabilityResponse),
        (status = 400, description = "Missing or malformed parameters", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Club or role not permitted", body = ErrorResponse),
        (status = 501, description = "Route disabled", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_availability(
    State(state): State<BffState>,
    headers: HeaderMap,
    body: std::result::Result<Json<AvailabilityRequest>, JsonRejection>,
) -> Response {
    let params = body
        .map_err(|e| BffError::invalid(e.body_text()))
        .and_then(|Json(request)| request.into_params());
    serve::<AvailabilityRoute>(&state, &headers, params).await
}
