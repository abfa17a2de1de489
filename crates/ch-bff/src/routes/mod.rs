//! BFF Routes
//!
//! Both aggregation endpoints run the same pipeline:
//! feature flag -> credential -> parameters -> tenant authorization ->
//! cache lookup -> (coalesced) orchestration -> cache fill -> response.
//! Orchestration failures never surface as a 5xx; they produce the route's
//! fallback body with `X-Fallback`/`X-Error` headers.

pub mod availability;
pub mod dashboard;
pub mod health;

use async_trait::async_trait;
use axum::{
    http::{header::CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};
use utoipa::OpenApi;

use crate::auth::TenantContext;
use crate::cache::{CacheEntry, CacheKey};
use crate::error::BffError;
use crate::fallback::ResponseMeta;
use crate::openapi::ApiDoc;
use crate::orchestrator::{catch_panics, FallbackReason, OrchestrationFailure};
use crate::policy::{RouteId, RoutePolicy};
use crate::state::BffState;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_FALLBACK: HeaderName = HeaderName::from_static("x-fallback");
pub const X_ERROR: HeaderName = HeaderName::from_static("x-error");
pub const X_DEGRADED: HeaderName = HeaderName::from_static("x-degraded");

/// One cacheable aggregation endpoint.
#[async_trait]
pub trait AggregateRoute: Send + Sync + 'static {
    type Params: Send + Sync;
    type Payload: Serialize + DeserializeOwned + Send;

    fn policy(state: &BffState) -> &RoutePolicy;

    fn club_id(params: &Self::Params) -> &str;

    fn cache_key(params: &Self::Params) -> CacheKey;

    async fn compute(
        state: &BffState,
        tenant: &TenantContext,
        params: &Self::Params,
    ) -> Result<Self::Payload, OrchestrationFailure>;

    fn fallback(state: &BffState, params: &Self::Params, reason: FallbackReason) -> Self::Payload;

    fn meta(payload: &Self::Payload) -> &ResponseMeta;

    /// Route-specific response headers, applied to hits, misses and fallbacks.
    fn summary_headers(_payload: &Self::Payload, _headers: &mut HeaderMap) {}
}

pub fn bff_router(state: BffState) -> Router {
    Router::new()
        .route(
            RouteId::Dashboard.path(),
            get(dashboard::get_dashboard_overview),
        )
        .route(
            RouteId::Availability.path(),
            get(availability::get_availability).post(availability::post_availability),
        )
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(health::health_routes())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub(crate) async fn serve<R: AggregateRoute>(
    state: &BffState,
    headers: &HeaderMap,
    params: Result<R::Params, BffError>,
) -> Response {
    let started = Instant::now();
    let route = R::policy(state).id;

    let response = match admit::<R>(state, headers, params) {
        Ok((tenant, params)) => {
            let span = info_span!("bff_request", route = route.as_str(), club_id = %tenant.club_id);
            respond::<R>(state, &tenant, &params).instrument(span).await
        }
        Err(e) => {
            debug!(route = route.as_str(), error = %e, "Request rejected");
            e.into_response()
        }
    };

    metrics::histogram!("bff_request_duration_seconds", "route" => route.as_str())
        .record(started.elapsed().as_secs_f64());
    response
}

/// Everything that must pass before the cache or any collaborator is touched.
fn admit<R: AggregateRoute>(
    state: &BffState,
    headers: &HeaderMap,
    params: Result<R::Params, BffError>,
) -> Result<(TenantContext, R::Params), BffError> {
    let policy = R::policy(state);
    if !policy.enabled {
        return Err(BffError::FeatureDisabled {
            route: policy.id.as_str().to_string(),
        });
    }

    let claims = state.resolver.authenticate(headers)?;
    let params = params?;
    let tenant = state
        .resolver
        .authorize(&claims, R::club_id(&params), policy.allowed_roles)?;
    Ok((tenant, params))
}

async fn respond<R: AggregateRoute>(
    state: &BffState,
    tenant: &TenantContext,
    params: &R::Params,
) -> Response {
    let policy = R::policy(state);
    let route = policy.id;
    let key = R::cache_key(params);

    if let Some(hit) = cached::<R>(state, &key, policy, state.cache.get(&key).await).await {
        return hit;
    }
    metrics::counter!("bff_cache_misses_total", "route" => route.as_str()).increment(1);

    let _flight = if state.single_flight {
        let guard = state.flights.acquire(&key).await;
        // a waiter's miss is already counted
        if let Some(hit) = cached::<R>(state, &key, policy, state.cache.peek(&key).await).await {
            return hit;
        }
        Some(guard)
    } else {
        None
    };

    let outcome = catch_panics(route, R::compute(state, tenant, params))
        .await
        .and_then(|payload| match serde_json::to_value(&payload) {
            Ok(body) => Ok((payload, body)),
            Err(e) => Err(OrchestrationFailure::unexpected(
                route,
                format!("failed to serialize response: {}", e),
            )),
        });

    match outcome {
        Ok((payload, body)) => {
            let meta = R::meta(&payload);
            let mut headers = HeaderMap::new();
            headers.insert(X_CACHE, HeaderValue::from_static("MISS"));

            if meta.is_degraded() {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                set_header(&mut headers, X_DEGRADED, &meta.degraded.join(","));
            } else {
                state.cache.put(&key, body.clone(), policy.ttl).await;
                set_header(&mut headers, CACHE_CONTROL, &public_max_age(policy));
            }

            R::summary_headers(&payload, &mut headers);
            (StatusCode::OK, headers, Json(body)).into_response()
        }
        Err(failure) => {
            error!(
                reason = failure.reason.tag(),
                failed = ?failure.failed,
                error = %failure,
                "Orchestration failed, serving fallback"
            );
            metrics::counter!(
                "bff_fallback_total",
                "route" => route.as_str(),
                "reason" => failure.reason.tag()
            )
            .increment(1);

            let payload = R::fallback(state, params, failure.reason);
            let mut headers = HeaderMap::new();
            headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(X_FALLBACK, HeaderValue::from_static("true"));
            headers.insert(X_ERROR, HeaderValue::from_static(failure.reason.tag()));
            R::summary_headers(&payload, &mut headers);
            (StatusCode::OK, headers, Json(payload)).into_response()
        }
    }
}

async fn cached<R: AggregateRoute>(
    state: &BffState,
    key: &CacheKey,
    policy: &RoutePolicy,
    entry: Option<CacheEntry>,
) -> Option<Response> {
    let entry = entry?;

    let payload = match serde_json::from_value::<R::Payload>(entry.payload.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unreadable cache entry");
            state.cache.evict(key).await;
            return None;
        }
    };

    debug!(key = %key, "Cache hit");
    metrics::counter!("bff_cache_hits_total", "route" => policy.id.as_str()).increment(1);

    let mut headers = HeaderMap::new();
    headers.insert(X_CACHE, HeaderValue::from_static("HIT"));
    set_header(&mut headers, CACHE_CONTROL, &public_max_age(policy));
    R::summary_headers(&payload, &mut headers);
    Some((StatusCode::OK, headers, Json(entry.payload)).into_response())
}

fn public_max_age(policy: &RoutePolicy) -> String {
    format!("public, max-age={}", policy.ttl.as_secs())
}

pub(crate) fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "Skipping header with invalid value"),
    }
}
