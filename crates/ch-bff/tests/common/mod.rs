//! Shared fixtures for the router-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use ch_bff::gateway::{CollabResult, ReservationQuery};
use ch_bff::model::{
    AnalyticsSummary, BlockedSlot, ChartPoint, ClubProfile, Court, CustomerMetrics, DateRange,
    OccupancyMetrics, PricingRule, Promotion, Reservation, ReservationStatus, RevenueMetrics,
    TimeOfDay,
};
use ch_bff::{
    bff_router, BffState, Collaborator, CollaboratorError, Collaborators, FailureKind,
    MembershipClaim, Role, TokenVerifier,
};
use ch_config::AppConfig;

pub const CLUB: &str = "club-1";
pub const DATE: &str = "2024-03-15";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Fail,
    Delay(Duration),
    Panic,
}

/// In-memory collaborators that record every call and can be told to fail.
pub struct StubCollaborators {
    behaviors: Mutex<HashMap<Collaborator, Behavior>>,
    calls: Mutex<Vec<(Collaborator, String)>>,
    pub blocked: Mutex<Vec<BlockedSlot>>,
    /// Overrides the fixture club's closing time when set
    pub closing_time: Mutex<Option<TimeOfDay>>,
    pub extra_reservations: Mutex<Vec<Reservation>>,
}

impl StubCollaborators {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            blocked: Mutex::new(Vec::new()),
            closing_time: Mutex::new(None),
            extra_reservations: Mutex::new(Vec::new()),
        })
    }

    pub fn set(&self, collaborator: Collaborator, behavior: Behavior) {
        self.behaviors.lock().insert(collaborator, behavior);
    }

    pub fn fail_all(&self) {
        for c in [
            Collaborator::Profile,
            Collaborator::Analytics,
            Collaborator::Clients,
            Collaborator::Reservations,
            Collaborator::Courts,
            Collaborator::Pricing,
            Collaborator::Promotions,
            Collaborator::BlockedSlots,
        ] {
            self.set(c, Behavior::Fail);
        }
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, collaborator: Collaborator) -> usize {
        self.calls.lock().iter().filter(|(c, _)| *c == collaborator).count()
    }

    pub fn club_ids(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, club)| club.clone()).collect()
    }

    async fn respond<T>(&self, collaborator: Collaborator, club_id: &str, value: T) -> CollabResult<T> {
        self.calls.lock().push((collaborator, club_id.to_string()));
        let behavior = self
            .behaviors
            .lock()
            .get(&collaborator)
            .copied()
            .unwrap_or(Behavior::Succeed);

        match behavior {
            Behavior::Succeed => Ok(value),
            Behavior::Fail => Err(CollaboratorError::new(collaborator, FailureKind::Status(503))),
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Behavior::Panic => panic!("{} stub exploded", collaborator),
        }
    }
}

pub fn t(raw: &str) -> TimeOfDay {
    raw.parse().unwrap()
}

pub fn date() -> NaiveDate {
    NaiveDate::parse_from_str(DATE, "%Y-%m-%d").unwrap()
}

pub fn club_profile() -> ClubProfile {
    ClubProfile {
        id: CLUB.into(),
        name: "Padel Club Centro".into(),
        opening_time: Some(t("08:00")),
        closing_time: Some(t("20:00")),
        currency: Some("EUR".into()),
        timezone: Some("Europe/Madrid".into()),
    }
}

pub fn courts() -> Vec<Court> {
    let court = |id: &str, name: &str, price: f64, active: bool| Court {
        id: id.into(),
        name: name.into(),
        sport: Some("padel".into()),
        base_price_per_hour: price,
        active,
    };
    vec![
        court("c1", "Court 1", 1000.0, true),
        court("c2", "Court 2", 1200.0, true),
        court("c3", "Old Court", 800.0, false),
    ]
}

pub fn reservations() -> Vec<Reservation> {
    vec![Reservation {
        id: "r1".into(),
        court_id: "c1".into(),
        date: date(),
        start_time: t("10:00"),
        end_time: t("11:30"),
        status: ReservationStatus::Confirmed,
        client_name: Some("Ana Garcia".into()),
    }]
}

pub fn pricing_rules() -> Vec<PricingRule> {
    vec![PricingRule {
        id: "morning".into(),
        court_id: None,
        days_of_week: None,
        start_time: t("08:00"),
        end_time: t("10:00"),
        price: 1500.0,
    }]
}

pub fn promotions() -> Vec<Promotion> {
    vec![Promotion {
        id: "early-bird".into(),
        name: "Early bird".into(),
        discount_percent: 20.0,
        start_time: t("08:00"),
        end_time: t("10:00"),
        active: true,
        valid_from: None,
        valid_until: None,
        court_ids: None,
    }]
}

pub fn analytics_summary() -> AnalyticsSummary {
    AnalyticsSummary {
        revenue: RevenueMetrics {
            total: 12_500.0,
            previous_period: 10_000.0,
            growth_percent: 25.0,
        },
        occupancy: OccupancyMetrics {
            rate: 0.62,
            booked_hours: 310.0,
            available_hours: 500.0,
        },
    }
}

pub fn customer_metrics() -> CustomerMetrics {
    CustomerMetrics {
        total: 340,
        active: 210,
        new_this_period: 12,
        retention_rate: 0.81,
    }
}

pub fn revenue_trend() -> Vec<ChartPoint> {
    ["Mon", "Tue", "Wed"]
        .iter()
        .enumerate()
        .map(|(i, label)| ChartPoint {
            label: label.to_string(),
            value: 1000.0 * (i + 1) as f64,
        })
        .collect()
}

#[async_trait]
impl Collaborators for StubCollaborators {
    async fn club_profile(&self, club_id: &str) -> CollabResult<ClubProfile> {
        let mut profile = club_profile();
        if let Some(closing) = *self.closing_time.lock() {
            profile.closing_time = Some(closing);
        }
        self.respond(Collaborator::Profile, club_id, profile).await
    }

    async fn analytics_summary(&self, club_id: &str, _range: DateRange) -> CollabResult<AnalyticsSummary> {
        self.respond(Collaborator::Analytics, club_id, analytics_summary()).await
    }

    async fn revenue_trend(&self, club_id: &str, _range: DateRange) -> CollabResult<Vec<ChartPoint>> {
        self.respond(Collaborator::Analytics, club_id, revenue_trend()).await
    }

    async fn customer_metrics(&self, club_id: &str, _range: DateRange) -> CollabResult<CustomerMetrics> {
        self.respond(Collaborator::Clients, club_id, customer_metrics()).await
    }

    async fn courts(&self, club_id: &str) -> CollabResult<Vec<Court>> {
        self.respond(Collaborator::Courts, club_id, courts()).await
    }

    async fn reservations(&self, club_id: &str, _query: &ReservationQuery) -> CollabResult<Vec<Reservation>> {
        let mut all = reservations();
        all.extend(self.extra_reservations.lock().iter().cloned());
        self.respond(Collaborator::Reservations, club_id, all).await
    }

    async fn blocked_slots(
        &self,
        club_id: &str,
        _date: NaiveDate,
        _court_ids: Option<&[String]>,
    ) -> CollabResult<Vec<BlockedSlot>> {
        let blocked = self.blocked.lock().clone();
        self.respond(Collaborator::BlockedSlots, club_id, blocked).await
    }

    async fn pricing_rules(&self, club_id: &str, _court_ids: Option<&[String]>) -> CollabResult<Vec<PricingRule>> {
        self.respond(Collaborator::Pricing, club_id, pricing_rules()).await
    }

    async fn promotions(&self, club_id: &str, _date: NaiveDate) -> CollabResult<Vec<Promotion>> {
        self.respond(Collaborator::Promotions, club_id, promotions()).await
    }
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret".into();
    config.upstream.request_timeout_ms = 1_000;
    config
}

pub fn app(stub: Arc<StubCollaborators>) -> Router {
    app_with(&config(), stub)
}

pub fn app_with(config: &AppConfig, stub: Arc<StubCollaborators>) -> Router {
    let state = BffState::from_config(config, stub).expect("state");
    bff_router(state)
}

pub fn token(memberships: &[(&str, Role)]) -> String {
    let claims = memberships
        .iter()
        .map(|(club, role)| MembershipClaim::new(*club, *role))
        .collect();
    TokenVerifier::new(&config().auth)
        .issue("user-1", claims, 3600)
        .expect("token")
}

pub fn owner_token() -> String {
    token(&[(CLUB, Role::Owner)])
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse { status, headers, body }
}

pub async fn get(router: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    send(router, builder.body(Body::empty()).unwrap()).await
}

pub async fn post_json(router: &Router, uri: &str, token: Option<&str>, body: &str) -> TestResponse {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    send(router, builder.body(Body::from(body.to_string())).unwrap()).await
}
