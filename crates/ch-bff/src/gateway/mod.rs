//! Collaborator Gateway
//!
//! One narrow read per upstream concern. Every call takes the resolved club
//! id; implementations must scope the upstream request to it.

mod http;

pub use http::{GatewayBuildError, HttpCollaborators};

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::model::{
    AnalyticsSummary, BlockedSlot, ChartPoint, ClubProfile, Court, CustomerMetrics, DateRange,
    PricingRule, Promotion, Reservation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Profile,
    Analytics,
    Clients,
    Reservations,
    Courts,
    Pricing,
    Promotions,
    BlockedSlots,
}

impl Collaborator {
    pub fn as_str(self) -> &'static str {
        match self {
            Collaborator::Profile => "profile",
            Collaborator::Analytics => "analytics",
            Collaborator::Clients => "clients",
            Collaborator::Reservations => "reservations",
            Collaborator::Courts => "courts",
            Collaborator::Pricing => "pricing",
            Collaborator::Promotions => "promotions",
            Collaborator::BlockedSlots => "blocked_slots",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Transport(String),
    Status(u16),
    Decode(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => f.write_str("timed out"),
            FailureKind::Transport(e) => write!(f, "transport error: {}", e),
            FailureKind::Status(code) => write!(f, "upstream returned HTTP {}", code),
            FailureKind::Decode(e) => write!(f, "invalid response body: {}", e),
        }
    }
}

/// A failed collaborator call. Absorbed by the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{collaborator} call failed: {kind}")]
pub struct CollaboratorError {
    pub collaborator: Collaborator,
    pub kind: FailureKind,
}

impl CollaboratorError {
    pub fn new(collaborator: Collaborator, kind: FailureKind) -> Self {
        Self { collaborator, kind }
    }

    pub fn timeout(collaborator: Collaborator) -> Self {
        Self::new(collaborator, FailureKind::Timeout)
    }
}

pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Reservation listing filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub court_ids: Option<Vec<String>>,
}

impl ReservationQuery {
    pub fn on(date: NaiveDate) -> Self {
        Self { from: date, to: date, court_ids: None }
    }

    pub fn between(range: DateRange) -> Self {
        Self { from: range.from, to: range.to, court_ids: None }
    }

    pub fn with_courts(mut self, court_ids: Option<Vec<String>>) -> Self {
        self.court_ids = court_ids;
        self
    }
}

#[async_trait]
pub trait Collaborators: Send + Sync {
    async fn club_profile(&self, club_id: &str) -> CollabResult<ClubProfile>;

    async fn analytics_summary(&self, club_id: &str, range: DateRange)
        -> CollabResult<AnalyticsSummary>;

    async fn revenue_trend(&self, club_id: &str, range: DateRange) -> CollabResult<Vec<ChartPoint>>;

    async fn customer_metrics(&self, club_id: &str, range: DateRange)
        -> CollabResult<CustomerMetrics>;

    async fn courts(&self, club_id: &str) -> CollabResult<Vec<Court>>;

    async fn reservations(
        &self,
        club_id: &str,
        query: &ReservationQuery,
    ) -> CollabResult<Vec<Reservation>>;

    async fn blocked_slots(
        &self,
        club_id: &str,
        date: NaiveDate,
        court_ids: Option<&[String]>,
    ) -> CollabResult<Vec<BlockedSlot>>;

    async fn pricing_rules(
        &self,
        club_id: &str,
        court_ids: Option<&[String]>,
    ) -> CollabResult<Vec<PricingRule>>;

    async fn promotions(&self, club_id: &str, date: NaiveDate) -> CollabResult<Vec<Promotion>>;
}
