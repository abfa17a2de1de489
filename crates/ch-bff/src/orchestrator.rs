//! Aggregation Orchestrator
//!
//! Fans out to collaborators concurrently and merges their results under a
//! declarative per-route [`MergePolicy`]. Sibling calls are never cancelled:
//! every call settles before the merge. A failed degradable field contributes
//! its zero value; a failed critical field fails the whole orchestration,
//! which the route pipeline turns into a fallback response.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::gateway::{Collaborator, CollaboratorError};
use crate::model::{
    AnalyticsSummary, BlockedSlot, ChartPoint, ClubProfile, Court, CustomerMetrics, PricingRule,
    Promotion, Reservation,
};
use crate::policy::RouteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// Failure aborts the orchestration
    Critical,
    /// Failure contributes the field's zero value
    Degradable,
}

/// Output field -> collaborator -> behavior on failure
#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    pub field: &'static str,
    pub collaborator: Collaborator,
    pub criticality: Criticality,
}

const fn critical(field: &'static str, collaborator: Collaborator) -> FieldPolicy {
    FieldPolicy { field, collaborator, criticality: Criticality::Critical }
}

const fn degradable(field: &'static str, collaborator: Collaborator) -> FieldPolicy {
    FieldPolicy { field, collaborator, criticality: Criticality::Degradable }
}

#[derive(Debug)]
pub struct MergePolicy {
    pub route: RouteId,
    pub fields: &'static [FieldPolicy],
}

impl MergePolicy {
    pub fn field(&self, name: &str) -> Option<&FieldPolicy> {
        self.fields.iter().find(|f| f.field == name)
    }
}

pub mod fields {
    pub const CLUB: &str = "club";
    pub const SUMMARY: &str = "metrics.summary";
    pub const CUSTOMERS: &str = "metrics.customers";
    pub const REVENUE_CHART: &str = "revenue_chart";
    pub const RESERVATIONS: &str = "reservations";
    pub const COURTS: &str = "courts";
    pub const BLOCKED_SLOTS: &str = "blocked_slots";
    pub const PRICING_RULES: &str = "pricing_rules";
    pub const PROMOTIONS: &str = "promotions";
}

pub static DASHBOARD_POLICY: MergePolicy = MergePolicy {
    route: RouteId::Dashboard,
    fields: &[
        critical(fields::CLUB, Collaborator::Profile),
        degradable(fields::SUMMARY, Collaborator::Analytics),
        degradable(fields::CUSTOMERS, Collaborator::Clients),
        degradable(fields::REVENUE_CHART, Collaborator::Analytics),
        degradable(fields::RESERVATIONS, Collaborator::Reservations),
        degradable(fields::COURTS, Collaborator::Courts),
    ],
};

pub static AVAILABILITY_POLICY: MergePolicy = MergePolicy {
    route: RouteId::Availability,
    fields: &[
        critical(fields::COURTS, Collaborator::Courts),
        degradable(fields::CLUB, Collaborator::Profile),
        degradable(fields::RESERVATIONS, Collaborator::Reservations),
        degradable(fields::BLOCKED_SLOTS, Collaborator::BlockedSlots),
        degradable(fields::PRICING_RULES, Collaborator::Pricing),
        degradable(fields::PROMOTIONS, Collaborator::Promotions),
    ],
};

/// Tag surfaced in `X-Error` and `meta.error` on fallback responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    CriticalUpstream,
    Unexpected,
}

impl FallbackReason {
    pub fn tag(self) -> &'static str {
        match self {
            FallbackReason::CriticalUpstream => "critical_upstream_unavailable",
            FallbackReason::Unexpected => "orchestration_error",
        }
    }
}

#[derive(Error, Debug, Clone)]
#[error("{} orchestration failed ({}): {detail}", .route.as_str(), .reason.tag())]
pub struct OrchestrationFailure {
    pub route: RouteId,
    pub reason: FallbackReason,
    pub detail: String,
    /// Fields whose collaborator failed
    pub failed: Vec<&'static str>,
}

impl OrchestrationFailure {
    pub fn unexpected(route: RouteId, detail: impl Into<String>) -> Self {
        Self {
            route,
            reason: FallbackReason::Unexpected,
            detail: detail.into(),
            failed: Vec::new(),
        }
    }
}

/// A successful collaborator result, tagged by shape.
#[derive(Debug, Clone)]
pub enum Upstream {
    Club(ClubProfile),
    Summary(AnalyticsSummary),
    Trend(Vec<ChartPoint>),
    Customers(CustomerMetrics),
    Courts(Vec<Court>),
    Reservations(Vec<Reservation>),
    BlockedSlots(Vec<BlockedSlot>),
    PricingRules(Vec<PricingRule>),
    Promotions(Vec<Promotion>),
}

pub trait FromUpstream: Sized {
    fn from_upstream(value: Upstream) -> Option<Self>;
}

macro_rules! upstream_value {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Upstream {
                fn from(value: $ty) -> Self {
                    Upstream::$variant(value)
                }
            }

            impl FromUpstream for $ty {
                fn from_upstream(value: Upstream) -> Option<Self> {
                    match value {
                        Upstream::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

upstream_value! {
    Club => ClubProfile,
    Summary => AnalyticsSummary,
    Trend => Vec<ChartPoint>,
    Customers => CustomerMetrics,
    Courts => Vec<Court>,
    Reservations => Vec<Reservation>,
    BlockedSlots => Vec<BlockedSlot>,
    PricingRules => Vec<PricingRule>,
    Promotions => Vec<Promotion>,
}

type PendingCall<'a> = BoxFuture<'a, Result<Upstream, CollaboratorError>>;

/// Builder for one fan-out. Calls are only started by [`FanOut::join`].
pub struct FanOut<'a> {
    policy: &'static MergePolicy,
    timeout: Option<Duration>,
    calls: Vec<(&'static str, PendingCall<'a>)>,
}

impl<'a> FanOut<'a> {
    pub fn new(policy: &'static MergePolicy) -> Self {
        Self {
            policy,
            timeout: None,
            calls: Vec::new(),
        }
    }

    /// Per-call ceiling on top of whatever the transport enforces.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn call<T, F>(mut self, field: &'static str, call: F) -> Self
    where
        T: Into<Upstream>,
        F: Future<Output = Result<T, CollaboratorError>> + Send + 'a,
    {
        self.calls.push((field, call.map(|r| r.map(Into::into)).boxed()));
        self
    }

    pub async fn join(self) -> Result<Gathered, OrchestrationFailure> {
        let policy = self.policy;
        let route = policy.route;

        let mut resolved = Vec::with_capacity(self.calls.len());
        for (field, call) in self.calls {
            let spec = policy.field(field).copied().ok_or_else(|| {
                OrchestrationFailure::unexpected(
                    route,
                    format!("field '{}' is not part of the {} merge policy", field, route.as_str()),
                )
            })?;
            resolved.push((spec, bounded(spec.collaborator, self.timeout, call)));
        }

        let (specs, pending): (Vec<FieldPolicy>, Vec<_>) = resolved.into_iter().unzip();
        let results = join_all(pending).await;

        let mut gathered = Gathered::default();
        let mut critical_failures = Vec::new();
        for (spec, result) in specs.into_iter().zip(results) {
            match result {
                Ok(value) => {
                    gathered.values.insert(spec.field, value);
                }
                Err(e) => {
                    warn!(
                        route = route.as_str(),
                        field = spec.field,
                        collaborator = %e.collaborator,
                        error = %e.kind,
                        "Collaborator call failed"
                    );
                    metrics::counter!(
                        "bff_collaborator_failures_total",
                        "route" => route.as_str(),
                        "collaborator" => e.collaborator.as_str()
                    )
                    .increment(1);

                    match spec.criticality {
                        Criticality::Critical => critical_failures.push((spec.field, e)),
                        Criticality::Degradable => gathered.degraded.push(spec.field),
                    }
                }
            }
        }

        if critical_failures.is_empty() {
            return Ok(gathered);
        }

        let detail = critical_failures
            .iter()
            .map(|(field, e)| format!("{}: {}", field, e))
            .collect::<Vec<_>>()
            .join("; ");
        let mut failed: Vec<&'static str> = critical_failures.into_iter().map(|(f, _)| f).collect();
        failed.extend(gathered.degraded.iter().copied());

        Err(OrchestrationFailure {
            route,
            reason: FallbackReason::CriticalUpstream,
            detail,
            failed,
        })
    }
}

async fn bounded(
    collaborator: Collaborator,
    timeout: Option<Duration>,
    call: PendingCall<'_>,
) -> Result<Upstream, CollaboratorError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(CollaboratorError::timeout(collaborator))),
        None => call.await,
    }
}

/// Settled results of a fan-out.
#[derive(Debug, Default)]
pub struct Gathered {
    values: HashMap<&'static str, Upstream>,
    degraded: Vec<&'static str>,
}

impl Gathered {
    /// The field's value, or its zero value if the call failed or was skipped.
    pub fn take<T: FromUpstream + Default>(&mut self, field: &'static str) -> T {
        self.try_take(field).unwrap_or_default()
    }

    pub fn try_take<T: FromUpstream>(&mut self, field: &'static str) -> Option<T> {
        self.values.remove(field).and_then(T::from_upstream)
    }

    /// The field's value; absence is an orchestration failure.
    pub fn require<T: FromUpstream>(
        &mut self,
        route: RouteId,
        field: &'static str,
    ) -> Result<T, OrchestrationFailure> {
        self.try_take(field).ok_or_else(|| {
            OrchestrationFailure::unexpected(route, format!("missing required field '{}'", field))
        })
    }

    /// Fields that degraded to their zero value.
    pub fn degraded(&self) -> &[&'static str] {
        &self.degraded
    }
}

/// Run `fut`, converting a panic into an orchestration failure.
pub async fn catch_panics<T, F>(route: RouteId, fut: F) -> Result<T, OrchestrationFailure>
where
    F: Future<Output = Result<T, OrchestrationFailure>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(OrchestrationFailure::unexpected(route, panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic during orchestration".to_string()
    }
}
