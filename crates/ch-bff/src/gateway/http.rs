//! reqwest-backed collaborators.
//!
//! The club id is always a path segment of the upstream URL
//! (`{base}/clubs/{club_id}/...`), percent-encoded by `Url`.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use ch_config::UpstreamConfig;

use super::{
    CollabResult, Collaborator, CollaboratorError, Collaborators, FailureKind, ReservationQuery,
};
use crate::model::{
    AnalyticsSummary, BlockedSlot, ChartPoint, ClubProfile, Court, CustomerMetrics, DateRange,
    PricingRule, Promotion, Reservation,
};

#[derive(Error, Debug)]
pub enum GatewayBuildError {
    #[error("Invalid {service} URL '{url}': {message}")]
    InvalidUrl {
        service: &'static str,
        url: String,
        message: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

struct Endpoints {
    identity: Url,
    analytics: Url,
    clients: Url,
    reservations: Url,
    courts: Url,
    pricing: Url,
}

pub struct HttpCollaborators {
    client: Client,
    endpoints: Endpoints,
    service_token: Option<String>,
}

impl HttpCollaborators {
    pub fn new(config: &UpstreamConfig) -> Result<Self, GatewayBuildError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        let endpoints = Endpoints {
            identity: base_url("identity", &config.identity_url)?,
            analytics: base_url("analytics", &config.analytics_url)?,
            clients: base_url("clients", &config.clients_url)?,
            reservations: base_url("reservations", &config.reservations_url)?,
            courts: base_url("courts", &config.courts_url)?,
            pricing: base_url("pricing", &config.pricing_url)?,
        };

        Ok(Self {
            client,
            endpoints,
            service_token: config.service_token.clone().filter(|t| !t.is_empty()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        collaborator: Collaborator,
        url: Url,
        query: &[(&str, String)],
    ) -> CollabResult<T> {
        debug!(collaborator = %collaborator, url = %url, "Calling collaborator");

        let mut request = self.client.get(url).query(query);
        if let Some(ref token) = self.service_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollaboratorError::new(collaborator, failure_kind(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::new(
                collaborator,
                FailureKind::Status(status.as_u16()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CollaboratorError::new(collaborator, failure_kind(&e)))
    }
}

fn base_url(service: &'static str, raw: &str) -> Result<Url, GatewayBuildError> {
    let invalid = |message: String| GatewayBuildError::InvalidUrl {
        service,
        url: raw.to_string(),
        message,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    Ok(url)
}

/// `{base}/clubs/{club_id}/{rest...}`
fn club_url(base: &Url, club_id: &str, rest: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("clubs").push(club_id).extend(rest);
    }
    url
}

fn failure_kind(e: &reqwest::Error) -> FailureKind {
    if e.is_timeout() {
        FailureKind::Timeout
    } else if e.is_decode() {
        FailureKind::Decode(e.to_string())
    } else if let Some(status) = e.status() {
        FailureKind::Status(status.as_u16())
    } else {
        FailureKind::Transport(e.to_string())
    }
}

fn range_query(range: DateRange) -> Vec<(&'static str, String)> {
    vec![("from", range.from.to_string()), ("to", range.to.to_string())]
}

fn push_court_filter(query: &mut Vec<(&'static str, String)>, court_ids: Option<&[String]>) {
    if let Some(ids) = court_ids {
        query.push(("court_ids", ids.join(",")));
    }
}

#[async_trait]
impl Collaborators for HttpCollaborators {
    async fn club_profile(&self, club_id: &str) -> CollabResult<ClubProfile> {
        let url = club_url(&self.endpoints.identity, club_id, &[]);
        self.get_json(Collaborator::Profile, url, &[]).await
    }

    async fn analytics_summary(
        &self,
        club_id: &str,
        range: DateRange,
    ) -> CollabResult<AnalyticsSummary> {
        let url = club_url(&self.endpoints.analytics, club_id, &["summary"]);
        self.get_json(Collaborator::Analytics, url, &range_query(range)).await
    }

    async fn revenue_trend(&self, club_id: &str, range: DateRange) -> CollabResult<Vec<ChartPoint>> {
        let url = club_url(&self.endpoints.analytics, club_id, &["revenue-trend"]);
        self.get_json(Collaborator::Analytics, url, &range_query(range)).await
    }

    async fn customer_metrics(
        &self,
        club_id: &str,
        range: DateRange,
    ) -> CollabResult<CustomerMetrics> {
        let url = club_url(&self.endpoints.clients, club_id, &["clients", "metrics"]);
        self.get_json(Collaborator::Clients, url, &range_query(range)).await
    }

    async fn courts(&self, club_id: &str) -> CollabResult<Vec<Court>> {
        let url = club_url(&self.endpoints.courts, club_id, &["courts"]);
        self.get_json(Collaborator::Courts, url, &[]).await
    }

    async fn reservations(
        &self,
        club_id: &str,
        query: &ReservationQuery,
    ) -> CollabResult<Vec<Reservation>> {
        let url = club_url(&self.endpoints.reservations, club_id, &["reservations"]);
        let mut params = range_query(DateRange::new(query.from, query.to));
        push_court_filter(&mut params, query.court_ids.as_deref());
        self.get_json(Collaborator::Reservations, url, &params).await
    }

    async fn blocked_slots(
        &self,
        club_id: &str,
        date: NaiveDate,
        court_ids: Option<&[String]>,
    ) -> CollabResult<Vec<BlockedSlot>> {
        let url = club_url(&self.endpoints.courts, club_id, &["blocked-slots"]);
        let mut params = vec![("date", date.to_string())];
        push_court_filter(&mut params, court_ids);
        self.get_json(Collaborator::BlockedSlots, url, &params).await
    }

    async fn pricing_rules(
        &self,
        club_id: &str,
        court_ids: Option<&[String]>,
    ) -> CollabResult<Vec<PricingRule>> {
        let url = club_url(&self.endpoints.pricing, club_id, &["pricing-rules"]);
        let mut params = Vec::new();
        push_court_filter(&mut params, court_ids);
        self.get_json(Collaborator::Pricing, url, &params).await
    }

    async fn promotions(&self, club_id: &str, date: NaiveDate) -> CollabResult<Vec<Promotion>> {
        let url = club_url(&self.endpoints.pricing, club_id, &["promotions"]);
        self.get_json(Collaborator::Promotions, url, &[("date", date.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_club_url_encodes_club_id() {
        let base = Url::parse("http://courts.internal/api/").unwrap();
        let url = club_url(&base, "club 1/x", &["courts"]);
        assert_eq!(url.as_str(), "http://courts.internal/api/clubs/club%201%2Fx/courts");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = UpstreamConfig {
            pricing_url: "not a url".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            HttpCollaborators::new(&config),
            Err(GatewayBuildError::InvalidUrl { service: "pricing", .. })
        ));
    }
}
