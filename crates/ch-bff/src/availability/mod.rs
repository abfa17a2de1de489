//! Reservation availability: request parameters, response body and the
//! slot engine.

pub mod engine;
pub mod summary;

pub use engine::{
    compute, generate_slots, Availability, AvailabilityFlags, AvailabilityInput, ConflictRef,
    CourtAvailability, Money, PromotionApplication, ScheduleWindow, TimeSlot,
};
pub use summary::AvailabilitySummary;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cache::CacheKey;
use crate::fallback::ResponseMeta;
use crate::model::TimeOfDay;
use crate::policy::RouteId;

/// Caller-supplied override of the club's operating window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Validated availability request
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityParams {
    pub club_id: String,
    pub date: NaiveDate,
    /// `None` means every active court
    pub court_ids: Option<Vec<String>>,
    pub flags: AvailabilityFlags,
    pub time_range: Option<TimeRange>,
}

impl AvailabilityParams {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::builder(RouteId::Availability, &self.club_id)
            .param("date", self.date)
            .list("court_ids", self.court_ids.as_deref())
            .flag("include_pricing", self.flags.include_pricing)
            .flag("include_conflicts", self.flags.include_conflicts)
            .opt_param("start", self.time_range.map(|r| r.start))
            .opt_param("end", self.time_range.map(|r| r.end))
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub club_id: String,
    pub date: NaiveDate,
    pub currency: String,
    pub courts: Vec<CourtAvailability>,
    pub summary: AvailabilitySummary,
    pub meta: ResponseMeta,
}
