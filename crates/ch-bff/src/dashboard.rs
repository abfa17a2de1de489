//! Dashboard overview: period handling, response shape and the projections
//! derived from the raw reservation list.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::cache::CacheKey;
use crate::fallback::ResponseMeta;
use crate::model::{
    ChartPoint, ClubProfile, Court, CustomerMetrics, DateRange, OccupancyMetrics, Reservation,
    ReservationStatus, RevenueMetrics, TimeOfDay,
};
use crate::policy::RouteId;

const UPCOMING_LIMIT: usize = 5;
const TOP_COURTS_LIMIT: usize = 5;
/// Days past the anchor fetched for the upcoming list
const UPCOMING_HORIZON_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DashboardPeriod {
    Today,
    #[default]
    Week,
    Month,
    Year,
}

impl DashboardPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            DashboardPeriod::Today => "today",
            DashboardPeriod::Week => "week",
            DashboardPeriod::Month => "month",
            DashboardPeriod::Year => "year",
        }
    }

    /// Inclusive range ending on `anchor`.
    pub fn range(self, anchor: NaiveDate) -> DateRange {
        let span = match self {
            DashboardPeriod::Today => 0,
            DashboardPeriod::Week => 6,
            DashboardPeriod::Month => 29,
            DashboardPeriod::Year => 364,
        };
        let from = anchor.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
        DateRange::new(from, anchor)
    }
}

impl FromStr for DashboardPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Ok(DashboardPeriod::Today),
            "week" => Ok(DashboardPeriod::Week),
            "month" => Ok(DashboardPeriod::Month),
            "year" => Ok(DashboardPeriod::Year),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardParams {
    pub club_id: String,
    pub period: DashboardPeriod,
    pub anchor: NaiveDate,
}

impl DashboardParams {
    pub fn range(&self) -> DateRange {
        self.period.range(self.anchor)
    }

    /// Reservations window: the period plus the upcoming horizon.
    pub fn reservation_window(&self) -> DateRange {
        let to = self
            .anchor
            .checked_add_days(Days::new(UPCOMING_HORIZON_DAYS))
            .unwrap_or(NaiveDate::MAX);
        DateRange::new(self.range().from, to)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::builder(RouteId::Dashboard, &self.club_id)
            .param("period", self.period.as_str())
            .param("date", self.anchor)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardMetrics {
    pub revenue: RevenueMetrics,
    pub occupancy: OccupancyMetrics,
    pub customers: CustomerMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HeatmapCell {
    /// ISO weekday, 1 = Monday
    pub weekday: u8,
    pub hour: u8,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpcomingReservation {
    pub id: String,
    pub court_id: String,
    #[serde(default)]
    pub court_name: Option<String>,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: ReservationStatus,
    #[serde(default)]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopCourt {
    pub court_id: String,
    pub name: String,
    pub booked_minutes: u32,
    pub reservations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardOverview {
    pub club: ClubProfile,
    pub period: DashboardPeriod,
    pub range: DateRange,
    pub metrics: DashboardMetrics,
    pub revenue_chart: Vec<ChartPoint>,
    pub occupancy_heatmap: Vec<HeatmapCell>,
    pub upcoming_reservations: Vec<UpcomingReservation>,
    pub top_courts: Vec<TopCourt>,
    pub meta: ResponseMeta,
}

/// Merged collaborator data for one overview
#[derive(Debug, Default)]
pub struct DashboardSources {
    pub club: ClubProfile,
    pub revenue: RevenueMetrics,
    pub occupancy: OccupancyMetrics,
    pub customers: CustomerMetrics,
    pub revenue_chart: Vec<ChartPoint>,
    pub reservations: Vec<Reservation>,
    pub courts: Vec<Court>,
}

pub fn assemble(params: &DashboardParams, sources: DashboardSources, meta: ResponseMeta) -> DashboardOverview {
    let range = params.range();
    let in_period: Vec<&Reservation> = sources
        .reservations
        .iter()
        .filter(|r| range.contains(r.date) && r.status.occupies_court())
        .collect();

    DashboardOverview {
        occupancy_heatmap: heatmap(&in_period),
        upcoming_reservations: upcoming(&sources.reservations, &sources.courts, params.anchor),
        top_courts: top_courts(&in_period, &sources.courts),
        club: sources.club,
        period: params.period,
        range,
        metrics: DashboardMetrics {
            revenue: sources.revenue,
            occupancy: sources.occupancy,
            customers: sources.customers,
        },
        revenue_chart: sources.revenue_chart,
        meta,
    }
}

fn heatmap(reservations: &[&Reservation]) -> Vec<HeatmapCell> {
    let mut cells: BTreeMap<(u8, u8), u32> = BTreeMap::new();
    for r in reservations {
        let weekday = r.date.weekday().number_from_monday() as u8;
        *cells.entry((weekday, r.start_time.hour() as u8)).or_default() += 1;
    }
    cells
        .into_iter()
        .map(|((weekday, hour), count)| HeatmapCell { weekday, hour, count })
        .collect()
}

fn upcoming(reservations: &[Reservation], courts: &[Court], anchor: NaiveDate) -> Vec<UpcomingReservation> {
    let names: HashMap<&str, &str> = courts.iter().map(|c| (c.id.as_str(), c.name.as_str())).collect();

    let mut next: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.date >= anchor && r.status.occupies_court())
        .collect();
    next.sort_by(|a, b| (a.date, a.start_time, &a.id).cmp(&(b.date, b.start_time, &b.id)));

    next.into_iter()
        .take(UPCOMING_LIMIT)
        .map(|r| UpcomingReservation {
            id: r.id.clone(),
            court_id: r.court_id.clone(),
            court_name: names.get(r.court_id.as_str()).map(|n| n.to_string()),
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
            client_name: r.client_name.clone(),
        })
        .collect()
}

fn top_courts(reservations: &[&Reservation], courts: &[Court]) -> Vec<TopCourt> {
    let mut ranked: Vec<TopCourt> = courts
        .iter()
        .map(|court| {
            let (minutes, count) = reservations
                .iter()
                .filter(|r| r.court_id == court.id)
                .fold((0u32, 0u32), |(m, n), r| (m + r.duration_minutes(), n + 1));
            TopCourt {
                court_id: court.id.clone(),
                name: court.name.clone(),
                booked_minutes: minutes,
                reservations: count,
            }
        })
        .filter(|c| c.booked_minutes > 0)
        .collect();

    ranked.sort_by(|a, b| b.booked_minutes.cmp(&a.booked_minutes).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_COURTS_LIMIT);
    ranked
}
