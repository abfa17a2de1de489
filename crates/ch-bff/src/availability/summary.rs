//! Derived statistics over a computed schedule.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::engine::CourtAvailability;
use crate::model::Reservation;

const PEAK_HOURS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilitySummary {
    pub total_slots: u32,
    pub available_slots: u32,
    /// Unavailable share of all slots, two decimals
    pub occupancy_rate: f64,
    /// Up to three `HH:00` buckets with the most reservations
    pub peak_hours: Vec<String>,
}

pub fn summarize(
    courts: &[CourtAvailability],
    reservations: &[Reservation],
    date: NaiveDate,
) -> AvailabilitySummary {
    let total = courts.iter().map(|c| c.slots.len() as u32).sum::<u32>();
    let available = courts
        .iter()
        .flat_map(|c| c.slots.iter())
        .filter(|s| s.is_available)
        .count() as u32;

    let occupancy_rate = if total == 0 {
        0.0
    } else {
        (((total - available) as f64 / total as f64) * 100.0).round() / 100.0
    };

    AvailabilitySummary {
        total_slots: total,
        available_slots: available,
        occupancy_rate,
        peak_hours: peak_hours(courts, reservations, date),
    }
}

fn peak_hours(
    courts: &[CourtAvailability],
    reservations: &[Reservation],
    date: NaiveDate,
) -> Vec<String> {
    let mut buckets: BTreeMap<u32, u32> = BTreeMap::new();
    for r in reservations {
        let on_schedule = courts.iter().any(|c| c.court_id == r.court_id);
        if on_schedule && r.date == date && r.status.occupies_court() {
            *buckets.entry(r.start_time.hour()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(u32, u32)> = buckets.into_iter().collect();
    // stable sort keeps the earlier hour first on ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(PEAK_HOURS)
        .map(|(hour, _)| format!("{:02}:00", hour))
        .collect()
}
