//! Reservations, blocked slots, pricing rules and promotions.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::time::TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
    #[serde(other)]
    Unknown,
}

impl ReservationStatus {
    /// Whether a reservation in this state occupies its court.
    pub fn occupies_court(self) -> bool {
        !matches!(self, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub id: String,
    pub court_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: ReservationStatus,
    #[serde(default)]
    pub client_name: Option<String>,
}

impl Reservation {
    /// End time with a `00:00` end read as midnight at the close of day.
    pub fn end(&self) -> TimeOfDay {
        self.end_time.as_end_after(self.start_time)
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end().minutes().saturating_sub(self.start_time.minutes())
    }
}

/// Maintenance or event block. `court_id = None` blocks every court.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlockedSlot {
    pub id: String,
    #[serde(default)]
    pub court_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub reason: String,
}

impl BlockedSlot {
    pub fn applies_to(&self, court_id: &str, date: NaiveDate) -> bool {
        self.date == date && self.court_id.as_deref().map_or(true, |c| c == court_id)
    }

    pub fn end(&self) -> TimeOfDay {
        self.end_time.as_end_after(self.start_time)
    }
}

/// Time-banded price. Club-wide when `court_id` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricingRule {
    pub id: String,
    #[serde(default)]
    pub court_id: Option<String>,
    /// ISO weekdays (1 = Monday .. 7 = Sunday); absent means every day
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub price: f64,
}

impl PricingRule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().number_from_monday() as u8;
        self.days_of_week
            .as_ref()
            .map_or(true, |days| days.contains(&weekday))
    }

    pub fn covers(&self, start: TimeOfDay) -> bool {
        self.start_time <= start && start < self.end_time.as_end_after(self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub discount_percent: f64,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    /// Restricts the promotion to these courts when present
    #[serde(default)]
    pub court_ids: Option<Vec<String>>,
}

impl Promotion {
    pub fn is_live(&self, court_id: &str, date: NaiveDate) -> bool {
        self.active
            && self.valid_from.map_or(true, |from| from <= date)
            && self.valid_until.map_or(true, |until| date <= until)
            && self
                .court_ids
                .as_ref()
                .map_or(true, |ids| ids.iter().any(|id| id == court_id))
    }

    pub fn covers(&self, start: TimeOfDay) -> bool {
        self.start_time <= start && start < self.end_time.as_end_after(self.start_time)
    }
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> TimeOfDay {
        raw.parse().unwrap()
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: ReservationStatus = serde_json::from_str("\"waitlisted\"").unwrap();
        assert_eq!(status, ReservationStatus::Unknown);
        assert!(status.occupies_court());
        assert!(!ReservationStatus::Cancelled.occupies_court());
        assert!(!ReservationStatus::NoShow.occupies_court());
    }

    #[test]
    fn test_pricing_rule_weekday_filter() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        let rule = PricingRule {
            id: "r1".into(),
            court_id: None,
            days_of_week: Some(vec![1, 2, 3, 4, 5]),
            start_time: t("08:00"),
            end_time: t("10:00"),
            price: 1500.0,
        };
        assert!(rule.applies_on(monday));
        assert!(!rule.applies_on(sunday));
        assert!(rule.covers(t("09:59")));
        assert!(!rule.covers(t("10:00")));
    }

    #[test]
    fn test_promotion_validity_window() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut promo = Promotion {
            id: "p1".into(),
            name: "Early bird".into(),
            discount_percent: 20.0,
            start_time: t("08:00"),
            end_time: t("10:00"),
            active: true,
            valid_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            valid_until: NaiveDate::from_ymd_opt(2024, 3, 31),
            court_ids: Some(vec!["c1".into()]),
        };
        assert!(promo.is_live("c1", date));
        assert!(!promo.is_live("c2", date));

        promo.valid_until = NaiveDate::from_ymd_opt(2024, 3, 14);
        assert!(!promo.is_live("c1", date));
    }

    #[test]
    fn test_midnight_end_times() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let reservation: Reservation = serde_json::from_value(serde_json::json!({
            "id": "late",
            "court_id": "c1",
            "date": "2024-03-15",
            "start_time": "22:30",
            "end_time": "00:00",
            "status": "confirmed"
        }))
        .unwrap();
        assert_eq!(reservation.end(), TimeOfDay::END_OF_DAY);
        assert_eq!(reservation.duration_minutes(), 90);

        let rule = PricingRule {
            id: "night".into(),
            court_id: None,
            days_of_week: None,
            start_time: t("20:00"),
            end_time: t("00:00"),
            price: 2000.0,
        };
        assert!(rule.applies_on(date));
        assert!(rule.covers(t("23:30")));
        assert!(!rule.covers(t("19:30")));

        let promo = Promotion {
            id: "p2".into(),
            name: "Night owl".into(),
            discount_percent: 10.0,
            start_time: t("22:00"),
            end_time: t("00:00"),
            active: true,
            valid_from: None,
            valid_until: None,
            court_ids: None,
        };
        assert!(promo.covers(t("22:00")));

        let block = BlockedSlot {
            id: "b2".into(),
            court_id: None,
            date,
            start_time: t("23:00"),
            end_time: t("00:00"),
            reason: "Lights off".into(),
        };
        assert_eq!(block.end(), TimeOfDay::END_OF_DAY);
    }

    #[test]
    fn test_blocked_slot_scope() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let block = BlockedSlot {
            id: "b1".into(),
            court_id: None,
            date,
            start_time: t("12:00"),
            end_time: t("13:00"),
            reason: "Maintenance".into(),
        };
        assert!(block.applies_to("any", date));
        assert!(!block.applies_to("any", date.succ_opt().unwrap()));
    }
}
