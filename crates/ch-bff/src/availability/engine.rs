//! Availability Engine
//!
//! Pure computation from collaborator data to per-court slot schedules.
//! No I/O and no clock: identical inputs always produce identical output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::summary::{summarize, AvailabilitySummary};
use crate::model::{
    BlockedSlot, Court, PricingRule, Promotion, Reservation, ReservationStatus, TimeOfDay,
};

/// Currencies without a minor unit
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["JPY", "KRW", "CLP", "PYG", "VND", "ISK"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityFlags {
    pub include_pricing: bool,
    pub include_conflicts: bool,
}

impl Default for AvailabilityFlags {
    fn default() -> Self {
        Self {
            include_pricing: true,
            include_conflicts: true,
        }
    }
}

/// `[start, end)` partitioned into `slot_minutes` wide slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub slot_minutes: u32,
}

pub struct AvailabilityInput<'a> {
    pub date: NaiveDate,
    pub window: ScheduleWindow,
    pub currency: &'a str,
    pub courts: &'a [Court],
    pub reservations: &'a [Reservation],
    pub blocked_slots: &'a [BlockedSlot],
    pub pricing_rules: &'a [PricingRule],
    pub promotions: &'a [Promotion],
    pub flags: AvailabilityFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PromotionApplication {
    pub id: String,
    pub name: String,
    pub discount_percent: f64,
    pub original_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConflictRef {
    pub reservation_id: String,
    pub status: ReservationStatus,
    #[serde(default)]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_available: bool,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<ConflictRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CourtAvailability {
    pub court_id: String,
    pub name: String,
    pub base_price_per_hour: f64,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub courts: Vec<CourtAvailability>,
    pub summary: AvailabilitySummary,
}

pub fn compute(input: &AvailabilityInput<'_>) -> Availability {
    let windows = generate_slots(&input.window);

    let courts: Vec<CourtAvailability> = input
        .courts
        .iter()
        .map(|court| CourtAvailability {
            court_id: court.id.clone(),
            name: court.name.clone(),
            base_price_per_hour: court.base_price_per_hour,
            slots: windows
                .iter()
                .map(|&(start, end)| build_slot(input, court, start, end))
                .collect(),
        })
        .collect();

    let summary = summarize(&courts, input.reservations, input.date);
    Availability { courts, summary }
}

/// Tile `[start, end)` with fixed-width slots. The last slot is shortened
/// so it ends exactly at `end`.
pub fn generate_slots(window: &ScheduleWindow) -> Vec<(TimeOfDay, TimeOfDay)> {
    let mut slots = Vec::new();
    if window.slot_minutes == 0 {
        return slots;
    }

    let mut start = window.start;
    while start < window.end {
        let end = start.add_minutes(window.slot_minutes).min(window.end);
        slots.push((start, end));
        start = end;
    }
    slots
}

fn build_slot(
    input: &AvailabilityInput<'_>,
    court: &Court,
    start: TimeOfDay,
    end: TimeOfDay,
) -> TimeSlot {
    let (amount, promotion) = if input.flags.include_pricing {
        price_slot(input, court, start)
    } else {
        (court.base_price_per_hour, None)
    };

    let conflicts: Vec<ConflictRef> = if input.flags.include_conflicts {
        input
            .reservations
            .iter()
            .filter(|r| r.court_id == court.id && r.date == input.date)
            .filter(|r| r.status.occupies_court())
            .filter(|r| overlaps(start, end, r.start_time, r.end()))
            .map(|r| ConflictRef {
                reservation_id: r.id.clone(),
                status: r.status,
                client_name: r.client_name.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let blocked_reason = input
        .blocked_slots
        .iter()
        .find(|b| b.applies_to(&court.id, input.date) && overlaps(start, end, b.start_time, b.end()))
        .map(|b| b.reason.clone());

    TimeSlot {
        start_time: start,
        end_time: end,
        is_available: conflicts.is_empty() && blocked_reason.is_none(),
        price: Money {
            amount,
            currency: input.currency.to_string(),
        },
        promotion,
        blocked_reason,
        conflicts,
    }
}

/// Base price from the matching rule (court-scoped first, then club-wide,
/// then the court's own rate), discounted by the single live promotion
/// covering the slot start. Several matching promotions apply none.
fn price_slot(
    input: &AvailabilityInput<'_>,
    court: &Court,
    start: TimeOfDay,
) -> (f64, Option<PromotionApplication>) {
    let matching = |scoped: bool| {
        input.pricing_rules.iter().find(|rule| {
            rule.court_id.is_some() == scoped
                && rule.court_id.as_deref().map_or(true, |id| id == court.id)
                && rule.applies_on(input.date)
                && rule.covers(start)
        })
    };
    let base = matching(true)
        .or_else(|| matching(false))
        .map_or(court.base_price_per_hour, |rule| rule.price);

    let mut live = input
        .promotions
        .iter()
        .filter(|p| p.is_live(&court.id, input.date) && p.covers(start));
    match (live.next(), live.next()) {
        (Some(promo), None) => {
            let discounted = round_to_minor_unit(
                base * (1.0 - promo.discount_percent / 100.0),
                input.currency,
            );
            let application = PromotionApplication {
                id: promo.id.clone(),
                name: promo.name.clone(),
                discount_percent: promo.discount_percent,
                original_price: base,
            };
            (discounted, Some(application))
        }
        _ => (base, None),
    }
}

/// Half-open interval overlap
fn overlaps(a_start: TimeOfDay, a_end: TimeOfDay, b_start: TimeOfDay, b_end: TimeOfDay) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn round_to_minor_unit(amount: f64, currency: &str) -> f64 {
    let zero_decimal = ZERO_DECIMAL_CURRENCIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(currency));
    if zero_decimal {
        amount.round()
    } else {
        (amount * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> TimeOfDay {
        raw.parse().unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn court(id: &str, price: f64) -> Court {
        Court {
            id: id.into(),
            name: format!("Court {}", id),
            sport: Some("padel".into()),
            base_price_per_hour: price,
            active: true,
        }
    }

    fn reservation(id: &str, court_id: &str, start: &str, end: &str) -> Reservation {
        Reservation {
            id: id.into(),
            court_id: court_id.into(),
            date: date(),
            start_time: t(start),
            end_time: t(end),
            status: ReservationStatus::Confirmed,
            client_name: Some("Ana".into()),
        }
    }

    fn window(start: &str, end: &str, minutes: u32) -> ScheduleWindow {
        ScheduleWindow { start: t(start), end: t(end), slot_minutes: minutes }
    }

    fn input<'a>(
        courts: &'a [Court],
        reservations: &'a [Reservation],
        blocked: &'a [BlockedSlot],
        rules: &'a [PricingRule],
        promotions: &'a [Promotion],
    ) -> AvailabilityInput<'a> {
        AvailabilityInput {
            date: date(),
            window: window("08:00", "20:00", 90),
            currency: "EUR",
            courts,
            reservations,
            blocked_slots: blocked,
            pricing_rules: rules,
            promotions,
            flags: AvailabilityFlags::default(),
        }
    }

    #[test]
    fn test_slots_tile_window() {
        let slots = generate_slots(&window("08:00", "20:00", 90));
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0], (t("08:00"), t("09:30")));
        assert_eq!(slots[1], (t("09:30"), t("11:00")));
        assert_eq!(slots[7], (t("18:30"), t("20:00")));
        for pair in slots.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn test_last_slot_truncated() {
        let slots = generate_slots(&window("08:00", "10:00", 90));
        assert_eq!(slots, vec![(t("08:00"), t("09:30")), (t("09:30"), t("10:00"))]);
    }

    #[test]
    fn test_degenerate_windows() {
        assert!(generate_slots(&window("10:00", "10:00", 60)).is_empty());
        assert!(generate_slots(&window("12:00", "10:00", 60)).is_empty());
        assert!(generate_slots(&window("08:00", "10:00", 0)).is_empty());
        assert_eq!(generate_slots(&window("22:00", "24:00", 90)).last().unwrap().1, TimeOfDay::END_OF_DAY);
    }

    #[test]
    fn test_conflict_detection() {
        let courts = [court("1", 20.0)];
        let reservations = [reservation("r1", "1", "10:00", "11:30")];
        let result = compute(&input(&courts, &reservations, &[], &[], &[]));

        let slots = &result.courts[0].slots;
        assert!(slots[0].is_available);
        assert!(slots[0].conflicts.is_empty());
        assert!(!slots[1].is_available);
        assert_eq!(slots[1].conflicts.len(), 1);
        assert_eq!(slots[1].conflicts[0].reservation_id, "r1");
        // 11:00-12:30 overlaps 10:00-11:30 as well
        assert!(!slots[2].is_available);
        assert!(slots[3].is_available);
    }

    #[test]
    fn test_adjacent_reservation_does_not_conflict() {
        let courts = [court("1", 20.0)];
        let reservations = [reservation("r1", "1", "09:30", "11:00")];
        let result = compute(&input(&courts, &reservations, &[], &[], &[]));

        let slots = &result.courts[0].slots;
        assert!(slots[0].is_available);
        assert!(!slots[1].is_available);
        assert!(slots[2].is_available);
    }

    #[test]
    fn test_cancelled_and_other_courts_ignored() {
        let courts = [court("1", 20.0)];
        let mut cancelled = reservation("r1", "1", "08:00", "09:30");
        cancelled.status = ReservationStatus::Cancelled;
        let other_court = reservation("r2", "2", "08:00", "09:30");
        let mut other_day = reservation("r3", "1", "08:00", "09:30");
        other_day.date = date().succ_opt().unwrap();

        let reservations = [cancelled, other_court, other_day];
        let result = compute(&input(&courts, &reservations, &[], &[], &[]));
        assert!(result.courts[0].slots[0].is_available);
    }

    #[test]
    fn test_conflicts_disabled_keeps_blocks() {
        let courts = [court("1", 20.0)];
        let reservations = [reservation("r1", "1", "08:00", "09:30")];
        let blocked = [BlockedSlot {
            id: "b1".into(),
            court_id: Some("1".into()),
            date: date(),
            start_time: t("12:00"),
            end_time: t("13:00"),
            reason: "Maintenance".into(),
        }];
        let mut inp = input(&courts, &reservations, &blocked, &[], &[]);
        inp.flags.include_conflicts = false;

        let result = compute(&inp);
        let slots = &result.courts[0].slots;
        assert!(slots[0].is_available);
        assert!(slots[0].conflicts.is_empty());
        // 11:00-12:30 and 12:30-14:00 overlap the block
        assert!(!slots[2].is_available);
        assert_eq!(slots[2].blocked_reason.as_deref(), Some("Maintenance"));
        assert!(!slots[3].is_available);
        assert!(slots[4].is_available);
    }

    #[test]
    fn test_pricing_and_promotion() {
        let courts = [court("1", 1000.0)];
        let rules = [PricingRule {
            id: "base".into(),
            court_id: None,
            days_of_week: None,
            start_time: t("08:00"),
            end_time: t("10:00"),
            price: 1500.0,
        }];
        let promotions = [Promotion {
            id: "p1".into(),
            name: "Early bird".into(),
            discount_percent: 20.0,
            start_time: t("08:00"),
            end_time: t("10:00"),
            active: true,
            valid_from: None,
            valid_until: None,
            court_ids: None,
        }];
        let result = compute(&input(&courts, &[], &[], &rules, &promotions));
        let slots = &result.courts[0].slots;

        assert_eq!(slots[0].price.amount, 1200.0);
        assert_eq!(slots[0].price.currency, "EUR");
        let promo = slots[0].promotion.as_ref().unwrap();
        assert_eq!(promo.original_price, 1500.0);
        assert_eq!(promo.id, "p1");

        // 09:30 is still inside both windows
        assert_eq!(slots[1].price.amount, 1200.0);
        // 11:00: no rule, no promotion
        assert_eq!(slots[2].price.amount, 1000.0);
        assert!(slots[2].promotion.is_none());
    }

    #[test]
    fn test_pricing_disabled_uses_base_price() {
        let courts = [court("1", 1000.0)];
        let rules = [PricingRule {
            id: "base".into(),
            court_id: None,
            days_of_week: None,
            start_time: t("08:00"),
            end_time: t("20:00"),
            price: 1500.0,
        }];
        let mut inp = input(&courts, &[], &[], &rules, &[]);
        inp.flags.include_pricing = false;

        let result = compute(&inp);
        assert!(result.courts[0]
            .slots
            .iter()
            .all(|s| s.price.amount == 1000.0 && s.promotion.is_none()));
    }

    #[test]
    fn test_court_scoped_rule_wins() {
        let courts = [court("1", 10.0), court("2", 10.0)];
        let rule = |id: &str, court_id: Option<&str>, price: f64| PricingRule {
            id: id.into(),
            court_id: court_id.map(Into::into),
            days_of_week: None,
            start_time: t("08:00"),
            end_time: t("20:00"),
            price,
        };
        let rules = [rule("club", None, 30.0), rule("court-2", Some("2"), 45.0)];
        let result = compute(&input(&courts, &[], &[], &rules, &[]));

        assert_eq!(result.courts[0].slots[0].price.amount, 30.0);
        assert_eq!(result.courts[1].slots[0].price.amount, 45.0);
    }

    #[test]
    fn test_overlapping_promotions_apply_none() {
        let courts = [court("1", 100.0)];
        let promo = |id: &str| Promotion {
            id: id.into(),
            name: id.into(),
            discount_percent: 10.0,
            start_time: t("08:00"),
            end_time: t("12:00"),
            active: true,
            valid_from: None,
            valid_until: None,
            court_ids: None,
        };
        let promotions = [promo("a"), promo("b")];
        let result = compute(&input(&courts, &[], &[], &[], &promotions));

        assert_eq!(result.courts[0].slots[0].price.amount, 100.0);
        assert!(result.courts[0].slots[0].promotion.is_none());
    }

    #[test]
    fn test_reservation_ending_at_midnight_conflicts() {
        let courts = [court("1", 20.0)];
        let late: Reservation = serde_json::from_value(serde_json::json!({
            "id": "late",
            "court_id": "1",
            "date": "2024-03-15",
            "start_time": "22:30",
            "end_time": "00:00",
            "status": "confirmed"
        }))
        .unwrap();
        let reservations = [late];
        let mut late_input = input(&courts, &reservations, &[], &[], &[]);
        late_input.window = window("22:00", "24:00", 90);

        let result = compute(&late_input);
        let slots = &result.courts[0].slots;
        assert_eq!(slots.len(), 2);
        for slot in slots {
            assert!(!slot.is_available, "{} should be booked", slot.start_time);
            assert_eq!(slot.conflicts.len(), 1);
            assert_eq!(slot.conflicts[0].reservation_id, "late");
        }
    }

    #[test]
    fn test_block_until_midnight_closes_last_slot() {
        let courts = [court("1", 20.0)];
        let blocked = [BlockedSlot {
            id: "b1".into(),
            court_id: Some("1".into()),
            date: date(),
            start_time: t("23:00"),
            end_time: t("00:00"),
            reason: "Lights off".into(),
        }];
        let mut late_input = input(&courts, &[], &blocked, &[], &[]);
        late_input.window = window("22:00", "24:00", 60);

        let result = compute(&late_input);
        let slots = &result.courts[0].slots;
        assert!(slots[0].is_available);
        assert!(!slots[1].is_available);
        assert_eq!(slots[1].blocked_reason.as_deref(), Some("Lights off"));
    }

    #[test]
    fn test_rounding_by_currency() {
        assert_eq!(round_to_minor_unit(10.005_1, "EUR"), 10.01);
        assert_eq!(round_to_minor_unit(1234.6, "JPY"), 1235.0);
        assert_eq!(round_to_minor_unit(1234.4, "clp"), 1234.0);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let courts = [court("1", 20.0), court("2", 25.0)];
        let reservations = [
            reservation("r1", "1", "10:00", "11:30"),
            reservation("r2", "2", "18:00", "19:00"),
        ];
        let a = compute(&input(&courts, &reservations, &[], &[], &[]));
        let b = compute(&input(&courts, &reservations, &[], &[], &[]));

        assert_eq!(
            serde_json::to_vec(&a.courts).unwrap(),
            serde_json::to_vec(&b.courts).unwrap()
        );
        assert_eq!(a.summary, b.summary);
    }
}
