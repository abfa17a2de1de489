//! Value objects exchanged with collaborators and returned to the UI.
//!
//! Everything here is request-scoped: built from upstream payloads on a
//! cache miss, never persisted by the BFF.

pub mod analytics;
pub mod booking;
pub mod club;
pub mod time;

pub use analytics::{AnalyticsSummary, ChartPoint, CustomerMetrics, OccupancyMetrics, RevenueMetrics};
pub use booking::{BlockedSlot, PricingRule, Promotion, Reservation, ReservationStatus};
pub use club::{ClubProfile, Court};
pub use time::{DateRange, TimeOfDay, TimeParseError};
