//! Response Cache
//!
//! Tenant-scoped cache of fully assembled route responses. Only complete,
//! non-degraded payloads are stored; the route pipeline enforces that.

pub mod key;
pub mod single_flight;
pub mod store;

pub use key::{CacheKey, CacheKeyBuilder};
pub use single_flight::{FlightGuard, SingleFlight};
pub use store::{CacheEntry, CacheStats, InMemoryResponseCache, ResponseCache};
