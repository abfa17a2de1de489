//! ClubHub Backend-for-Frontend
//!
//! Aggregation layer between the club-management UI and the upstream domain
//! services:
//! - Tenant resolution and role checks for every request
//! - Concurrent fan-out to collaborators with per-field degradation
//! - Availability engine (slot generation, pricing, conflict detection)
//! - Tenant-scoped response caching with route-specific TTLs
//! - Fallback payloads so the UI never receives a raw 5xx
//!
//! ## Module Organization
//!
//! - `auth` - credential verification and tenant context
//! - `cache` - cache keys, the response cache and miss coalescing
//! - `gateway` - collaborator contracts and the HTTP implementation
//! - `orchestrator` - fan-out/fan-in under a declarative merge policy
//! - `availability` / `dashboard` - domain computation per route
//! - `routes` - axum handlers sharing one request pipeline

pub mod auth;
pub mod availability;
pub mod cache;
pub mod dashboard;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod model;
pub mod openapi;
pub mod orchestrator;
pub mod policy;
pub mod routes;
pub mod state;

pub use auth::tenant::{Role, TenantContext, TenantResolver};
pub use auth::token::{AccessTokenClaims, MembershipClaim, TokenVerifier};
pub use cache::{CacheEntry, CacheKey, InMemoryResponseCache, ResponseCache, SingleFlight};
pub use error::{BffError, Result};
pub use gateway::{Collaborator, CollaboratorError, Collaborators, FailureKind, HttpCollaborators};
pub use orchestrator::{FallbackReason, FanOut, Gathered, OrchestrationFailure};
pub use policy::{RouteId, RoutePolicy};
pub use routes::bff_router;
pub use state::BffState;
