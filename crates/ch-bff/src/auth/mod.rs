//! Caller authentication and tenant resolution.

pub mod tenant;
pub mod token;

pub use tenant::{Role, TenantContext, TenantResolver};
pub use token::{extract_bearer_token, AccessTokenClaims, MembershipClaim, TokenVerifier};
