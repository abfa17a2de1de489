//! Tenant Context Resolution
//!
//! Turns a verified credential plus the requested club into a
//! [`TenantContext`]. Runs before any cache lookup or collaborator call.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::token::{extract_bearer_token, AccessTokenClaims, TokenVerifier};
use crate::error::{BffError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Staff,
    Viewer,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Viewer => "viewer",
            Role::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved caller for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub user_id: String,
    pub club_id: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct TenantResolver {
    verifier: TokenVerifier,
}

impl TenantResolver {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Verify the bearer credential in `headers`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AccessTokenClaims> {
        let header = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| BffError::unauthenticated("Missing Authorization header"))?
            .to_str()
            .map_err(|_| BffError::unauthenticated("Malformed Authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| BffError::unauthenticated("Expected Bearer credential"))?;

        self.verifier.verify(token)
    }

    /// Bind verified claims to `club_id`, requiring a role in `allowed`.
    pub fn authorize(
        &self,
        claims: &AccessTokenClaims,
        club_id: &str,
        allowed: &[Role],
    ) -> Result<TenantContext> {
        let mut active = claims.active_memberships().peekable();
        if active.peek().is_none() {
            return Err(BffError::NoActiveTenant);
        }

        let membership = active
            .find(|m| m.club_id == club_id)
            .ok_or_else(|| BffError::forbidden(format!("No access to club {}", club_id)))?;

        if !allowed.contains(&membership.role) {
            return Err(BffError::forbidden(format!(
                "Role '{}' may not access this resource",
                membership.role
            )));
        }

        Ok(TenantContext {
            user_id: claims.sub.clone(),
            club_id: membership.club_id.clone(),
            role: membership.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::MembershipClaim;
    use crate::policy::STAFF_ROLES;
    use axum::http::HeaderValue;
    use ch_config::AuthConfig;

    fn resolver() -> TenantResolver {
        TenantResolver::new(TokenVerifier::new(&AuthConfig {
            jwt_secret: "test-secret".into(),
            ..AuthConfig::default()
        }))
    }

    fn claims(memberships: Vec<MembershipClaim>) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: "user-1".into(),
            iss: "clubhub".into(),
            aud: "clubhub-bff".into(),
            exp: 0,
            iat: 0,
            memberships,
        }
    }

    #[test]
    fn test_staff_roles_authorized() {
        let resolver = resolver();
        for role in [Role::Owner, Role::Admin, Role::Staff] {
            let ctx = resolver
                .authorize(&claims(vec![MembershipClaim::new("club-1", role)]), "club-1", STAFF_ROLES)
                .unwrap();
            assert_eq!(ctx.club_id, "club-1");
            assert_eq!(ctx.role, role);
        }
    }

    #[test]
    fn test_viewer_and_unknown_forbidden() {
        let resolver = resolver();
        for role in [Role::Viewer, Role::Unknown] {
            let result = resolver.authorize(
                &claims(vec![MembershipClaim::new("club-1", role)]),
                "club-1",
                STAFF_ROLES,
            );
            assert!(matches!(result, Err(BffError::Forbidden { .. })));
        }
    }

    #[test]
    fn test_other_club_forbidden() {
        let result = resolver().authorize(
            &claims(vec![MembershipClaim::new("club-1", Role::Owner)]),
            "club-2",
            STAFF_ROLES,
        );
        assert!(matches!(result, Err(BffError::Forbidden { .. })));
    }

    #[test]
    fn test_no_active_membership() {
        let mut inactive = MembershipClaim::new("club-1", Role::Owner);
        inactive.active = false;

        let result = resolver().authorize(&claims(vec![inactive]), "club-1", STAFF_ROLES);
        assert!(matches!(result, Err(BffError::NoActiveTenant)));
        let result = resolver().authorize(&claims(vec![]), "club-1", STAFF_ROLES);
        assert!(matches!(result, Err(BffError::NoActiveTenant)));
    }

    #[test]
    fn test_inactive_membership_for_requested_club_is_forbidden() {
        let mut inactive = MembershipClaim::new("club-1", Role::Owner);
        inactive.active = false;
        let memberships = vec![inactive, MembershipClaim::new("club-2", Role::Owner)];

        let result = resolver().authorize(&claims(memberships), "club-1", STAFF_ROLES);
        assert!(matches!(result, Err(BffError::Forbidden { .. })));
    }

    #[test]
    fn test_authenticate_then_authorize() {
        let resolver = resolver();
        let token = resolver
            .verifier()
            .issue("user-9", vec![MembershipClaim::new("club-1", Role::Admin)], 600)
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let claims = resolver.authenticate(&headers).unwrap();
        let ctx = resolver.authorize(&claims, "club-1", STAFF_ROLES).unwrap();
        assert_eq!(ctx.user_id, "user-9");
        assert_eq!(ctx.role, Role::Admin);
    }

    #[test]
    fn test_missing_header_unauthenticated() {
        let result = resolver().authenticate(&HeaderMap::new());
        assert!(matches!(result, Err(BffError::Unauthenticated { .. })));
    }

    #[test]
    fn test_unknown_role_string_deserializes() {
        let m: MembershipClaim =
            serde_json::from_str(r#"{"club_id":"c","role":"superuser"}"#).unwrap();
        assert_eq!(m.role, Role::Unknown);
        assert!(m.active);
    }
}
