//! Access Token Verification
//!
//! HS256 JWTs issued by the identity service. The claims carry the caller's
//! club memberships so tenant resolution needs no upstream round trip.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use ch_config::AuthConfig;

use super::tenant::Role;
use crate::error::{BffError, Result};

/// JWT claims for BFF access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub iss: String,
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    #[serde(default)]
    pub memberships: Vec<MembershipClaim>,
}

/// One club the caller belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipClaim {
    pub club_id: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl MembershipClaim {
    pub fn new(club_id: impl Into<String>, role: Role) -> Self {
        Self { club_id: club_id.into(), role, active: true }
    }
}

impl AccessTokenClaims {
    pub fn active_memberships(&self) -> impl Iterator<Item = &MembershipClaim> {
        self.memberships.iter().filter(|m| m.active)
    }
}

/// Verifies (and, for tooling and tests, issues) access tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway_secs: u64,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway_secs: config.leeway_secs,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway_secs;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    BffError::unauthenticated("Token expired")
                }
                _ => BffError::unauthenticated(format!("Invalid token: {}", e)),
            })
    }

    /// Sign a token for `user_id` with the given memberships.
    pub fn issue(
        &self,
        user_id: &str,
        memberships: Vec<MembershipClaim>,
        ttl_secs: i64,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: now + ttl_secs,
            iat: now,
            memberships,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| BffError::internal(format!("Failed to sign token: {}", e)))
    }
}

/// Extract bearer token from Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
