//! Identity-provider session tokens.
//!
//! The identity provider issues HS256-signed JWTs after sign-in; the backend
//! only verifies them. [`issue_session_token`] mints equivalent tokens for
//! local tooling and integration tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by an identity session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityClaims {
    /// Subject -- the user's identity-provider id.
    pub sub: String,
    pub email: Option<String>,
    /// Role from the provider's public metadata, when set.
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

impl IdentityClaims {
    /// Claims for `sub` valid for `ttl_secs` from now.
    pub fn new(
        sub: impl Into<String>,
        email: Option<String>,
        role: Option<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: sub.into(),
            email,
            role,
            exp: now + ttl_secs,
            iat: now,
        }
    }
}

/// Validate and decode a session token, returning the embedded claims.
///
/// Validates the signature and expiration.
pub fn validate_session_token(
    token: &str,
    secret: &str,
) -> Result<IdentityClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<IdentityClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

/// Sign `claims` with the shared HS256 secret.
pub fn issue_session_token(
    claims: &IdentityClaims,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-identity-secret";

    #[test]
    fn issued_token_validates() {
        let claims = IdentityClaims::new(
            "user_2abc",
            Some("client@example.com".into()),
            Some("therapist".into()),
            600,
        );
        let token = issue_session_token(&claims, SECRET).unwrap();
        let decoded = validate_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, "user_2abc");
        assert_eq!(decoded.role.as_deref(), Some("therapist"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = IdentityClaims::new("user_2abc", None, None, 600);
        let token = issue_session_token(&claims, SECRET).unwrap();
        assert!(validate_session_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Beyond the default 60s leeway.
        let claims = IdentityClaims::new("user_2abc", None, None, -600);
        let token = issue_session_token(&claims, SECRET).unwrap();
        assert!(validate_session_token(&token, SECRET).is_err());
    }
}
