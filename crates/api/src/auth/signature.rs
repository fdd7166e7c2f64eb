//! Shared-secret request checks.
//!
//! Cron triggers present `Authorization: Bearer <CRON_SECRET>`. Identity and
//! scheduling webhooks sign the raw body with `hex(hmac_sha256(secret, body))`
//! in a provider-specific header.

use axum::http::HeaderMap;
use ledgerwell_core::error::CoreError;
use ledgerwell_core::hashing::{sha256_hex, verify_hmac_sha256_hex};

use crate::error::AppError;

/// Require `Authorization: Bearer <secret>`.
///
/// Both sides are hashed before comparison so the check does not short-circuit
/// on the first differing byte of the secret.
pub fn require_bearer_secret(headers: &HeaderMap, secret: &str) -> Result<(), AppError> {
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Missing cron credentials"))?;

    if sha256_hex(presented.trim().as_bytes()) != sha256_hex(secret.as_bytes()) {
        return Err(unauthorized("Invalid cron credentials"));
    }
    Ok(())
}

/// Require a valid hex HMAC-SHA256 signature of `body` in `header`.
pub fn require_hmac_signature(
    headers: &HeaderMap,
    header: &str,
    secret: &str,
    body: &[u8],
) -> Result<(), AppError> {
    let signature = headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing webhook signature"))?;

    if !verify_hmac_sha256_hex(secret.as_bytes(), body, signature.trim()) {
        return Err(unauthorized("Invalid webhook signature"));
    }
    Ok(())
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}
