//! Authentication primitives.
//!
//! - [`session`] -- verification of identity-provider session tokens.
//! - [`signature`] -- shared-secret checks for cron triggers and webhooks.

pub mod session;
pub mod signature;
