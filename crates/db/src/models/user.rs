//! User entity model and DTOs.
//!
//! A user row mirrors an identity-provider account. Authentication happens at
//! the provider; this table holds the marketplace-specific profile.

use ledgerwell_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    /// Identity-provider user id (`sub` claim).
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// One of `employee`, `therapist`, `employer_admin`.
    pub role: String,
    pub is_active: bool,
    pub onboarding_complete: bool,
    /// Payment-processor customer id, set on first checkout.
    pub payment_customer_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating (or upserting) a user from identity data.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub onboarding_complete: Option<bool>,
}
