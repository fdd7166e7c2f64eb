//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Resolves the local user behind an identity session token.
//! - [`rbac::RequireTherapist`] -- Requires the `therapist` role.
//! - [`rbac::RequireEmployerAdmin`] -- Requires the `employer_admin` role.
//! - [`rbac::RequireAuth`] -- Requires any authenticated user.

pub mod auth;
pub mod rbac;
