//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! match. Use these in route handlers to enforce authorization at the type
//! level.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ledgerwell_core::error::CoreError;
use ledgerwell_core::roles::{ROLE_EMPLOYER_ADMIN, ROLE_THERAPIST};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `therapist` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn therapist_only(RequireTherapist(user): RequireTherapist) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireTherapist(pub AuthUser);

impl FromRequestParts<AppState> for RequireTherapist {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_THERAPIST {
            return Err(AppError::Core(CoreError::Forbidden(
                "Therapist role required".into(),
            )));
        }
        Ok(RequireTherapist(user))
    }
}

/// Requires the `employer_admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireEmployerAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireEmployerAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_EMPLOYER_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Employer admin role required".into(),
            )));
        }
        Ok(RequireEmployerAdmin(user))
    }
}

/// Requires any authenticated user (any role).
///
/// Functionally equivalent to [`AuthUser`] but named explicitly for route
/// definitions where "this route requires authentication" should be
/// self-documenting.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}
