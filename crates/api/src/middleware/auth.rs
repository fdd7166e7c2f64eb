//! Session-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ledgerwell_core::error::CoreError;
use ledgerwell_core::roles::{is_known_role, DEFAULT_ROLE};
use ledgerwell_core::types::DbId;
use ledgerwell_core::validation::normalize_email;
use ledgerwell_db::models::user::{CreateUser, User};
use ledgerwell_db::repositories::{BookingSessionRepo, UserRepo};

use crate::auth::session::{validate_session_token, IdentityClaims};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated local user resolved from an identity session token in the
/// `Authorization` header.
///
/// The first request from an unknown identity creates the local user row.
/// The role comes from the local row, not the token, so role changes take
/// effect before the provider re-issues tokens.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id.
    pub user_id: DbId,
    /// The identity-provider id (`claims.sub`).
    pub external_id: String,
    pub email: String,
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_session_token(token, &state.config.identity.jwt_secret).map_err(
            |_| AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())),
        )?;

        let user = match UserRepo::find_by_external_id(&state.pool, &claims.sub).await? {
            Some(user) => user,
            None => provision_user(state, &claims).await?,
        };

        if !user.is_active {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is deactivated".into(),
            )));
        }

        Ok(AuthUser {
            user_id: user.id,
            external_id: user.external_id,
            email: user.email,
            role: user.role,
        })
    }
}

/// Create the local user for a first-seen identity and attach any bookings
/// made earlier with the same email.
async fn provision_user(state: &AppState, claims: &IdentityClaims) -> Result<User, AppError> {
    let email = claims.email.as_deref().ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Session token carries no email".into(),
        ))
    })?;
    let email = normalize_email(email)?;

    let role = claims
        .role
        .as_deref()
        .filter(|r| is_known_role(r))
        .unwrap_or(DEFAULT_ROLE)
        .to_string();

    let user = UserRepo::upsert_by_external_id(
        &state.pool,
        &CreateUser {
            external_id: claims.sub.clone(),
            email,
            first_name: None,
            last_name: None,
            role,
        },
    )
    .await?;

    let linked = BookingSessionRepo::link_email_to_user(&state.pool, &user.email, user.id).await?;

    tracing::info!(
        user_id = user.id,
        external_id = %user.external_id,
        role = %user.role,
        linked_bookings = linked,
        "Provisioned user from session token",
    );

    Ok(user)
}
