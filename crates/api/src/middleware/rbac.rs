//! Role-based extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does
//! not match. Authorization is dispatched against the closed [`Role`]
//! variant, so there is exactly one place a role check can go wrong.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use nearhand_core::error::CoreError;
use nearhand_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `seeker` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn seeker_only(RequireSeeker(user): RequireSeeker) -> AppResult<Json<()>> {
///     // user.role is guaranteed to be Role::Seeker here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireSeeker(pub AuthUser);

impl FromRequestParts<AppState> for RequireSeeker {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Seeker {
            return Err(AppError::Core(CoreError::Forbidden(
                "Seeker role required".into(),
            )));
        }
        Ok(RequireSeeker(user))
    }
}

/// Requires the `provider` role. Rejects with 403 Forbidden otherwise.
pub struct RequireProvider(pub AuthUser);

impl FromRequestParts<AppState> for RequireProvider {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Provider {
            return Err(AppError::Core(CoreError::Forbidden(
                "Provider role required".into(),
            )));
        }
        Ok(RequireProvider(user))
    }
}
