//! Handlers for the `/users` resource: provider status override and
//! location updates.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use nearhand_core::error::CoreError;
use nearhand_core::geo::GeoPoint;
use nearhand_core::status::ProviderStatus;
use nearhand_db::models::provider_location::ProviderLocation;
use nearhand_db::models::user::{UpdateLocation, UpdateProviderStatus};
use nearhand_db::repositories::{ProviderLocationRepo, UserRepo};
use nearhand_events::DomainEvent;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireProvider;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for `PATCH /users/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub provider_status: String,
}

/// PATCH /api/v1/users/status
///
/// Manual provider availability override (`online` / `offline`). The
/// engine-managed states (`active`, `in_progress`) cannot be set here,
/// and a provider with an open job cannot free itself.
pub async fn update_status(
    RequireProvider(provider): RequireProvider,
    State(state): State<AppState>,
    Json(input): Json<UpdateProviderStatus>,
) -> AppResult<Json<DataResponse<StatusResponse>>> {
    let status = ProviderStatus::parse_manual(&input.status).ok_or_else(|| {
        CoreError::Validation("status must be 'online' or 'offline'".into())
    })?;

    let updated =
        UserRepo::set_provider_status_manual(&state.pool, provider.user_id, status).await?;
    if !updated {
        return Err(CoreError::ProviderBusy.into());
    }

    tracing::info!(provider_id = provider.user_id, status = status.as_str(), "Provider status set");
    Ok(Json(DataResponse {
        data: StatusResponse {
            provider_status: status.as_str().to_string(),
        },
    }))
}

/// PATCH /api/v1/users/location
///
/// Live position report from a provider device. High frequency; lands in
/// `provider_locations`, never the profile row. Fan-out to watching
/// clients is throttled by the notifier, not here -- every report is
/// durably stored.
pub async fn update_location(
    RequireProvider(provider): RequireProvider,
    State(state): State<AppState>,
    Json(input): Json<UpdateLocation>,
) -> AppResult<Json<DataResponse<ProviderLocation>>> {
    let point = GeoPoint::new(input.longitude, input.latitude)?;

    let location = ProviderLocationRepo::upsert(&state.pool, provider.user_id, point).await?;

    state.event_bus.publish(DomainEvent::ProviderLocationUpdated {
        provider_id: provider.user_id,
        point,
        recorded_at: location.updated_at,
    });

    Ok(Json(DataResponse { data: location }))
}

/// PUT /api/v1/users/profile-location
///
/// Set the resting profile location (explicit action, either role).
/// Providers are matched against this point, not their live position.
pub async fn update_profile_location(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateLocation>,
) -> AppResult<StatusCode> {
    let point = GeoPoint::new(input.longitude, input.latitude)?;
    UserRepo::set_profile_location(&state.pool, auth.user_id, point).await?;
    Ok(StatusCode::NO_CONTENT)
}
