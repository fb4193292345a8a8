//! Handlers for the `/requests` resource: the full request lifecycle.
//!
//! Role checks happen in the extractors ([`RequireSeeker`] /
//! [`RequireProvider`]); ownership and state checks happen in the
//! lifecycle engine. Every read path sweeps expired rows first so a
//! lapsed request can never be served as live.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use nearhand_core::roles::Role;
use nearhand_core::types::{DbId, Timestamp};
use nearhand_db::models::service_request::{CreateServiceRequest, ServiceRequestView};
use nearhand_db::repositories::ServiceRequestRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireProvider, RequireSeeker};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PATCH /requests/complete/{id}`.
#[derive(Debug, Deserialize)]
pub struct CompleteRequestBody {
    /// The 6-digit code read back by the seeker.
    pub code: String,
}

/// One entry of the `/requests/active` listing.
#[derive(Debug, Serialize)]
pub struct ActiveRequestEntry {
    pub request: ServiceRequestView,
    /// Spherical distance from the provider's resting location, meters.
    pub distance_meters: f64,
}

/// Response for `GET /requests/pin/{id}`.
#[derive(Debug, Serialize)]
pub struct PinResponse {
    pub request_id: DbId,
    pub pin_code: String,
    pub pin_generated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/requests
///
/// Create a new service request. Returns 201 with the pending request.
pub async fn create_request(
    RequireSeeker(seeker): RequireSeeker,
    State(state): State<AppState>,
    Json(input): Json<CreateServiceRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ServiceRequestView>>)> {
    let request = state.lifecycle.create(seeker.user_id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: request.view_for_seeker(),
        }),
    ))
}

/// GET /api/v1/requests/active
///
/// Matching query: pending requests this provider can take, nearest
/// first. Sweeps expired rows before answering.
pub async fn active_requests(
    RequireProvider(provider): RequireProvider,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ActiveRequestEntry>>>> {
    state.lifecycle.sweep_expired().await?;

    let matches = state.matching.find_eligible(provider.user_id).await?;
    let entries = matches
        .into_iter()
        .map(|m| ActiveRequestEntry {
            request: m.request.view_public(),
            distance_meters: m.distance_meters,
        })
        .collect();

    Ok(Json(DataResponse { data: entries }))
}

/// PATCH /api/v1/requests/accept/{id}
///
/// Accept a pending request. Exactly one of any number of concurrent
/// accepts wins; the others receive `ALREADY_CLAIMED`.
pub async fn accept_request(
    RequireProvider(provider): RequireProvider,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ServiceRequestView>>> {
    let request = state.lifecycle.accept(provider.user_id, id).await?;
    Ok(Json(DataResponse {
        data: request.view_public(),
    }))
}

/// PATCH /api/v1/requests/complete/{id}
///
/// Complete an in-progress request with the seeker's code.
pub async fn complete_request(
    RequireProvider(provider): RequireProvider,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<CompleteRequestBody>,
) -> AppResult<Json<DataResponse<ServiceRequestView>>> {
    let request = state
        .lifecycle
        .complete(provider.user_id, id, body.code.trim())
        .await?;
    Ok(Json(DataResponse {
        data: request.view_public(),
    }))
}

/// PATCH /api/v1/requests/cancel/{id}
///
/// Cancel an own pending request.
pub async fn cancel_request(
    RequireSeeker(seeker): RequireSeeker,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ServiceRequestView>>> {
    let request = state.lifecycle.cancel(seeker.user_id, id).await?;
    Ok(Json(DataResponse {
        data: request.view_for_seeker(),
    }))
}

/// GET /api/v1/requests/history
///
/// The caller's own requests, newest first: created ones for seekers,
/// accepted ones for providers. Sweeps expired rows first.
pub async fn request_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ServiceRequestView>>>> {
    state.lifecycle.sweep_expired().await?;

    let requests = match auth.role {
        Role::Seeker => {
            ServiceRequestRepo::list_for_seeker(
                &state.pool,
                auth.user_id,
                params.limit,
                params.offset,
            )
            .await?
        }
        Role::Provider => {
            ServiceRequestRepo::list_for_provider(
                &state.pool,
                auth.user_id,
                params.limit,
                params.offset,
            )
            .await?
        }
    };

    let views = requests
        .into_iter()
        .map(|r| match auth.role {
            Role::Seeker => r.view_for_seeker(),
            Role::Provider => r.view_public(),
        })
        .collect();

    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/requests/pin/{id}
///
/// Fetch the completion code for an own in-progress request. The seeker
/// reads this code to the provider when the job is done.
pub async fn request_pin(
    RequireSeeker(seeker): RequireSeeker,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PinResponse>>> {
    let request = state.lifecycle.fetch_pin(seeker.user_id, id).await?;

    let pin_code = request.pin_code.clone().unwrap_or_default();
    Ok(Json(DataResponse {
        data: PinResponse {
            request_id: request.id,
            pin_code,
            pin_generated_at: request.pin_generated_at,
        },
    }))
}
