//! Route definitions for the `/requests` resource.
//!
//! All endpoints require authentication; role enforcement lives in the
//! handler extractors.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::requests;
use crate::state::AppState;

/// Routes mounted at `/requests`.
///
/// ```text
/// POST   /                  -> create_request (seeker)
/// GET    /active            -> active_requests (provider)
/// PATCH  /accept/{id}       -> accept_request (provider)
/// PATCH  /complete/{id}     -> complete_request (provider)
/// PATCH  /cancel/{id}       -> cancel_request (seeker)
/// GET    /history           -> request_history (either)
/// GET    /pin/{id}          -> request_pin (seeker)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(requests::create_request))
        .route("/active", get(requests::active_requests))
        .route("/accept/{id}", patch(requests::accept_request))
        .route("/complete/{id}", patch(requests::complete_request))
        .route("/cancel/{id}", patch(requests::cancel_request))
        .route("/history", get(requests::request_history))
        .route("/pin/{id}", get(requests::request_pin))
}
