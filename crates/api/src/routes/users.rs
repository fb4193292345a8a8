//! Route definitions for the `/users` resource.

use axum::routing::{patch, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// PATCH  /status             -> update_status (provider)
/// PATCH  /location           -> update_location (provider)
/// PUT    /profile-location   -> update_profile_location (either)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", patch(users::update_status))
        .route("/location", patch(users::update_location))
        .route("/profile-location", put(users::update_profile_location))
}
