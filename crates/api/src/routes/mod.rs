pub mod auth;
pub mod health;
pub mod requests;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (token via query param)
///
/// /auth/register               register (public)
/// /auth/login                  login (public)
/// /auth/refresh                refresh (public)
/// /auth/logout                 logout (requires auth)
///
/// /requests                    create (seeker)
/// /requests/active             matching query (provider)
/// /requests/accept/{id}        accept (provider)
/// /requests/complete/{id}      complete (provider, body: code)
/// /requests/cancel/{id}        cancel (seeker)
/// /requests/history            own history (either role)
/// /requests/pin/{id}           own completion code (seeker)
///
/// /users/status                manual provider status override
/// /users/location              live provider position
/// /users/profile-location      resting profile location (either role)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/requests", requests::router())
        .nest("/users", users::router())
}
