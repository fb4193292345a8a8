//! User entity model and DTOs.

use nearhand_core::status::ProviderStatus;
use nearhand_core::types::{DbId, StatusId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub skills: Vec<String>,
    /// Resting profile longitude; distinct from the live location.
    pub longitude: Option<f64>,
    /// Resting profile latitude; distinct from the live location.
    pub latitude: Option<f64>,
    pub provider_status_id: StatusId,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Decode the stored provider status id. Falls back to `Offline` for
    /// ids outside the seeded set (which the FK makes unreachable).
    pub fn provider_status(&self) -> ProviderStatus {
        ProviderStatus::from_id(self.provider_status_id).unwrap_or(ProviderStatus::Offline)
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
    pub skills: Vec<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub provider_status: String,
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let provider_status = user.provider_status().as_str().to_string();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            skills: user.skills,
            longitude: user.longitude,
            latitude: user.latitude,
            provider_status,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user. The password arrives pre-hashed; plaintext
/// never crosses the repository boundary.
#[derive(Debug)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub skills: Vec<String>,
}

/// Request body for `PATCH /users/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateProviderStatus {
    /// `"online"` or `"offline"`; engine-managed states are rejected.
    pub status: String,
}

/// Request body for location updates (live and resting).
#[derive(Debug, Deserialize)]
pub struct UpdateLocation {
    pub longitude: f64,
    pub latitude: f64,
}
