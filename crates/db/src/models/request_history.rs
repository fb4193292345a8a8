//! Append-only request transition log.

use nearhand_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Transition name recorded when a provider accepts a request.
pub const TRANSITION_ACCEPTED: &str = "accepted";

/// Transition name recorded when a provider completes a request.
pub const TRANSITION_COMPLETED: &str = "completed";

/// A row from the `request_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestHistoryEntry {
    pub id: DbId,
    pub request_id: DbId,
    pub actor_user_id: DbId,
    pub transition: String,
    pub created_at: Timestamp,
}
