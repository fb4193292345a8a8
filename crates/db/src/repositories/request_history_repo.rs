//! Repository for the `request_history` table.
//!
//! History rows are appended by the accept/complete CTE statements in
//! [`ServiceRequestRepo`](crate::repositories::ServiceRequestRepo); this
//! repo only reads them back.

use sqlx::PgPool;

use nearhand_core::types::DbId;

use crate::models::request_history::RequestHistoryEntry;

/// Read access to the append-only transition log.
pub struct RequestHistoryRepo;

impl RequestHistoryRepo {
    /// All history entries for a request, oldest first.
    pub async fn list_for_request(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<RequestHistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, RequestHistoryEntry>(
            "SELECT id, request_id, actor_user_id, transition, created_at \
               FROM request_history \
              WHERE request_id = $1 \
              ORDER BY created_at ASC, id ASC",
        )
        .bind(request_id)
        .fetch_all(pool)
        .await
    }
}
