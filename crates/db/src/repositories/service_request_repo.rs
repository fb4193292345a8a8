//! Repository for the `service_requests` table.
//!
//! All status transitions are conditional writes (check-and-set on
//! `status_id`), never read-then-write. The accept, complete, and sweep
//! statements use data-modifying CTEs so the request update, the history
//! append, and the provider status flip commit atomically: two providers
//! racing to accept the same request resolve on the row lock, and exactly
//! one observes the returned row.

use sqlx::PgPool;

use nearhand_core::geo::{BoundingBox, GeoPoint};
use nearhand_core::status::{ProviderStatus, RequestStatus};
use nearhand_core::types::DbId;

use crate::models::request_history::{TRANSITION_ACCEPTED, TRANSITION_COMPLETED};
use crate::models::service_request::{CreateServiceRequest, MatchedRequest, ServiceRequest};

/// Column list for `service_requests` queries.
const COLUMNS: &str = "\
    id, seeker_id, provider_id, category, description, contact_number, \
    longitude, latitude, duration_minutes, details, status_id, \
    pin_code, pin_generated_at, pin_attempts, expires_at, \
    created_at, updated_at";

/// Spherical distance in meters between a bound center point
/// (`$lat`/`$lon` placeholders) and the row's coordinates. Haversine on a
/// 6 371 km Earth; `least(1.0, ...)` guards asin against rounding above 1.
macro_rules! haversine_sql {
    ($lat:literal, $lon:literal, $row_lat:literal, $row_lon:literal) => {
        concat!(
            "2 * 6371000 * asin(least(1.0, sqrt( ",
            "power(sin(radians((", $row_lat, " - ", $lat, ") / 2)), 2) ",
            "+ cos(radians(", $lat, ")) * cos(radians(", $row_lat, ")) ",
            "* power(sin(radians((", $row_lon, " - ", $lon, ") / 2)), 2)))) "
        )
    };
}

/// Maximum page size for history listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for history listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD and lifecycle operations for service requests.
pub struct ServiceRequestRepo;

impl ServiceRequestRepo {
    /// Insert a new `pending` request. `expires_at` is computed once here
    /// (`NOW() + duration`) and never touched again.
    pub async fn create(
        pool: &PgPool,
        seeker_id: DbId,
        input: &CreateServiceRequest,
    ) -> Result<ServiceRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO service_requests \
                 (seeker_id, category, description, contact_number, \
                  longitude, latitude, duration_minutes, details, status_id, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
                     NOW() + $7 * INTERVAL '1 minute') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(seeker_id)
            .bind(&input.category)
            .bind(&input.description)
            .bind(&input.contact_number)
            .bind(input.longitude)
            .bind(input.latitude)
            .bind(input.duration_minutes)
            .bind(&input.details)
            .bind(RequestStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a request by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM service_requests WHERE id = $1");
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim a pending request for a provider.
    ///
    /// One conditional write covers the whole accept: the status CAS
    /// (`pending` → `in_progress`), the PIN stamp, the history append,
    /// and the provider's flip to `in_progress`. The `NOT EXISTS` guard
    /// re-validates provider exclusivity inside the same statement, so a
    /// provider racing through two tabs cannot hold two open requests.
    ///
    /// Returns `None` when the claim found nothing to update: the request
    /// is unknown, no longer `pending`, past its window, or the provider
    /// is busy. The caller re-reads to produce the specific error.
    pub async fn claim(
        pool: &PgPool,
        request_id: DbId,
        provider_id: DbId,
        pin_code: &str,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "WITH claimed AS ( \
                 UPDATE service_requests \
                    SET provider_id = $2, status_id = $4, pin_code = $3, \
                        pin_generated_at = NOW(), updated_at = NOW() \
                  WHERE id = $1 \
                    AND status_id = $5 \
                    AND expires_at > NOW() \
                    AND NOT EXISTS ( \
                        SELECT 1 FROM users \
                         WHERE id = $2 AND provider_status_id = $6 \
                    ) \
                  RETURNING {COLUMNS} \
             ), history AS ( \
                 INSERT INTO request_history (request_id, actor_user_id, transition) \
                 SELECT id, $2, '{TRANSITION_ACCEPTED}' FROM claimed \
             ), provider AS ( \
                 UPDATE users SET provider_status_id = $6, updated_at = NOW() \
                  WHERE id = $2 AND EXISTS (SELECT 1 FROM claimed) \
             ) \
             SELECT {COLUMNS} FROM claimed"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(request_id)
            .bind(provider_id)
            .bind(pin_code)
            .bind(RequestStatus::InProgress.id())
            .bind(RequestStatus::Pending.id())
            .bind(ProviderStatus::InProgress.id())
            .fetch_optional(pool)
            .await
    }

    /// Atomically complete an in-progress request.
    ///
    /// The PIN match is part of the WHERE clause, so a stale or wrong code
    /// can never flip the status. On success the provider reverts to
    /// `online` and a `completed` history entry is appended, all in the
    /// same statement. Returns `None` when nothing matched.
    pub async fn complete(
        pool: &PgPool,
        request_id: DbId,
        provider_id: DbId,
        pin_code: &str,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "WITH done AS ( \
                 UPDATE service_requests \
                    SET status_id = $4, updated_at = NOW() \
                  WHERE id = $1 \
                    AND provider_id = $2 \
                    AND status_id = $5 \
                    AND pin_code = $3 \
                  RETURNING {COLUMNS} \
             ), history AS ( \
                 INSERT INTO request_history (request_id, actor_user_id, transition) \
                 SELECT id, $2, '{TRANSITION_COMPLETED}' FROM done \
             ), provider AS ( \
                 UPDATE users SET provider_status_id = $6, updated_at = NOW() \
                  WHERE id = $2 AND EXISTS (SELECT 1 FROM done) \
             ) \
             SELECT {COLUMNS} FROM done"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(request_id)
            .bind(provider_id)
            .bind(pin_code)
            .bind(RequestStatus::Completed.id())
            .bind(RequestStatus::InProgress.id())
            .bind(ProviderStatus::Online.id())
            .fetch_optional(pool)
            .await
    }

    /// Record a failed completion attempt. Returns the new attempt count,
    /// or `None` if the request is not `in_progress` anymore.
    pub async fn record_failed_pin_attempt(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE service_requests \
                SET pin_attempts = pin_attempts + 1, updated_at = NOW() \
              WHERE id = $1 AND status_id = $2 \
              RETURNING pin_attempts",
        )
        .bind(request_id)
        .bind(RequestStatus::InProgress.id())
        .fetch_optional(pool)
        .await
    }

    /// Cancel a pending request owned by `seeker_id`. Conditional on both
    /// ownership and `pending` status; no history entry is appended.
    pub async fn cancel(
        pool: &PgPool,
        request_id: DbId,
        seeker_id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests \
                SET status_id = $3, updated_at = NOW() \
              WHERE id = $1 AND seeker_id = $2 AND status_id = $4 \
              RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(request_id)
            .bind(seeker_id)
            .bind(RequestStatus::Cancelled.id())
            .bind(RequestStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Force every open request past its validity window to `expired`,
    /// freeing any provider still assigned to a swept row.
    ///
    /// Idempotent: a second run right after the first matches nothing.
    /// Terminal rows are untouched, so expiry never overwrites
    /// `completed` or `cancelled`. Returns the swept rows so the caller
    /// can publish events for them.
    pub async fn sweep_expired(pool: &PgPool) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "WITH swept AS ( \
                 UPDATE service_requests \
                    SET status_id = $1, updated_at = NOW() \
                  WHERE status_id IN ($2, $3) AND expires_at < NOW() \
                  RETURNING {COLUMNS} \
             ), freed AS ( \
                 UPDATE users \
                    SET provider_status_id = $4, updated_at = NOW() \
                  WHERE provider_status_id = $5 \
                    AND id IN (SELECT provider_id FROM swept WHERE provider_id IS NOT NULL) \
             ) \
             SELECT {COLUMNS} FROM swept"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(RequestStatus::Expired.id())
            .bind(RequestStatus::Pending.id())
            .bind(RequestStatus::InProgress.id())
            .bind(ProviderStatus::Online.id())
            .bind(ProviderStatus::InProgress.id())
            .fetch_all(pool)
            .await
    }

    /// Pending, unexpired requests matching any of `skills` within
    /// `radius_meters` of `center`, nearest first, ties newest first.
    ///
    /// The bounding box narrows the scan to an index window; the exact
    /// haversine predicate refines it. The window does not wrap the
    /// antimeridian.
    pub async fn find_pending_in_radius(
        pool: &PgPool,
        center: GeoPoint,
        bbox: BoundingBox,
        radius_meters: f64,
        skills: &[String],
    ) -> Result<Vec<MatchedRequest>, sqlx::Error> {
        let distance = haversine_sql!("$1", "$2", "latitude", "longitude");
        let query = format!(
            "SELECT q.* FROM ( \
                 SELECT {COLUMNS}, {distance} AS distance_meters \
                   FROM service_requests \
                  WHERE status_id = $3 \
                    AND expires_at > NOW() \
                    AND category = ANY($4) \
                    AND latitude BETWEEN $5 AND $6 \
                    AND longitude BETWEEN $7 AND $8 \
             ) q \
             WHERE q.distance_meters <= $9 \
             ORDER BY q.distance_meters ASC, q.created_at DESC"
        );
        sqlx::query_as::<_, MatchedRequest>(&query)
            .bind(center.latitude)
            .bind(center.longitude)
            .bind(RequestStatus::Pending.id())
            .bind(skills)
            .bind(bbox.min_latitude)
            .bind(bbox.max_latitude)
            .bind(bbox.min_longitude)
            .bind(bbox.max_longitude)
            .bind(radius_meters)
            .fetch_all(pool)
            .await
    }

    /// List a seeker's own requests, newest first.
    pub async fn list_for_seeker(
        pool: &PgPool,
        seeker_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        Self::list_by_column(pool, "seeker_id", seeker_id, limit, offset).await
    }

    /// List the requests a provider has accepted, newest first.
    pub async fn list_for_provider(
        pool: &PgPool,
        provider_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        Self::list_by_column(pool, "provider_id", provider_id, limit, offset).await
    }

    async fn list_by_column(
        pool: &PgPool,
        column: &str,
        user_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = offset.unwrap_or(0);
        let query = format!(
            "SELECT {COLUMNS} FROM service_requests \
              WHERE {column} = $1 \
              ORDER BY created_at DESC \
              LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}

pub(crate) use haversine_sql;
