//! Repository for the `users` table.

use sqlx::PgPool;

use nearhand_core::geo::{BoundingBox, GeoPoint};
use nearhand_core::roles::ROLE_PROVIDER;
use nearhand_core::status::ProviderStatus;
use nearhand_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, User};
use crate::repositories::service_request_repo::haversine_sql;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, username, email, password_hash, role, skills, longitude, latitude, \
    provider_status_id, failed_login_count, locked_until, created_at, updated_at";

/// Provides CRUD operations for user accounts.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, role, skills) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.role)
            .bind(&input.skills)
            .fetch_one(pool)
            .await
    }

    /// Find a user by their ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (login path).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Increment the failed-login counter.
    pub async fn increment_failed_login(pool: &PgPool, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users \
                SET failed_login_count = failed_login_count + 1, updated_at = NOW() \
              WHERE id = $1",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Lock the account until the given time.
    pub async fn lock_account(
        pool: &PgPool,
        user_id: DbId,
        until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reset lockout bookkeeping after a successful login.
    pub async fn record_successful_login(pool: &PgPool, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users \
                SET failed_login_count = 0, locked_until = NULL, updated_at = NOW() \
              WHERE id = $1",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Manual provider status override (`online` / `offline`).
    ///
    /// Conditional on the provider not being mid-job: a provider with an
    /// open `in_progress` request cannot free itself by flipping its own
    /// status. Returns `false` when the guard refused the write.
    pub async fn set_provider_status_manual(
        pool: &PgPool,
        provider_id: DbId,
        status: ProviderStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users \
                SET provider_status_id = $2, updated_at = NOW() \
              WHERE id = $1 AND role = $3 AND provider_status_id <> $4",
        )
        .bind(provider_id)
        .bind(status.id())
        .bind(ROLE_PROVIDER)
        .bind(ProviderStatus::InProgress.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the resting profile location (explicit user action, any role).
    pub async fn set_profile_location(
        pool: &PgPool,
        user_id: DbId,
        point: GeoPoint,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET longitude = $2, latitude = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(point.longitude)
        .bind(point.latitude)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// IDs of online providers with `category` in their skills whose
    /// current position (live location, falling back to the resting
    /// profile location) is within `radius_meters` of `center`.
    ///
    /// Used to target "new request nearby" notifications.
    pub async fn find_eligible_provider_ids(
        pool: &PgPool,
        category: &str,
        center: GeoPoint,
        bbox: BoundingBox,
        radius_meters: f64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let distance = haversine_sql!(
            "$4",
            "$5",
            "COALESCE(pl.latitude, u.latitude)",
            "COALESCE(pl.longitude, u.longitude)"
        );
        let query = format!(
            "SELECT u.id FROM users u \
               LEFT JOIN provider_locations pl ON pl.provider_id = u.id \
              WHERE u.role = $1 \
                AND u.provider_status_id = $2 \
                AND $3 = ANY(u.skills) \
                AND COALESCE(pl.latitude, u.latitude) BETWEEN $6 AND $7 \
                AND COALESCE(pl.longitude, u.longitude) BETWEEN $8 AND $9 \
                AND {distance} <= $10"
        );
        sqlx::query_scalar::<_, DbId>(&query)
            .bind(ROLE_PROVIDER)
            .bind(ProviderStatus::Online.id())
            .bind(category)
            .bind(center.latitude)
            .bind(center.longitude)
            .bind(bbox.min_latitude)
            .bind(bbox.max_latitude)
            .bind(bbox.min_longitude)
            .bind(bbox.max_longitude)
            .bind(radius_meters)
            .fetch_all(pool)
            .await
    }
}
