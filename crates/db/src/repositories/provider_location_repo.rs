//! Repository for the `provider_locations` table.
//!
//! One row per provider, overwritten on every update. These writes are
//! high frequency (device position reports) and deliberately never touch
//! the `users` row.

use sqlx::PgPool;

use nearhand_core::geo::GeoPoint;
use nearhand_core::types::DbId;

use crate::models::provider_location::ProviderLocation;

/// Provides point-in-time live location storage for providers.
pub struct ProviderLocationRepo;

impl ProviderLocationRepo {
    /// Upsert the provider's current position, returning the stored row.
    pub async fn upsert(
        pool: &PgPool,
        provider_id: DbId,
        point: GeoPoint,
    ) -> Result<ProviderLocation, sqlx::Error> {
        sqlx::query_as::<_, ProviderLocation>(
            "INSERT INTO provider_locations (provider_id, longitude, latitude, updated_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (provider_id) DO UPDATE \
                SET longitude = EXCLUDED.longitude, \
                    latitude = EXCLUDED.latitude, \
                    updated_at = NOW() \
             RETURNING provider_id, longitude, latitude, updated_at",
        )
        .bind(provider_id)
        .bind(point.longitude)
        .bind(point.latitude)
        .fetch_one(pool)
        .await
    }

    /// Fetch a provider's live location, if one has been reported.
    pub async fn find_by_provider(
        pool: &PgPool,
        provider_id: DbId,
    ) -> Result<Option<ProviderLocation>, sqlx::Error> {
        sqlx::query_as::<_, ProviderLocation>(
            "SELECT provider_id, longitude, latitude, updated_at \
               FROM provider_locations WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_optional(pool)
        .await
    }
}
