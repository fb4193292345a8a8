//! Live provider location model.

use nearhand_core::geo::GeoPoint;
use nearhand_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `provider_locations` table. One per provider,
/// overwritten on every update.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProviderLocation {
    pub provider_id: DbId,
    pub longitude: f64,
    pub latitude: f64,
    pub updated_at: Timestamp,
}

impl ProviderLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}
