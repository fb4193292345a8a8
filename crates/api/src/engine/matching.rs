//! Geospatial provider-matching engine.

use nearhand_core::error::CoreError;
use nearhand_core::geo::GeoPoint;
use nearhand_core::status::ProviderStatus;
use nearhand_core::types::DbId;
use nearhand_db::models::service_request::MatchedRequest;
use nearhand_db::repositories::{ServiceRequestRepo, UserRepo};
use nearhand_db::DbPool;

use crate::error::AppResult;

/// Surfaces pending requests to eligible providers.
///
/// Eligibility: the provider is not mid-job, has a resting location on
/// file, the request category is in the provider's skills, and the
/// request lies within the configured radius of that resting location.
pub struct MatchingEngine {
    pool: DbPool,
    radius_meters: f64,
}

impl MatchingEngine {
    /// Create a new engine with the given matching radius.
    pub fn new(pool: DbPool, radius_meters: f64) -> Self {
        Self {
            pool,
            radius_meters,
        }
    }

    /// Pending, unexpired requests this provider can take, nearest first.
    ///
    /// The caller is expected to have swept expired rows first; the query
    /// additionally filters on `expires_at` so a row expiring between
    /// sweep and query still cannot leak out.
    pub async fn find_eligible(&self, provider_id: DbId) -> AppResult<Vec<MatchedRequest>> {
        let provider = UserRepo::find_by_id(&self.pool, provider_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "user",
                id: provider_id,
            })?;

        if provider.provider_status() == ProviderStatus::InProgress {
            return Err(CoreError::ProviderBusy.into());
        }

        let center = match (provider.longitude, provider.latitude) {
            (Some(longitude), Some(latitude)) => GeoPoint::new(longitude, latitude)?,
            _ => {
                return Err(
                    CoreError::InvalidLocation("provider has no location on file".into()).into(),
                )
            }
        };

        if provider.skills.is_empty() {
            return Ok(Vec::new());
        }

        let bbox = center.bounding_box(self.radius_meters);
        let matches = ServiceRequestRepo::find_pending_in_radius(
            &self.pool,
            center,
            bbox,
            self.radius_meters,
            &provider.skills,
        )
        .await?;

        tracing::debug!(
            provider_id,
            count = matches.len(),
            radius_meters = self.radius_meters,
            "Matching query"
        );
        Ok(matches)
    }
}
