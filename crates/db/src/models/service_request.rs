//! Service request entity model, DTOs, and external-facing views.

use nearhand_core::geo::GeoPoint;
use nearhand_core::status::RequestStatus;
use nearhand_core::types::{DbId, StatusId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `service_requests` table.
///
/// Carries the completion PIN -- use [`ServiceRequestView`] for responses
/// so the PIN only ever reaches the owning seeker.
#[derive(Debug, Clone, FromRow)]
pub struct ServiceRequest {
    pub id: DbId,
    pub seeker_id: DbId,
    pub provider_id: Option<DbId>,
    pub category: String,
    pub description: String,
    pub contact_number: String,
    pub longitude: f64,
    pub latitude: f64,
    pub duration_minutes: i32,
    pub details: Option<String>,
    pub status_id: StatusId,
    pub pin_code: Option<String>,
    pub pin_generated_at: Option<Timestamp>,
    pub pin_attempts: i32,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ServiceRequest {
    /// Decode the stored status id. The FK to `request_statuses` makes an
    /// unknown id unreachable; `Expired` is the conservative fallback.
    pub fn status(&self) -> RequestStatus {
        RequestStatus::from_id(self.status_id).unwrap_or(RequestStatus::Expired)
    }

    /// The request's point location.
    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }

    /// View for the owning seeker: includes the PIN.
    pub fn view_for_seeker(&self) -> ServiceRequestView {
        self.view(true)
    }

    /// View for providers and broadcasts: PIN redacted.
    pub fn view_public(&self) -> ServiceRequestView {
        self.view(false)
    }

    fn view(&self, include_pin: bool) -> ServiceRequestView {
        ServiceRequestView {
            id: self.id,
            seeker_id: self.seeker_id,
            provider_id: self.provider_id,
            category: self.category.clone(),
            description: self.description.clone(),
            contact_number: self.contact_number.clone(),
            longitude: self.longitude,
            latitude: self.latitude,
            duration_minutes: self.duration_minutes,
            details: self.details.clone(),
            status: self.status().as_str().to_string(),
            pin_code: if include_pin {
                self.pin_code.clone()
            } else {
                None
            },
            pin_generated_at: self.pin_generated_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// External-facing request representation.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRequestView {
    pub id: DbId,
    pub seeker_id: DbId,
    pub provider_id: Option<DbId>,
    pub category: String,
    pub description: String,
    pub contact_number: String,
    pub longitude: f64,
    pub latitude: f64,
    pub duration_minutes: i32,
    pub details: Option<String>,
    pub status: String,
    /// Present only in seeker-directed views while the PIN exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<String>,
    pub pin_generated_at: Option<Timestamp>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new request via `POST /requests`.
#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub category: String,
    pub description: String,
    pub contact_number: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Validity window in minutes; must be a positive integer.
    pub duration_minutes: i32,
    pub details: Option<String>,
}

/// A matched request with its distance from the querying provider.
#[derive(Debug, Clone, FromRow)]
pub struct MatchedRequest {
    #[sqlx(flatten)]
    pub request: ServiceRequest,
    pub distance_meters: f64,
}
