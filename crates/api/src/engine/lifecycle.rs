//! The request lifecycle state machine.
//!
//! Every transition is delegated to a single conditional write in
//! [`ServiceRequestRepo`]; this service decides *which* write to attempt,
//! turns a refused write into the specific domain error, and publishes
//! the resulting event. Notification fan-out is decoupled: a committed
//! transition is returned to the caller whether or not any subscriber
//! hears about it.

use std::sync::Arc;

use nearhand_core::error::CoreError;
use nearhand_core::geo::GeoPoint;
use nearhand_core::pin::{generate_pin, verify_pin};
use nearhand_core::status::{ProviderStatus, RequestStatus};
use nearhand_core::types::DbId;
use nearhand_db::models::service_request::{CreateServiceRequest, ServiceRequest};
use nearhand_db::repositories::{ServiceRequestRepo, UserRepo};
use nearhand_db::DbPool;
use nearhand_events::{DomainEvent, EventBus};

use crate::error::{AppError, AppResult};

/// Upper bound on free-text field lengths accepted at creation.
const MAX_TEXT_LENGTH: usize = 2_000;

/// The request lifecycle service.
///
/// Constructed once at startup and shared via `AppState`.
pub struct LifecycleEngine {
    pool: DbPool,
    bus: Arc<EventBus>,
    pin_max_attempts: i32,
}

impl LifecycleEngine {
    /// Create a new engine over the given pool and event bus.
    pub fn new(pool: DbPool, bus: Arc<EventBus>, pin_max_attempts: i32) -> Self {
        Self {
            pool,
            bus,
            pin_max_attempts,
        }
    }

    /// Create a new `pending` request for a seeker.
    ///
    /// Validates the payload, persists the row with
    /// `expires_at = now + duration`, and publishes `RequestCreated` so
    /// nearby eligible providers get notified.
    pub async fn create(
        &self,
        seeker_id: DbId,
        input: &CreateServiceRequest,
    ) -> AppResult<ServiceRequest> {
        validate_create(input)?;

        let request = ServiceRequestRepo::create(&self.pool, seeker_id, input).await?;
        tracing::info!(
            request_id = request.id,
            seeker_id,
            category = %request.category,
            "Request created"
        );

        self.bus.publish(DomainEvent::RequestCreated {
            request: request.clone(),
        });
        Ok(request)
    }

    /// Accept a pending request on behalf of a provider.
    ///
    /// The claim itself is one atomic conditional write; concurrent
    /// accepts on the same request resolve there, and exactly one caller
    /// gets the row back. Everything before the claim is advisory
    /// (it produces the more specific `ProviderBusy` error early); the
    /// claim re-validates both conditions.
    pub async fn accept(&self, provider_id: DbId, request_id: DbId) -> AppResult<ServiceRequest> {
        self.sweep_expired().await?;

        let provider = UserRepo::find_by_id(&self.pool, provider_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "user",
                id: provider_id,
            })?;
        if provider.provider_status() == ProviderStatus::InProgress {
            return Err(CoreError::ProviderBusy.into());
        }

        let pin = generate_pin();
        let claimed = ServiceRequestRepo::claim(&self.pool, request_id, provider_id, &pin).await?;

        match claimed {
            Some(request) => {
                tracing::info!(request_id, provider_id, "Request accepted");
                self.bus.publish(DomainEvent::RequestAccepted {
                    request: request.clone(),
                });
                Ok(request)
            }
            // The conditional write matched nothing; re-read to say why.
            None => Err(self.explain_failed_claim(request_id).await?),
        }
    }

    /// Complete an in-progress request with the seeker's PIN.
    ///
    /// A wrong code never changes status; it only bumps the attempt
    /// counter. Once the counter reaches the configured cap, further
    /// attempts are refused outright.
    pub async fn complete(
        &self,
        provider_id: DbId,
        request_id: DbId,
        submitted_code: &str,
    ) -> AppResult<ServiceRequest> {
        self.sweep_expired().await?;

        let request = ServiceRequestRepo::find_by_id(&self.pool, request_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "service request",
                id: request_id,
            })?;

        if request.provider_id != Some(provider_id) {
            return Err(CoreError::Forbidden("Not the assigned provider".into()).into());
        }
        if request.status() != RequestStatus::InProgress {
            return Err(CoreError::InvalidState(format!(
                "request is {}",
                request.status().as_str()
            ))
            .into());
        }
        if request.pin_attempts >= self.pin_max_attempts {
            return Err(CoreError::Forbidden(
                "Completion attempt limit reached for this request".into(),
            )
            .into());
        }

        let stored = request.pin_code.as_deref().ok_or_else(|| {
            AppError::InternalError("in-progress request has no completion code".into())
        })?;
        if !verify_pin(submitted_code, stored) {
            let attempts =
                ServiceRequestRepo::record_failed_pin_attempt(&self.pool, request_id).await?;
            tracing::warn!(request_id, provider_id, ?attempts, "Incorrect completion code");
            return Err(CoreError::InvalidPin.into());
        }

        let completed =
            ServiceRequestRepo::complete(&self.pool, request_id, provider_id, submitted_code)
                .await?;

        match completed {
            Some(request) => {
                tracing::info!(request_id, provider_id, "Request completed");
                self.bus.publish(DomainEvent::RequestCompleted {
                    request: request.clone(),
                });
                Ok(request)
            }
            // Raced with the sweeper between the read and the write.
            None => Err(CoreError::InvalidState("request is no longer in progress".into()).into()),
        }
    }

    /// Cancel a pending request on behalf of its owning seeker.
    pub async fn cancel(&self, seeker_id: DbId, request_id: DbId) -> AppResult<ServiceRequest> {
        self.sweep_expired().await?;

        let cancelled = ServiceRequestRepo::cancel(&self.pool, request_id, seeker_id).await?;

        match cancelled {
            Some(request) => {
                tracing::info!(request_id, seeker_id, "Request cancelled");
                self.bus.publish(DomainEvent::RequestCancelled {
                    request: request.clone(),
                });
                Ok(request)
            }
            None => {
                let request = ServiceRequestRepo::find_by_id(&self.pool, request_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "service request",
                        id: request_id,
                    })?;
                if request.seeker_id != seeker_id {
                    Err(CoreError::Forbidden("Only the requesting seeker may cancel".into()).into())
                } else {
                    Err(CoreError::InvalidState(format!(
                        "request is {}",
                        request.status().as_str()
                    ))
                    .into())
                }
            }
        }
    }

    /// Fetch the completion PIN for the owning seeker.
    ///
    /// Only valid while the request is `in_progress`.
    pub async fn fetch_pin(&self, seeker_id: DbId, request_id: DbId) -> AppResult<ServiceRequest> {
        self.sweep_expired().await?;

        let request = ServiceRequestRepo::find_by_id(&self.pool, request_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "service request",
                id: request_id,
            })?;

        if request.seeker_id != seeker_id {
            return Err(CoreError::Forbidden("Not the requesting seeker".into()).into());
        }
        if request.status() != RequestStatus::InProgress {
            return Err(CoreError::InvalidState(format!(
                "request is {}",
                request.status().as_str()
            ))
            .into());
        }

        Ok(request)
    }

    /// Force every open request past its window to `expired`.
    ///
    /// Idempotent, and run eagerly on every read/write path that serves
    /// request data so stale entries never leak to clients. A sweep
    /// failure aborts the caller (fail-closed): erroring a listing beats
    /// serving expired entries as live.
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let swept = ServiceRequestRepo::sweep_expired(&self.pool).await?;
        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "Swept expired requests");
        }
        for request in &swept {
            self.bus.publish(DomainEvent::RequestExpired {
                request: request.clone(),
            });
        }
        Ok(swept.len())
    }

    /// Decide which specific error a refused claim maps to.
    async fn explain_failed_claim(&self, request_id: DbId) -> Result<AppError, AppError> {
        let request = ServiceRequestRepo::find_by_id(&self.pool, request_id).await?;
        let err = match request {
            None => CoreError::NotFound {
                entity: "service request",
                id: request_id,
            },
            // Still pending means the claim was refused by the provider
            // guard, unless the window lapsed between sweep and claim.
            Some(r) if r.status() == RequestStatus::Pending => {
                if r.expires_at <= chrono::Utc::now() {
                    CoreError::AlreadyClaimed
                } else {
                    CoreError::ProviderBusy
                }
            }
            Some(_) => CoreError::AlreadyClaimed,
        };
        Ok(err.into())
    }
}

/// Validate a creation payload. Pure so the rules are testable without a
/// database.
fn validate_create(input: &CreateServiceRequest) -> Result<(), CoreError> {
    if input.category.trim().is_empty() {
        return Err(CoreError::Validation("category must not be empty".into()));
    }
    if input.description.trim().is_empty() {
        return Err(CoreError::Validation("description must not be empty".into()));
    }
    if input.description.len() > MAX_TEXT_LENGTH {
        return Err(CoreError::Validation(format!(
            "description must be at most {MAX_TEXT_LENGTH} characters"
        )));
    }
    if input.contact_number.trim().is_empty() {
        return Err(CoreError::Validation(
            "contact number must not be empty".into(),
        ));
    }
    if input.duration_minutes <= 0 {
        return Err(CoreError::Validation(
            "duration must be a positive number of minutes".into(),
        ));
    }
    if let Some(details) = &input.details {
        if details.len() > MAX_TEXT_LENGTH {
            return Err(CoreError::Validation(format!(
                "details must be at most {MAX_TEXT_LENGTH} characters"
            )));
        }
    }
    GeoPoint::new(input.longitude, input.latitude)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_input() -> CreateServiceRequest {
        CreateServiceRequest {
            category: "plumbing".to_string(),
            description: "Leaking kitchen tap".to_string(),
            contact_number: "9876543210".to_string(),
            longitude: 77.59,
            latitude: 12.97,
            duration_minutes: 30,
            details: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_payload() {
        assert!(validate_create(&valid_input()).is_ok());
    }

    #[test]
    fn rejects_blank_required_fields() {
        let mut input = valid_input();
        input.category = "  ".to_string();
        assert_matches!(validate_create(&input), Err(CoreError::Validation(_)));

        let mut input = valid_input();
        input.description = String::new();
        assert_matches!(validate_create(&input), Err(CoreError::Validation(_)));

        let mut input = valid_input();
        input.contact_number = String::new();
        assert_matches!(validate_create(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let mut input = valid_input();
        input.duration_minutes = 0;
        assert_matches!(validate_create(&input), Err(CoreError::Validation(_)));

        input.duration_minutes = -30;
        assert_matches!(validate_create(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut input = valid_input();
        input.longitude = 200.0;
        assert_matches!(validate_create(&input), Err(CoreError::InvalidLocation(_)));

        let mut input = valid_input();
        input.latitude = -91.0;
        assert_matches!(validate_create(&input), Err(CoreError::InvalidLocation(_)));
    }

    #[test]
    fn rejects_oversized_text() {
        let mut input = valid_input();
        input.description = "x".repeat(MAX_TEXT_LENGTH + 1);
        assert_matches!(validate_create(&input), Err(CoreError::Validation(_)));
    }
}
