//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`DomainEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use tokio::sync::broadcast;

use nearhand_core::geo::GeoPoint;
use nearhand_core::types::{DbId, Timestamp};
use nearhand_db::models::service_request::ServiceRequest;

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// A state change the rest of the system may react to.
///
/// Request-carrying variants hold the post-transition row; subscribers
/// derive per-recipient views from it (the PIN only ever reaches the
/// owning seeker).
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A seeker created a new `pending` request.
    RequestCreated { request: ServiceRequest },
    /// A provider claimed the request; it is now `in_progress` with a PIN.
    RequestAccepted { request: ServiceRequest },
    /// The assigned provider completed the request with the correct PIN.
    RequestCompleted { request: ServiceRequest },
    /// The owning seeker cancelled the request while still `pending`.
    RequestCancelled { request: ServiceRequest },
    /// The sweeper forced the request to `expired`.
    RequestExpired { request: ServiceRequest },
    /// A provider reported a new live position.
    ProviderLocationUpdated {
        provider_id: DbId,
        point: GeoPoint,
        recorded_at: Timestamp,
    },
}

impl DomainEvent {
    /// Short event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::RequestCreated { .. } => "request.created",
            DomainEvent::RequestAccepted { .. } => "request.accepted",
            DomainEvent::RequestCompleted { .. } => "request.completed",
            DomainEvent::RequestCancelled { .. } => "request.cancelled",
            DomainEvent::RequestExpired { .. } => "request.expired",
            DomainEvent::ProviderLocationUpdated { .. } => "provider.location_updated",
        }
    }

    /// The request carried by the event, if any.
    pub fn request(&self) -> Option<&ServiceRequest> {
        match self {
            DomainEvent::RequestCreated { request }
            | DomainEvent::RequestAccepted { request }
            | DomainEvent::RequestCompleted { request }
            | DomainEvent::RequestCancelled { request }
            | DomainEvent::RequestExpired { request } => Some(request),
            DomainEvent::ProviderLocationUpdated { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`DomainEvent`]. Publishing is
/// fire-and-forget: a failed or absent subscriber never affects the
/// transactional write that produced the event.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// delivery is best-effort, at-most-once by design.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nearhand_core::status::RequestStatus;

    fn test_request(id: DbId) -> ServiceRequest {
        let now = chrono::Utc::now();
        ServiceRequest {
            id,
            seeker_id: 1,
            provider_id: None,
            category: "plumbing".to_string(),
            description: "leaking tap".to_string(),
            contact_number: "9876543210".to_string(),
            longitude: 77.59,
            latitude: 12.97,
            duration_minutes: 30,
            details: None,
            status_id: RequestStatus::Pending.id(),
            pin_code: None,
            pin_generated_at: None,
            pin_attempts: 0,
            expires_at: now + chrono::Duration::minutes(30),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::RequestCreated {
            request: test_request(42),
        });

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.name(), "request.created");
        assert_eq!(received.request().map(|r| r.id), Some(42));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DomainEvent::ProviderLocationUpdated {
            provider_id: 7,
            point: GeoPoint {
                longitude: 77.59,
                latitude: 12.97,
            },
            recorded_at: chrono::Utc::now(),
        });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.name(), "provider.location_updated");
        assert_eq!(e2.name(), "provider.location_updated");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers -- this must not panic.
        bus.publish(DomainEvent::RequestExpired {
            request: test_request(1),
        });
    }
}
