//! The realtime notifier: translates typed domain events into wire
//! messages for connected clients.
//!
//! The lifecycle engine knows nothing about transports; it publishes
//! [`DomainEvent`](nearhand_events::DomainEvent)s, and the
//! [`NotificationRouter`] here is the thin adapter that turns them into
//! WebSocket frames. Delivery is best-effort, at-most-once: a client
//! disconnected at the moment of an event reconciles via a full-state
//! fetch, not a replay.

mod router;

pub use router::NotificationRouter;

use axum::extract::ws::Message;

/// Wire event kind: sent once after a successful authenticated upgrade.
pub const EVENT_CONNECTED: &str = "connected";

/// Wire event kind: a request owned by / assigned to the recipient changed.
pub const EVENT_REQUEST_UPDATED: &str = "requestUpdated";

/// Wire event kind: a new pending request appeared near the recipient.
pub const EVENT_NEW_REQUEST: &str = "newRequestNotification";

/// Wire event kind: a provider's live position moved.
pub const EVENT_PROVIDER_LOCATION_UPDATED: &str = "providerLocationUpdated";

/// Wire event kind: the server failed while handling this connection.
pub const EVENT_SERVER_ERROR: &str = "serverError";

/// Wire event kind: the connection's credential was rejected.
pub const EVENT_AUTH_ERROR: &str = "authError";

/// Build the standard wire envelope for an event.
pub fn envelope(kind: &str, payload: serde_json::Value) -> Message {
    let body = serde_json::json!({
        "type": kind,
        "payload": payload,
        "timestamp": chrono::Utc::now(),
    });
    Message::Text(body.to_string().into())
}
