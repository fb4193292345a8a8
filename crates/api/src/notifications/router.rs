//! Event-to-WebSocket routing engine.
//!
//! [`NotificationRouter`] subscribes to the domain event bus and fans
//! each event out to the clients it concerns: the owning seeker, the
//! assigned provider, or nearby eligible providers. Provider location
//! updates are rate-bounded by movement and staleness so a chatty device
//! does not become an update storm for everyone rendering its marker.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, Mutex};

use nearhand_core::geo::GeoPoint;
use nearhand_core::types::{DbId, Timestamp};
use nearhand_db::models::service_request::ServiceRequest;
use nearhand_db::repositories::UserRepo;
use nearhand_db::DbPool;
use nearhand_events::DomainEvent;

use crate::ws::WsManager;

use super::{
    envelope, EVENT_NEW_REQUEST, EVENT_PROVIDER_LOCATION_UPDATED, EVENT_REQUEST_UPDATED,
};

/// Last broadcast position and time for a provider, used for throttling.
#[derive(Debug, Clone, Copy)]
struct BroadcastMark {
    point: GeoPoint,
    at: Timestamp,
}

/// Routes domain events to connected WebSocket clients.
pub struct NotificationRouter {
    pool: DbPool,
    ws_manager: Arc<WsManager>,
    /// Radius for "new request nearby" targeting.
    radius_meters: f64,
    /// Minimum movement before a location update is re-broadcast.
    min_move_meters: f64,
    /// Maximum age of the last broadcast before one goes out regardless.
    max_staleness: chrono::Duration,
    /// Per-provider throttle state.
    marks: Mutex<HashMap<DbId, BroadcastMark>>,
}

impl NotificationRouter {
    /// Create a new router.
    pub fn new(
        pool: DbPool,
        ws_manager: Arc<WsManager>,
        radius_meters: f64,
        min_move_meters: f64,
        max_staleness_secs: u64,
    ) -> Self {
        Self {
            pool,
            ws_manager,
            radius_meters,
            min_move_meters,
            max_staleness: chrono::Duration::seconds(max_staleness_secs as i64),
            marks: Mutex::new(HashMap::new()),
        }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each
    /// event. The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](nearhand_events::EventBus) is dropped). Routing
    /// failures are logged and never propagate anywhere: the transition
    /// that produced the event has already committed.
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event = event.name(),
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event to all affected clients.
    async fn route_event(&self, event: &DomainEvent) -> Result<(), sqlx::Error> {
        match event {
            DomainEvent::RequestCreated { request } => {
                self.notify_nearby_providers(request).await?;
            }
            DomainEvent::RequestAccepted { request }
            | DomainEvent::RequestCompleted { request }
            | DomainEvent::RequestCancelled { request }
            | DomainEvent::RequestExpired { request } => {
                self.notify_request_parties(request).await;
            }
            DomainEvent::ProviderLocationUpdated {
                provider_id,
                point,
                recorded_at,
            } => {
                self.maybe_broadcast_location(*provider_id, *point, *recorded_at)
                    .await;
            }
        }
        Ok(())
    }

    /// "New request nearby": online providers whose skills match and whose
    /// current position is within radius of the request.
    async fn notify_nearby_providers(&self, request: &ServiceRequest) -> Result<(), sqlx::Error> {
        let center = request.location();
        let bbox = center.bounding_box(self.radius_meters);
        let provider_ids = UserRepo::find_eligible_provider_ids(
            &self.pool,
            &request.category,
            center,
            bbox,
            self.radius_meters,
        )
        .await?;

        if provider_ids.is_empty() {
            return Ok(());
        }

        let payload = serde_json::to_value(request.view_public())
            .unwrap_or_else(|_| json!({ "id": request.id }));
        let msg = envelope(EVENT_NEW_REQUEST, payload);
        for provider_id in provider_ids {
            self.ws_manager.send_to_user(provider_id, msg.clone()).await;
        }
        Ok(())
    }

    /// Push the full updated request to the seeker who owns it and the
    /// provider assigned to it. The seeker's view carries the PIN (the
    /// seeker hands it over in person); every other view redacts it.
    async fn notify_request_parties(&self, request: &ServiceRequest) {
        let seeker_payload = serde_json::to_value(request.view_for_seeker())
            .unwrap_or_else(|_| json!({ "id": request.id }));
        self.ws_manager
            .send_to_user(request.seeker_id, envelope(EVENT_REQUEST_UPDATED, seeker_payload))
            .await;

        if let Some(provider_id) = request.provider_id {
            let provider_payload = serde_json::to_value(request.view_public())
                .unwrap_or_else(|_| json!({ "id": request.id }));
            self.ws_manager
                .send_to_user(provider_id, envelope(EVENT_REQUEST_UPDATED, provider_payload))
                .await;
        }
    }

    /// Broadcast a provider position if it moved far enough or the last
    /// broadcast is stale enough.
    async fn maybe_broadcast_location(
        &self,
        provider_id: DbId,
        point: GeoPoint,
        recorded_at: Timestamp,
    ) {
        {
            let mut marks = self.marks.lock().await;
            let last = marks.get(&provider_id);
            if !should_rebroadcast(
                last.map(|m| (m.point, m.at)),
                point,
                recorded_at,
                self.min_move_meters,
                self.max_staleness,
            ) {
                return;
            }
            marks.insert(
                provider_id,
                BroadcastMark {
                    point,
                    at: recorded_at,
                },
            );
        }

        let msg = envelope(
            EVENT_PROVIDER_LOCATION_UPDATED,
            json!({
                "provider_id": provider_id,
                "longitude": point.longitude,
                "latitude": point.latitude,
                "updated_at": recorded_at,
            }),
        );
        self.ws_manager.broadcast(msg).await;
    }
}

/// Throttle decision: broadcast when there is no prior mark, when the
/// provider moved at least `min_move_meters`, or when the last broadcast
/// is older than `max_staleness`.
fn should_rebroadcast(
    last: Option<(GeoPoint, Timestamp)>,
    point: GeoPoint,
    now: Timestamp,
    min_move_meters: f64,
    max_staleness: chrono::Duration,
) -> bool {
    match last {
        None => true,
        Some((last_point, last_at)) => {
            last_point.distance_meters(&point) >= min_move_meters
                || now - last_at >= max_staleness
        }
    }
}
