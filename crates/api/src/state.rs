use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::{LifecycleEngine, MatchingEngine};
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Services are explicitly constructed in `main` and injected here --
/// no ambient singletons -- so tests can assemble the same state from
/// fakes. Cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: nearhand_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager.
    pub ws_manager: Arc<WsManager>,
    /// Centralized bus for publishing domain events.
    pub event_bus: Arc<nearhand_events::EventBus>,
    /// Request lifecycle state machine.
    pub lifecycle: Arc<LifecycleEngine>,
    /// Geospatial provider-matching engine.
    pub matching: Arc<MatchingEngine>,
}
