//! Typed domain events and the in-process event bus.
//!
//! The lifecycle engine publishes [`DomainEvent`]s; the realtime notifier
//! subscribes and translates them to wire messages. The core stays
//! transport-agnostic: nothing in here knows about WebSockets.

pub mod bus;

pub use bus::{DomainEvent, EventBus};
