//! The request lifecycle state machine and the provider matching engine.
//!
//! Both are explicit service objects constructed once at startup and
//! shared via [`AppState`](crate::state::AppState). Side effects that the
//! original design hid in storage hooks (expiry sweeping, history
//! appends) are named operations here, invoked by the read and write
//! paths that need them.

mod lifecycle;
mod matching;

pub use lifecycle::LifecycleEngine;
pub use matching::MatchingEngine;
