use crate::types::DbId;

/// Domain error taxonomy shared by the lifecycle engine, matching engine,
/// and HTTP layer.
///
/// Every failure condition has a specific variant; callers must never
/// collapse these into a generic failure. Race losses (`AlreadyClaimed`)
/// in particular have to stay distinguishable so clients refresh state
/// instead of blindly retrying.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Lost the accept race: the request is no longer `pending`.
    #[error("Request already claimed or no longer pending")]
    AlreadyClaimed,

    /// Transition attempted from a state that does not allow it.
    #[error("Invalid state for this operation: {0}")]
    InvalidState(String),

    /// Provider already has an open in-progress request.
    #[error("Provider already has a request in progress")]
    ProviderBusy,

    /// Submitted completion code does not match the stored PIN.
    #[error("Incorrect completion code")]
    InvalidPin,

    /// Coordinates outside the valid longitude/latitude ranges, or a
    /// provider with no location on file.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
