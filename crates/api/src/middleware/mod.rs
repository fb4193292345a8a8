//! Request extractors for authentication and role-based authorization.

pub mod auth;
pub mod rbac;

pub use auth::AuthUser;
pub use rbac::{RequireProvider, RequireSeeker};
