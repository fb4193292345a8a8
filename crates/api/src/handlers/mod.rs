//! HTTP handler implementations, grouped by resource.

pub mod auth;
pub mod requests;
pub mod users;
