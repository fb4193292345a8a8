//! Domain core for the Nearhand platform.
//!
//! Leaf crate with no I/O: shared type aliases, the domain error taxonomy,
//! actor roles, request/provider status enums with the legal transition
//! graph, geospatial math, and PIN generation/verification.

pub mod error;
pub mod geo;
pub mod pin;
pub mod roles;
pub mod status;
pub mod types;
