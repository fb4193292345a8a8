//! Actor roles.
//!
//! Exactly one of two roles per account. Handlers dispatch authorization
//! against the [`Role`] variant, never against raw strings.

use serde::{Deserialize, Serialize};

/// Role name for seekers as stored in the database and JWT claims.
pub const ROLE_SEEKER: &str = "seeker";

/// Role name for providers as stored in the database and JWT claims.
pub const ROLE_PROVIDER: &str = "provider";

/// Closed actor role variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates service requests.
    Seeker,
    /// Browses and fulfils requests; has skills and a live location.
    Provider,
}

impl Role {
    /// Database / wire representation of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Seeker => ROLE_SEEKER,
            Role::Provider => ROLE_PROVIDER,
        }
    }

    /// Parse a stored role string. Returns `None` for anything outside
    /// the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ROLE_SEEKER => Some(Role::Seeker),
            ROLE_PROVIDER => Some(Role::Provider),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        assert_eq!(Role::parse("seeker"), Some(Role::Seeker));
        assert_eq!(Role::parse("provider"), Some(Role::Provider));
        assert_eq!(Role::parse(Role::Seeker.as_str()), Some(Role::Seeker));
    }

    #[test]
    fn parse_rejects_unknown_roles() {
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("Seeker"), None);
    }
}
