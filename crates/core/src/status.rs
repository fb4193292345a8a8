//! Status enums mapping to SMALLINT columns, plus the legal request
//! transition graph.
//!
//! Each enum variant's discriminant matches the seed order (1-based) used
//! by the migrations. Status transitions are monotonic along the graph:
//! no transition may be applied twice or out of order, and terminal
//! states accept no further mutation.

use crate::types::StatusId;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Parse a database status ID back into the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Service request lifecycle status.
    RequestStatus {
        Pending = 1,
        InProgress = 2,
        Completed = 3,
        Cancelled = 4,
        Expired = 5,
    }
}

define_status_enum! {
    /// Provider availability status.
    ProviderStatus {
        Offline = 1,
        /// Available for matching.
        Online = 2,
        /// Transient, mid-accept.
        Active = 3,
        /// Has exactly one assigned open request.
        InProgress = 4,
    }
}

impl RequestStatus {
    /// Whether the status is terminal (`completed`, `cancelled`, `expired`).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::Expired
        )
    }

    /// Whether a transition from `self` to `next` is on the legal graph.
    ///
    /// ```text
    /// pending ──► in_progress ──► completed
    ///    │                │
    ///    ├──► cancelled   └──► expired
    ///    └──► expired
    /// ```
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match (self, next) {
            (Pending, InProgress) | (Pending, Cancelled) => true,
            (InProgress, Completed) => true,
            // Any non-terminal state may expire once past the validity window.
            (from, Expired) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Wire representation used in API responses and events.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Expired => "expired",
        }
    }
}

impl ProviderStatus {
    /// Wire representation used in API responses and events.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderStatus::Offline => "offline",
            ProviderStatus::Online => "online",
            ProviderStatus::Active => "active",
            ProviderStatus::InProgress => "in_progress",
        }
    }

    /// Parse a wire status name. Only `offline` and `online` are valid as
    /// manual overrides; `active` and `in_progress` are engine-managed.
    pub fn parse_manual(s: &str) -> Option<Self> {
        match s {
            "offline" => Some(ProviderStatus::Offline),
            "online" => Some(ProviderStatus::Online),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::InProgress));
        assert!(RequestStatus::InProgress.can_transition_to(RequestStatus::Completed));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Cancelled));
    }

    #[test]
    fn non_terminal_states_can_expire() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Expired));
        assert!(RequestStatus::InProgress.can_transition_to(RequestStatus::Expired));
    }

    #[test]
    fn terminal_states_accept_no_transition() {
        for terminal in [
            RequestStatus::Completed,
            RequestStatus::Cancelled,
            RequestStatus::Expired,
        ] {
            for next in [
                RequestStatus::Pending,
                RequestStatus::InProgress,
                RequestStatus::Completed,
                RequestStatus::Cancelled,
                RequestStatus::Expired,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal:?} -> {next:?} must be illegal"
                );
            }
        }
    }

    #[test]
    fn backward_transitions_are_illegal() {
        assert!(!RequestStatus::InProgress.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Completed));
    }

    #[test]
    fn status_ids_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::InProgress,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
            RequestStatus::Expired,
        ] {
            assert_eq!(RequestStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(RequestStatus::from_id(99), None);

        for status in [
            ProviderStatus::Offline,
            ProviderStatus::Online,
            ProviderStatus::Active,
            ProviderStatus::InProgress,
        ] {
            assert_eq!(ProviderStatus::from_id(status.id()), Some(status));
        }
    }

    #[test]
    fn manual_override_parsing_is_restricted() {
        assert_eq!(
            ProviderStatus::parse_manual("online"),
            Some(ProviderStatus::Online)
        );
        assert_eq!(
            ProviderStatus::parse_manual("offline"),
            Some(ProviderStatus::Offline)
        );
        assert_eq!(ProviderStatus::parse_manual("in_progress"), None);
        assert_eq!(ProviderStatus::parse_manual("active"), None);
    }
}
