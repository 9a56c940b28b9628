use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a registration.
///
/// ```text
/// WAITING --confirm--> CONFIRMED --complete--> COMPLETED
/// WAITING --cancel---> CANCELLED
/// CONFIRMED --cancel-> CANCELLED
/// ```
///
/// COMPLETED and CANCELLED are terminal. Completion is additionally gated on a
/// clinical record, which is checked by the engine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Waiting,
    Confirmed,
    Completed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Cancelled registrations no longer hold a time or a seat.
    pub fn is_active(self) -> bool {
        self != Self::Cancelled
    }

    /// Whether the lifecycle defines an edge from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (Waiting, Confirmed) | (Confirmed, Completed) | (Waiting, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
