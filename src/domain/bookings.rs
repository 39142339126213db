//! Booking domain types and the status lifecycle
//!
//! The transition table is the contract: a status change is legal only if
//! (actor, from, to) appears below. Everything else is rejected before any
//! row is touched, and the flip itself is a compare-and-swap so races
//! resolve to a single winner.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Booking status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Declined => write!(f, "declined"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which side of the booking is acting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingActor {
    Client,
    Agent,
}

/// The allowed-transitions table, keyed by actor
const TRANSITIONS: &[(BookingActor, BookingStatus, BookingStatus)] = &[
    (BookingActor::Client, BookingStatus::Pending, BookingStatus::Cancelled),
    (BookingActor::Agent, BookingStatus::Pending, BookingStatus::Accepted),
    (BookingActor::Agent, BookingStatus::Pending, BookingStatus::Declined),
    (BookingActor::Agent, BookingStatus::Accepted, BookingStatus::InProgress),
    (BookingActor::Agent, BookingStatus::InProgress, BookingStatus::Completed),
];

/// Whether `actor` may move a booking from `from` to `to`
pub fn transition_allowed(actor: BookingActor, from: BookingStatus, to: BookingStatus) -> bool {
    TRANSITIONS
        .iter()
        .any(|&(a, f, t)| a == actor && f == from && t == to)
}

/// The statuses `actor` may move a booking in `from` into
pub fn allowed_targets(actor: BookingActor, from: BookingStatus) -> Vec<BookingStatus> {
    TRANSITIONS
        .iter()
        .filter(|&&(a, f, _)| a == actor && f == from)
        .map(|&(_, _, t)| t)
        .collect()
}

/// Request to create a booking
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub agent_uuid: Uuid,

    pub service_id: Uuid,

    pub scheduled_at: DateTime<Utc>,

    #[validate(length(min = 5, max = 500, message = "address must be 5-500 characters"))]
    pub address: String,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to move a booking to a new status
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Query params for listing bookings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BookingQuery {
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

/// A party to a booking, by public identity
#[derive(Debug, Clone, Serialize)]
pub struct BookingParty {
    pub uuid: Uuid,
    pub name: String,
}

/// Response DTO for a booking
#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub status: BookingStatus,
    pub client: BookingParty,
    pub agent: BookingParty,
    pub service_id: Uuid,
    pub service_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub address: String,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingActor::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 6] = [Pending, Accepted, Declined, InProgress, Completed, Cancelled];

    #[test]
    fn test_table_is_exactly_the_five_legal_edges() {
        let mut legal = 0;
        for actor in [Client, Agent] {
            for from in ALL {
                for to in ALL {
                    if transition_allowed(actor, from, to) {
                        legal += 1;
                    }
                }
            }
        }
        assert_eq!(legal, 5);
    }

    #[test]
    fn test_client_may_only_cancel_pending() {
        assert!(transition_allowed(Client, Pending, Cancelled));

        for from in ALL {
            for to in ALL {
                if (from, to) != (Pending, Cancelled) {
                    assert!(
                        !transition_allowed(Client, from, to),
                        "client {from} -> {to} should be rejected"
                    );
                }
            }
        }
    }

    #[test]
    fn test_agent_happy_path() {
        assert!(transition_allowed(Agent, Pending, Accepted));
        assert!(transition_allowed(Agent, Accepted, InProgress));
        assert!(transition_allowed(Agent, InProgress, Completed));
    }

    #[test]
    fn test_agent_may_decline_only_while_pending() {
        assert!(transition_allowed(Agent, Pending, Declined));
        assert!(!transition_allowed(Agent, Accepted, Declined));
        assert!(!transition_allowed(Agent, InProgress, Declined));
    }

    #[test]
    fn test_terminal_states_admit_no_transitions() {
        for from in [Declined, Completed, Cancelled] {
            assert!(from.is_terminal());
            for actor in [Client, Agent] {
                for to in ALL {
                    assert!(
                        !transition_allowed(actor, from, to),
                        "{from} is terminal but {from} -> {to} was allowed"
                    );
                }
            }
        }
    }

    #[test]
    fn test_wrong_actor_is_rejected() {
        // accepting is the agent's move
        assert!(!transition_allowed(Client, Pending, Accepted));
        // cancelling a pending request is the client's move
        assert!(!transition_allowed(Agent, Pending, Cancelled));
        assert!(!transition_allowed(Client, InProgress, Completed));
    }

    #[test]
    fn test_no_self_transitions() {
        for actor in [Client, Agent] {
            for status in ALL {
                assert!(!transition_allowed(actor, status, status));
            }
        }
    }

    #[test]
    fn test_allowed_targets() {
        let mut targets = allowed_targets(Agent, Pending);
        targets.sort_by_key(|s| s.to_string());
        assert_eq!(targets, vec![Accepted, Declined]);

        assert_eq!(allowed_targets(Client, Pending), vec![Cancelled]);
        assert!(allowed_targets(Client, Completed).is_empty());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in ALL {
            assert_eq!(BookingStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(BookingStatus::parse("PENDING"), None);
        assert_eq!(BookingStatus::parse(""), None);
    }
}
