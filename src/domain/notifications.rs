//! Notification domain types
//!
//! In-app notification log. Rows carry an internal bigserial id plus a
//! public UUID; the UUID is the only identifier on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    // Booking lifecycle
    BookingRequested,
    BookingAccepted,
    BookingDeclined,
    BookingStarted,
    BookingCompleted,
    BookingCancelled,

    // Reviews
    ReviewReceived,

    // Wallet
    WalletFunded,
    EscrowReleased,

    // Vetting
    AgentVetted,

    // System
    System,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

impl From<String> for NotificationKind {
    fn from(s: String) -> Self {
        serde_json::from_str(&format!("\"{}\"", s)).unwrap_or(NotificationKind::System)
    }
}

/// Query params for listing notifications
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: Option<bool>,
}

/// Response DTO for a notification
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    pub uuid: Uuid,
    pub kind: String,
    pub title: String,
    pub message: Option<String>,
    pub data: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Unread count response
#[derive(Debug, Clone, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_string_round_trip() {
        assert_eq!(NotificationKind::BookingAccepted.to_string(), "booking_accepted");
        assert_eq!(
            NotificationKind::from("booking_accepted".to_string()),
            NotificationKind::BookingAccepted
        );
    }

    #[test]
    fn test_unknown_kind_falls_back_to_system() {
        assert_eq!(
            NotificationKind::from("carrier_pigeon".to_string()),
            NotificationKind::System
        );
    }
}
