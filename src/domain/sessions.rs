//! Login session domain types

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A login session as shown in the user's device list
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Whether this row backs the token making the request
    pub current: bool,
}
