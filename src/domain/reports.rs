//! Misconduct report domain types
//!
//! Agent identity is captured by value so users can report agents they
//! met off-platform; `agent_uuid` is attached when known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Report moderation status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    InReview,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_review" => Some(Self::InReview),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::InReview => write!(f, "in_review"),
            Self::Resolved => write!(f, "resolved"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

/// Request to file a report
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(length(min = 2, max = 120, message = "agent_name must be 2-120 characters"))]
    pub agent_name: String,

    #[serde(default)]
    pub agent_uuid: Option<Uuid>,

    #[serde(default)]
    pub category: Option<String>,

    #[validate(length(min = 10, max = 5000, message = "description must be 10-5000 characters"))]
    pub description: String,
}

/// Admin request to move a report through moderation
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReportRequest {
    pub status: ReportStatus,
}

/// Query params for the moderation queue
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReportQuery {
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

/// Response DTO for a report
#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub agent_name: String,
    pub agent_uuid: Option<Uuid>,
    pub category: String,
    pub description: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
