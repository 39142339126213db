//! Report routes
//!
//! Misconduct reports against agents. Agent identity is captured by
//! value so off-platform agents can be reported too.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::reports::{CreateReportRequest, ReportResponse, ReportStatus};
use crate::error::ApiError;

#[derive(Debug, sqlx::FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub agent_name: String,
    pub agent_uuid: Option<Uuid>,
    pub category: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReportRow> for ReportResponse {
    fn from(r: ReportRow) -> Self {
        Self {
            id: r.id,
            agent_name: r.agent_name,
            agent_uuid: r.agent_uuid,
            category: r.category,
            description: r.description,
            status: ReportStatus::parse(&r.status).unwrap_or(ReportStatus::Open),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub const REPORT_COLUMNS: &str =
    "id, agent_name, agent_uuid, category, description, status, created_at, updated_at";

/// POST /reports
///
/// File a misconduct report. When an agent UUID is supplied it must
/// resolve to a real agent; the name is kept by value regardless.
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    if let Some(agent_uuid) = req.agent_uuid {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE uuid = $1 AND role = 'agent')",
        )
        .bind(agent_uuid)
        .fetch_one(&state.db)
        .await?;

        if !exists {
            return Err(ApiError::bad_request("Unknown agent UUID"));
        }
    }

    let category = req
        .category
        .as_deref()
        .unwrap_or("other")
        .trim()
        .to_lowercase();

    let row = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        INSERT INTO reports (id, reporter_id, agent_name, agent_uuid, category, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        REPORT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(req.agent_name.trim())
    .bind(req.agent_uuid)
    .bind(&category)
    .bind(req.description.trim())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        report_id = %row.id,
        reporter_uuid = %auth.user_uuid,
        category = %category,
        "Report filed"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ReportResponse::from(row))),
    ))
}
