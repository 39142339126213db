//! Notification routes
//!
//! Endpoints for the in-app notification log: list, unread count, mark
//! read, bulk delete. Rows are addressed by their public UUID only.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::PaginationParams;
use crate::api::response::DataResponse;
use crate::api::Paginated;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::notifications::{NotificationQuery, NotificationResponse, UnreadCountResponse};
use crate::error::ApiError;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    uuid: Uuid,
    kind: String,
    title: String,
    message: Option<String>,
    data: serde_json::Value,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for NotificationResponse {
    fn from(r: NotificationRow) -> Self {
        Self {
            uuid: r.uuid,
            kind: r.kind,
            title: r.title,
            message: r.message,
            data: r.data,
            read_at: r.read_at,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct NotificationQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    #[serde(flatten)]
    pub filter: NotificationQuery,
}

/// GET /users/notifications
///
/// List notifications for the current user with pagination and an
/// unread-only filter.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<NotificationQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let unread_only = query.filter.unread_only.unwrap_or(false);

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM notifications
        WHERE user_id = $1
        AND ($2::bool = false OR read_at IS NULL)
        "#,
    )
    .bind(auth.user_id)
    .bind(unread_only)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT uuid, kind, title, message, data, read_at, created_at
        FROM notifications
        WHERE user_id = $1
        AND ($2::bool = false OR read_at IS NULL)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(auth.user_id)
    .bind(unread_only)
    .bind(query.pagination.limit() as i64)
    .bind(query.pagination.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<NotificationResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(Paginated::new(data, &query.pagination, total as u64)))
}

/// GET /users/notifications/unread-count
///
/// Count of unread notifications for the current user.
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
    )
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(UnreadCountResponse { count }))
}

/// POST /users/notifications/:uuid/read
///
/// Mark a single notification as read. Reading an already-read
/// notification is a no-op success.
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(notification_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET read_at = NOW()
        WHERE uuid = $1 AND user_id = $2 AND read_at IS NULL
        "#,
    )
    .bind(notification_uuid)
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE uuid = $1 AND user_id = $2)",
        )
        .bind(notification_uuid)
        .bind(auth.user_id)
        .fetch_one(&state.db)
        .await?;

        if !exists {
            return Err(ApiError::not_found("Notification not found"));
        }
        // Already read, that's fine
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /users/notifications/read-all
///
/// Mark every unread notification as read.
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL",
    )
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "marked_count": result.rows_affected()
    })))
}

/// DELETE /users/notifications
///
/// Delete all read notifications for the current user.
pub async fn delete_all_read(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result =
        sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND read_at IS NOT NULL")
            .bind(auth.user_id)
            .execute(&state.db)
            .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "deleted_count": result.rows_affected()
    })))
}
