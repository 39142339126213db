//! Admin routes
//!
//! Catalog management, agent vetting, and the report moderation queue.
//! Every handler here requires the admin role.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::pagination::PaginationParams;
use crate::api::response::{DataResponse, MessageResponse};
use crate::api::Paginated;
use crate::app::AppState;
use crate::auth::{AuthContext, RequireAuth};
use crate::domain::catalog::{slugify, CreateServiceRequest, ServiceResponse, UpdateServiceRequest};
use crate::domain::reports::{ReportQuery, ReportResponse, UpdateReportRequest};
use crate::error::ApiError;
use crate::services::{cache::keys, notifications};

use super::catalog::{ServiceRow, SERVICE_COLUMNS};
use super::reports::{ReportRow, REPORT_COLUMNS};

fn require_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if !auth.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(())
}

async fn invalidate_catalog(state: &AppState) {
    let _ = state.cache.delete_pattern(&keys::catalog_pattern()).await;
    let _ = state.cache.delete_pattern(&keys::service_pattern()).await;
}

/// POST /admin/services
///
/// Create a catalog entry. The slug derives from the name.
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    req.validate()?;

    let base_price = Decimal::from_f64(req.base_price)
        .ok_or_else(|| ApiError::bad_request("Invalid base_price"))?
        .round_dp(2);

    let slug = slugify(&req.name);
    if slug.is_empty() {
        return Err(ApiError::bad_request("Service name must contain letters or digits"));
    }

    let row = sqlx::query_as::<_, ServiceRow>(&format!(
        r#"
        INSERT INTO services (id, name, slug, category, description, base_price, icon)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        SERVICE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&slug)
    .bind(req.category.trim())
    .bind(&req.description)
    .bind(base_price)
    .bind(&req.icon)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("A service with this name already exists")
        }
        _ => ApiError::from(e),
    })?;

    invalidate_catalog(&state).await;

    tracing::info!(service_slug = %slug, admin_uuid = %auth.user_uuid, "Service created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ServiceResponse::from(row))),
    ))
}

/// PATCH /admin/services/:id
///
/// Update a catalog entry. The slug never changes after creation.
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(service_id): Path<Uuid>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;
    req.validate()?;

    let base_price = match req.base_price {
        Some(p) => Some(
            Decimal::from_f64(p)
                .ok_or_else(|| ApiError::bad_request("Invalid base_price"))?
                .round_dp(2),
        ),
        None => None,
    };

    let row = sqlx::query_as::<_, ServiceRow>(&format!(
        r#"
        UPDATE services
        SET name = COALESCE($1, name),
            category = COALESCE($2, category),
            description = COALESCE($3, description),
            base_price = COALESCE($4, base_price),
            icon = COALESCE($5, icon),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $7
        RETURNING {}
        "#,
        SERVICE_COLUMNS
    ))
    .bind(&req.name)
    .bind(&req.category)
    .bind(&req.description)
    .bind(base_price)
    .bind(&req.icon)
    .bind(req.is_active)
    .bind(service_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Service not found"))?;

    invalidate_catalog(&state).await;

    tracing::info!(service_id = %service_id, admin_uuid = %auth.user_uuid, "Service updated");

    Ok(Json(DataResponse::new(ServiceResponse::from(row))))
}

#[derive(Debug, Deserialize)]
pub struct VettingRequest {
    pub is_vetted: bool,
}

/// PATCH /admin/agents/:uuid/vetting
///
/// Grant or revoke an agent's vetted badge.
pub async fn set_agent_vetting(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(agent_uuid): Path<Uuid>,
    Json(req): Json<VettingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;

    let agent_id: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET is_vetted = $1, updated_at = NOW()
        WHERE uuid = $2 AND role = 'agent'
        RETURNING id
        "#,
    )
    .bind(req.is_vetted)
    .bind(agent_uuid)
    .fetch_optional(&state.db)
    .await?;

    let Some(agent_id) = agent_id else {
        return Err(ApiError::not_found("Agent not found"));
    };

    let _ = state
        .cache
        .delete_pattern(&keys::agent_pattern(agent_uuid))
        .await;

    if req.is_vetted {
        if let Err(e) = notifications::notify_agent_vetted(&state.db, agent_id).await {
            tracing::warn!(error = %e, "Failed to notify agent of vetting");
        }
    }

    tracing::info!(
        agent_uuid = %agent_uuid,
        is_vetted = req.is_vetted,
        admin_uuid = %auth.user_uuid,
        "Agent vetting changed"
    );

    Ok(Json(MessageResponse::new("Vetting status updated")))
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    #[serde(flatten)]
    pub filter: ReportQuery,
}

/// GET /admin/reports
///
/// The moderation queue, oldest open reports first.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<ReportQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;

    let status = query.filter.status.map(|s| s.to_string());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reports WHERE ($1::text IS NULL OR status = $1)",
    )
    .bind(&status)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        SELECT {}
        FROM reports
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at ASC
        LIMIT $2 OFFSET $3
        "#,
        REPORT_COLUMNS
    ))
    .bind(&status)
    .bind(query.pagination.limit() as i64)
    .bind(query.pagination.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<ReportResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(Paginated::new(data, &query.pagination, total as u64)))
}

/// PATCH /admin/reports/:id
///
/// Move a report through the moderation workflow.
pub async fn update_report(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(report_id): Path<Uuid>,
    Json(req): Json<UpdateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&auth)?;

    let row = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        UPDATE reports
        SET status = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING {}
        "#,
        REPORT_COLUMNS
    ))
    .bind(req.status.to_string())
    .bind(report_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Report not found"))?;

    tracing::info!(
        report_id = %report_id,
        status = %req.status,
        admin_uuid = %auth.user_uuid,
        "Report status changed"
    );

    Ok(Json(DataResponse::new(ReportResponse::from(row))))
}
