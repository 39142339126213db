//! Agent directory routes
//!
//! Public agent search and profiles, plus the endpoint agents use to
//! manage which catalog services they offer.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::{Paginated, PaginationParams};
use crate::api::response::{DataResponse, MessageResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::catalog::ServiceSummary;
use crate::domain::reviews::ReviewResponse;
use crate::domain::users::{AgentProfile, AgentSummary};
use crate::error::ApiError;
use crate::services::cache::keys;

#[derive(Debug, sqlx::FromRow)]
struct AgentSummaryRow {
    uuid: Uuid,
    name: String,
    is_vetted: bool,
    avatar_url: Option<String>,
    average_rating: Option<f64>,
    review_count: i64,
}

impl From<AgentSummaryRow> for AgentSummary {
    fn from(r: AgentSummaryRow) -> Self {
        Self {
            uuid: r.uuid,
            name: r.name,
            is_vetted: r.is_vetted,
            avatar_url: r.avatar_url,
            average_rating: r.average_rating,
            review_count: r.review_count,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AgentQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,

    /// Filter to agents offering this service slug
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub vetted: Option<bool>,

    /// Case-insensitive name search
    #[serde(default)]
    pub search: Option<String>,
}

/// GET /agents
///
/// Search the agent directory.
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let offset = query.pagination.offset() as i64;
    let limit = query.pagination.limit() as i64;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM users u
        WHERE u.role = 'agent'
        AND ($1::bool IS NULL OR u.is_vetted = $1)
        AND ($2::text IS NULL OR u.name ILIKE '%' || $2 || '%')
        AND ($3::text IS NULL OR EXISTS (
            SELECT 1 FROM agent_services ag
            JOIN services s ON s.id = ag.service_id
            WHERE ag.agent_id = u.id AND s.slug = $3
        ))
        "#,
    )
    .bind(query.vetted)
    .bind(&query.search)
    .bind(&query.service)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, AgentSummaryRow>(
        r#"
        SELECT u.uuid, u.name, u.is_vetted, u.avatar_url,
               AVG(r.rating)::float8 AS average_rating,
               COUNT(r.id) AS review_count
        FROM users u
        LEFT JOIN reviews r ON r.agent_id = u.id
        WHERE u.role = 'agent'
        AND ($1::bool IS NULL OR u.is_vetted = $1)
        AND ($2::text IS NULL OR u.name ILIKE '%' || $2 || '%')
        AND ($3::text IS NULL OR EXISTS (
            SELECT 1 FROM agent_services ag
            JOIN services s ON s.id = ag.service_id
            WHERE ag.agent_id = u.id AND s.slug = $3
        ))
        GROUP BY u.id
        ORDER BY u.is_vetted DESC, average_rating DESC NULLS LAST, u.created_at ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(query.vetted)
    .bind(&query.search)
    .bind(&query.service)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<AgentSummary> = rows.into_iter().map(Into::into).collect();
    Ok(Json(Paginated::new(data, &query.pagination, total as u64)))
}

#[derive(Debug, sqlx::FromRow)]
struct AgentProfileRow {
    id: i64,
    uuid: Uuid,
    name: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    is_vetted: bool,
    created_at: DateTime<Utc>,
    average_rating: Option<f64>,
    review_count: i64,
    completed_bookings: i64,
}

/// GET /agents/:uuid
///
/// Public agent profile with rating aggregate and offered services.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = keys::agent_profile(agent_uuid);
    if let Some(cached) = state.cache.get::<AgentProfile>(&cache_key).await {
        return Ok(Json(DataResponse::new(cached)));
    }

    let row = sqlx::query_as::<_, AgentProfileRow>(
        r#"
        SELECT u.id, u.uuid, u.name, u.bio, u.avatar_url, u.is_vetted, u.created_at,
               (SELECT AVG(r.rating)::float8 FROM reviews r WHERE r.agent_id = u.id) AS average_rating,
               (SELECT COUNT(*) FROM reviews r WHERE r.agent_id = u.id) AS review_count,
               (SELECT COUNT(*) FROM bookings b WHERE b.agent_id = u.id AND b.status = 'completed') AS completed_bookings
        FROM users u
        WHERE u.uuid = $1 AND u.role = 'agent'
        "#,
    )
    .bind(agent_uuid)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Agent not found"))?;

    let services = sqlx::query_as::<_, ServiceSummaryRow>(
        r#"
        SELECT s.id, s.name, s.slug, s.category, s.base_price
        FROM services s
        JOIN agent_services ag ON ag.service_id = s.id
        WHERE ag.agent_id = $1 AND s.is_active
        ORDER BY s.name
        "#,
    )
    .bind(row.id)
    .fetch_all(&state.db)
    .await?;

    let profile = AgentProfile {
        uuid: row.uuid,
        name: row.name,
        bio: row.bio,
        avatar_url: row.avatar_url,
        is_vetted: row.is_vetted,
        average_rating: row.average_rating,
        review_count: row.review_count,
        completed_bookings: row.completed_bookings,
        services: services.into_iter().map(Into::into).collect(),
        joined_at: row.created_at,
    };

    let _ = state.cache.set(&cache_key, &profile).await;

    Ok(Json(DataResponse::new(profile)))
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceSummaryRow {
    id: Uuid,
    name: String,
    slug: String,
    category: String,
    base_price: rust_decimal::Decimal,
}

impl From<ServiceSummaryRow> for ServiceSummary {
    fn from(r: ServiceSummaryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            category: r.category,
            base_price: r.base_price,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    booking_id: Uuid,
    rating: i16,
    comment: Option<String>,
    client_uuid: Uuid,
    client_name: String,
    created_at: DateTime<Utc>,
}

/// GET /agents/:uuid/reviews
///
/// Paginated reviews for an agent, newest first.
pub async fn list_agent_reviews(
    State(state): State<Arc<AppState>>,
    Path(agent_uuid): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let agent_id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE uuid = $1 AND role = 'agent'")
            .bind(agent_uuid)
            .fetch_optional(&state.db)
            .await?;

    let Some(agent_id) = agent_id else {
        return Err(ApiError::not_found("Agent not found"));
    };

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE agent_id = $1")
        .bind(agent_id)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, ReviewRow>(
        r#"
        SELECT r.id, r.booking_id, r.rating, r.comment,
               c.uuid AS client_uuid, c.name AS client_name, r.created_at
        FROM reviews r
        JOIN users c ON c.id = r.client_id
        WHERE r.agent_id = $1
        ORDER BY r.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(agent_id)
    .bind(pagination.limit() as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<ReviewResponse> = rows
        .into_iter()
        .map(|r| ReviewResponse {
            id: r.id,
            booking_id: r.booking_id,
            rating: r.rating,
            comment: r.comment,
            client_uuid: r.client_uuid,
            client_name: r.client_name,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(Paginated::new(data, &pagination, total as u64)))
}

#[derive(Debug, Deserialize)]
pub struct SetServicesRequest {
    pub service_ids: Vec<Uuid>,
}

/// PUT /agents/me/services
///
/// Replace the set of catalog services the authenticated agent offers.
pub async fn set_my_services(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<SetServicesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !auth.is_agent() {
        return Err(ApiError::forbidden("Only agents can offer services"));
    }

    if req.service_ids.len() > 50 {
        return Err(ApiError::bad_request("Too many services"));
    }

    // Every id must be an active catalog entry
    let known: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM services WHERE id = ANY($1) AND is_active",
    )
    .bind(&req.service_ids)
    .fetch_one(&state.db)
    .await?;

    if known as usize != req.service_ids.len() {
        return Err(ApiError::bad_request("Unknown or inactive service in list"));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM agent_services WHERE agent_id = $1")
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await?;

    for service_id in &req.service_ids {
        sqlx::query("INSERT INTO agent_services (agent_id, service_id) VALUES ($1, $2)")
            .bind(auth.user_id)
            .bind(service_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let _ = state
        .cache
        .delete_pattern(&keys::agent_pattern(auth.user_uuid))
        .await;

    tracing::info!(
        agent_uuid = %auth.user_uuid,
        count = req.service_ids.len(),
        "Agent services updated"
    );

    Ok(Json(MessageResponse::new("Services updated")))
}
