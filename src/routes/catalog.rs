//! Service catalog routes
//!
//! Public, read-heavy endpoints backed by the Redis cache; admin writes
//! live in the admin routes and invalidate these keys.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::domain::catalog::{ServiceQuery, ServiceResponse};
use crate::error::ApiError;
use crate::services::cache::keys;

#[derive(Debug, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ServiceRow> for ServiceResponse {
    fn from(r: ServiceRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            category: r.category,
            description: r.description,
            base_price: r.base_price,
            icon: r.icon,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}

pub const SERVICE_COLUMNS: &str =
    "id, name, slug, category, description, base_price, icon, is_active, created_at";

/// GET /services
///
/// The active catalog, optionally filtered by category.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServiceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = keys::catalog(query.category.as_deref());
    if let Some(cached) = state.cache.get::<Vec<ServiceResponse>>(&cache_key).await {
        return Ok(Json(DataResponse::new(cached)));
    }

    let rows = sqlx::query_as::<_, ServiceRow>(&format!(
        r#"
        SELECT {}
        FROM services
        WHERE is_active AND ($1::text IS NULL OR category = $1)
        ORDER BY category, name
        "#,
        SERVICE_COLUMNS
    ))
    .bind(&query.category)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<ServiceResponse> = rows.into_iter().map(Into::into).collect();

    let _ = state.cache.set(&cache_key, &data).await;

    Ok(Json(DataResponse::new(data)))
}

/// GET /services/:slug
///
/// A single catalog entry by its public slug.
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = keys::service(&slug);
    if let Some(cached) = state.cache.get::<ServiceResponse>(&cache_key).await {
        return Ok(Json(DataResponse::new(cached)));
    }

    let row = sqlx::query_as::<_, ServiceRow>(&format!(
        "SELECT {} FROM services WHERE slug = $1 AND is_active",
        SERVICE_COLUMNS
    ))
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Service not found"))?;

    let data: ServiceResponse = row.into();

    let _ = state.cache.set(&cache_key, &data).await;

    Ok(Json(DataResponse::new(data)))
}
