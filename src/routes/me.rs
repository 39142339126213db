//! Current-user profile routes

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::users::{MeResponse, Role, UpdateProfileRequest};
use crate::error::ApiError;

/// Database row for a full user record
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub uuid: Uuid,
    pub role: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub balance: Decimal,
    pub loyalty_points: i64,
    pub is_vetted: bool,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub totp_secret: Option<String>,
    pub two_factor_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str = "id, uuid, role, name, email, phone, balance, loyalty_points, \
     is_vetted, bio, avatar_url, totp_secret, two_factor_confirmed_at, created_at";

impl UserRow {
    pub fn two_factor_enabled(&self) -> bool {
        self.totp_secret.is_some() && self.two_factor_confirmed_at.is_some()
    }

    pub fn into_me_response(self) -> MeResponse {
        let two_factor_enabled = self.two_factor_enabled();
        MeResponse {
            uuid: self.uuid,
            role: Role::parse(&self.role).unwrap_or(Role::Client),
            name: self.name,
            email: self.email,
            phone: self.phone,
            balance: self.balance,
            loyalty_points: self.loyalty_points,
            is_vetted: self.is_vetted,
            bio: self.bio,
            avatar_url: self.avatar_url,
            two_factor_enabled,
            created_at: self.created_at,
        }
    }
}

/// Fetch a user row by internal id
pub async fn fetch_user(db: &sqlx::PgPool, user_id: i64) -> Result<UserRow, ApiError> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /me
///
/// The authenticated user's own profile, wallet balance included.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = fetch_user(&state.db, auth.user_id).await?;
    Ok(Json(DataResponse::new(user.into_me_response())))
}

/// PATCH /me
///
/// Update the authenticated user's profile fields.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE($1, name),
            phone = COALESCE($2, phone),
            bio = COALESCE($3, bio),
            avatar_url = COALESCE($4, avatar_url),
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.bio)
    .bind(&req.avatar_url)
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    // Profile edits show up on the agent's public card
    if auth.is_agent() {
        let _ = state
            .cache
            .delete_pattern(&crate::services::cache::keys::agent_pattern(auth.user_uuid))
            .await;
    }

    let user = fetch_user(&state.db, auth.user_id).await?;
    Ok(Json(DataResponse::new(user.into_me_response())))
}
