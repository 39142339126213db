//! Authentication routes
//!
//! Registration, login (with optional TOTP step), two-factor enrollment,
//! and login-session management.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::response::{DataResponse, MessageResponse};
use crate::app::AppState;
use crate::auth::{password, tokens, totp, RequireAuth};
use crate::domain::sessions::SessionResponse;
use crate::domain::users::{
    AuthResponse, LoginRequest, RegisterRequest, Role, TwoFactorCodeRequest,
    TwoFactorEnableResponse,
};
use crate::error::ApiError;

use super::me::{UserRow, USER_COLUMNS};

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_agent: Option<String>,
    ip: Option<String>,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
}

/// Open a session and issue a token for it
async fn start_session(
    state: &AppState,
    user: &UserRow,
    user_agent: Option<&UserAgent>,
    headers: &HeaderMap,
) -> Result<String, ApiError> {
    let session_id = Uuid::new_v4();
    let user_agent: Option<String> = user_agent.map(|ua| ua.as_str().chars().take(255).collect());
    let ip = client_ip(headers);

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, user_agent, ip)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(session_id)
    .bind(user.id)
    .bind(&user_agent)
    .bind(&ip)
    .execute(&state.db)
    .await?;

    let role = Role::parse(&user.role).unwrap_or(Role::Client);
    let token = tokens::issue_token(
        &state.settings.jwt_secret,
        state.settings.jwt_ttl_seconds,
        user.uuid,
        session_id,
        role,
    )?;

    Ok(token)
}

/// POST /register
///
/// Create an account and sign the new user in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    if req.role == Role::Admin {
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }

    let password_hash = password::hash_password(&req.password)?;
    let uuid = Uuid::new_v4();
    let email = req.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        INSERT INTO users (uuid, role, name, email, phone, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(uuid)
    .bind(req.role.to_string())
    .bind(req.name.trim())
    .bind(&email)
    .bind(&req.phone)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("An account with this email already exists")
        }
        _ => ApiError::from(e),
    })?;

    tracing::info!(user_uuid = %user.uuid, role = %user.role, "User registered");

    let token = start_session(
        &state,
        &user,
        user_agent.as_ref().map(|TypedHeader(ua)| ua),
        &headers,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(AuthResponse {
            token,
            user: user.into_me_response(),
        })),
    ))
}

/// POST /login
///
/// Exchange credentials (plus a TOTP or recovery code when 2FA is on)
/// for an access token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();

    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(&email)
    .fetch_optional(&state.db)
    .await?;

    // Fetch the hash separately so UserRow stays free of credentials
    let Some(user) = row else {
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let password_hash: String =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&state.db)
            .await?;

    if !password::verify_password(&req.password, &password_hash) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if user.two_factor_enabled() {
        let Some(code) = req.code.as_deref() else {
            return Err(ApiError::unauthorized(
                "Two-factor authentication code required",
            ));
        };
        verify_second_factor(&state, &user, code).await?;
    }

    tracing::info!(user_uuid = %user.uuid, "User logged in");

    let token = start_session(
        &state,
        &user,
        user_agent.as_ref().map(|TypedHeader(ua)| ua),
        &headers,
    )
    .await?;

    Ok(Json(DataResponse::new(AuthResponse {
        token,
        user: user.into_me_response(),
    })))
}

/// Accept a current TOTP code, or consume an unused recovery code
async fn verify_second_factor(
    state: &AppState,
    user: &UserRow,
    code: &str,
) -> Result<(), ApiError> {
    let secret = user
        .totp_secret
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Two-factor authentication is not enabled"))?;

    if totp::verify_code(secret, code) {
        return Ok(());
    }

    // Recovery codes are single-use: matching removes the code
    let consumed = sqlx::query(
        r#"
        UPDATE users
        SET recovery_codes = recovery_codes - $1::text, updated_at = NOW()
        WHERE id = $2 AND recovery_codes ? $1::text
        "#,
    )
    .bind(code)
    .bind(user.id)
    .execute(&state.db)
    .await?;

    if consumed.rows_affected() == 0 {
        return Err(ApiError::unauthorized("Invalid two-factor code"));
    }

    tracing::info!(user_uuid = %user.uuid, "Recovery code consumed");
    Ok(())
}

/// POST /two-factor/enable
///
/// Provision a TOTP secret and recovery codes. The secret stays pending
/// until confirmed with a first valid code.
pub async fn enable_two_factor(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = super::me::fetch_user(&state.db, auth.user_id).await?;

    if user.two_factor_enabled() {
        return Err(ApiError::conflict("Two-factor authentication is already enabled"));
    }

    let secret = totp::generate_secret();
    let recovery_codes = totp::generate_recovery_codes();
    let otpauth_url = totp::provisioning_url(&secret, &state.settings.totp_issuer, &auth.email)?;

    sqlx::query(
        r#"
        UPDATE users
        SET totp_secret = $1,
            two_factor_confirmed_at = NULL,
            recovery_codes = $2,
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(&secret)
    .bind(serde_json::json!(recovery_codes))
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    tracing::info!(user_uuid = %auth.user_uuid, "Two-factor enrollment started");

    Ok(Json(DataResponse::new(TwoFactorEnableResponse {
        secret,
        otpauth_url,
        recovery_codes,
    })))
}

/// POST /two-factor/confirm
///
/// Confirm enrollment with a first valid code.
pub async fn confirm_two_factor(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<TwoFactorCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let user = super::me::fetch_user(&state.db, auth.user_id).await?;

    let Some(secret) = user.totp_secret.as_deref() else {
        return Err(ApiError::bad_request("Two-factor enrollment has not been started"));
    };

    if user.two_factor_confirmed_at.is_some() {
        return Err(ApiError::conflict("Two-factor authentication is already enabled"));
    }

    if !totp::verify_code(secret, &req.code) {
        return Err(ApiError::unauthorized("Invalid two-factor code"));
    }

    sqlx::query(
        "UPDATE users SET two_factor_confirmed_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    tracing::info!(user_uuid = %auth.user_uuid, "Two-factor enabled");

    Ok(Json(MessageResponse::new("Two-factor authentication enabled")))
}

/// POST /two-factor/disable
///
/// Turn off 2FA; requires a current valid code.
pub async fn disable_two_factor(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<TwoFactorCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let user = super::me::fetch_user(&state.db, auth.user_id).await?;

    if !user.two_factor_enabled() {
        return Err(ApiError::bad_request("Two-factor authentication is not enabled"));
    }

    let secret = user.totp_secret.as_deref().unwrap_or_default();
    if !totp::verify_code(secret, &req.code) {
        return Err(ApiError::unauthorized("Invalid two-factor code"));
    }

    sqlx::query(
        r#"
        UPDATE users
        SET totp_secret = NULL,
            two_factor_confirmed_at = NULL,
            recovery_codes = '[]'::jsonb,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    tracing::info!(user_uuid = %auth.user_uuid, "Two-factor disabled");

    Ok(Json(MessageResponse::new("Two-factor authentication disabled")))
}

/// GET /sessions
///
/// List the user's active sessions, most recent first.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let rows = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, user_agent, ip, created_at, last_seen_at
        FROM sessions
        WHERE user_id = $1 AND revoked_at IS NULL
        ORDER BY last_seen_at DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<SessionResponse> = rows
        .into_iter()
        .map(|r| SessionResponse {
            current: r.id == auth.session_id,
            id: r.id,
            user_agent: r.user_agent,
            ip: r.ip,
            created_at: r.created_at,
            last_seen_at: r.last_seen_at,
        })
        .collect();

    Ok(Json(DataResponse::new(data)))
}

/// DELETE /sessions/:id
///
/// Revoke one of the user's sessions. Tokens backed by it stop working
/// immediately.
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET revoked_at = NOW()
        WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL
        "#,
    )
    .bind(session_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Session not found"));
    }

    tracing::info!(user_uuid = %auth.user_uuid, session_id = %session_id, "Session revoked");

    Ok(Json(MessageResponse::new("Session revoked")))
}
