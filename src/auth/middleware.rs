use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

use super::{tokens, AuthContext};
use crate::app::AppState;
use crate::domain::users::Role;
use crate::error::ErrorResponse;

/// Extractor that requires authentication
/// Use this in route handlers to require a valid JWT backed by a live session
///
/// Example:
/// ```ignore
/// async fn protected_route(auth: RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}", auth.user_uuid)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken,
    SessionRevoked,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidFormat => (StatusCode::UNAUTHORIZED, "Invalid authorization format"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::SessionRevoked => (StatusCode::UNAUTHORIZED, "Session has been revoked"),
        };

        let body = ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            errors: None,
        };

        (status, Json(body)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidFormat)?;

        // Parse Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidFormat)?;

        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        // Verify token signature and expiry
        let claims = tokens::verify_token(&state.settings.jwt_secret, token).map_err(|e| {
            tracing::warn!(error = %e, "JWT verification failed");
            AuthError::InvalidToken
        })?;

        let session_id = Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidToken)?;
        let user_uuid = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        // The token is only as alive as its session row
        let row = sqlx::query(
            r#"
            SELECT u.id, u.uuid, u.email, u.role
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1 AND s.revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Session lookup failed");
            AuthError::InvalidToken
        })?
        .ok_or(AuthError::SessionRevoked)?;

        let db_uuid: Uuid = row.get("uuid");
        if db_uuid != user_uuid {
            return Err(AuthError::InvalidToken);
        }

        let role_str: String = row.get("role");
        let role = Role::parse(&role_str).ok_or(AuthError::InvalidToken)?;

        let context = AuthContext {
            user_id: row.get("id"),
            user_uuid,
            session_id,
            email: row.get("email"),
            role,
        };

        // Touch the session; failures here never block the request
        let _ = sqlx::query("UPDATE sessions SET last_seen_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&state.db)
            .await;

        Ok(RequireAuth(context))
    }
}
