use uuid::Uuid;

use crate::domain::users::Role;

/// Authenticated user context resolved from a verified token and its
/// live session row. Request-scoped; handlers receive it via `RequireAuth`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Internal user id (never exposed on the wire)
    pub user_id: i64,

    /// Public user identifier
    pub user_uuid: Uuid,

    /// Session backing the current token
    pub session_id: Uuid,

    pub email: String,

    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}
