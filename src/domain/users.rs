//! User domain types
//!
//! Users carry an internal bigserial id and a public UUID assigned at
//! construction; only the UUID ever appears on the wire.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Agent,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Role::Client),
            "agent" => Some(Role::Agent),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Agent => write!(f, "agent"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: String,

    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,

    /// "client" or "agent"; admin accounts are never self-service
    pub role: Role,
}

/// Login request. `code` is required when two-factor auth is enabled:
/// either a current TOTP code or an unused recovery code.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,

    #[serde(default)]
    pub code: Option<String>,
}

/// Profile update request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 120, message = "name must be 2-120 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub bio: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The authenticated user's own profile
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub uuid: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub balance: Decimal,
    pub loyalty_points: i64,
    pub is_vetted: bool,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Auth response: token plus the profile it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: MeResponse,
}

/// Public agent card for search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub uuid: Uuid,
    pub name: String,
    pub is_vetted: bool,
    pub avatar_url: Option<String>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Public agent profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub uuid: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_vetted: bool,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub completed_bookings: i64,
    pub services: Vec<crate::domain::catalog::ServiceSummary>,
    pub joined_at: DateTime<Utc>,
}

/// Two-factor enrollment payload; the secret and recovery codes are shown once
#[derive(Debug, Clone, Serialize)]
pub struct TwoFactorEnableResponse {
    pub secret: String,
    pub otpauth_url: String,
    pub recovery_codes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TwoFactorCodeRequest {
    #[validate(length(min = 6, message = "code is required"))]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Client, Role::Agent, Role::Admin] {
            assert_eq!(Role::parse(&role.to_string()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            name: "A".to_string(),
            email: "not-an-email".to_string(),
            phone: None,
            password: "short".to_string(),
            role: Role::Client,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
