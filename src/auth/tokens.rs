//! Access token issuing and verification
//!
//! HS256 JWTs referencing a server-side session row, so revoking the
//! session invalidates the token immediately.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::Claims;
use crate::domain::users::Role;

/// Issue an access token for a user session
pub fn issue_token(
    secret: &str,
    ttl_seconds: i64,
    user_uuid: Uuid,
    session_id: Uuid,
    role: Role,
) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_uuid.to_string(),
        sid: session_id.to_string(),
        role: role.to_string(),
        iat: now,
        exp: now + ttl_seconds,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign access token")
}

/// Verify an access token and return its claims
pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Invalid or expired token")?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_round_trip() {
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();

        let token = issue_token(SECRET, 3600, user, session, Role::Client).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();

        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.sid, session.to_string());
        assert_eq!(claims.role, "client");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token =
            issue_token(SECRET, 3600, Uuid::new_v4(), Uuid::new_v4(), Role::Agent).unwrap();
        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token =
            issue_token(SECRET, -3600, Uuid::new_v4(), Uuid::new_v4(), Role::Client).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }
}
