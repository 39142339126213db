use serde::{Deserialize, Serialize};

/// JWT claims carried by Forafix access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's public UUID
    pub sub: String,

    /// Session ID backing this token
    pub sid: String,

    /// User role at issue time
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}
