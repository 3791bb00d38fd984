//! JWT claims carried by session and password reset tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which verification flow may accept a token
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    #[serde(rename = "session")]
    Session,
    #[serde(rename = "pwd_reset")]
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Session => "session",
            TokenPurpose::PasswordReset => "pwd_reset",
        }
    }
}

/// JWT Claims for both token kinds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Purpose tag
    pub typ: TokenPurpose,
    /// Password fingerprint at issuance, reset tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prv: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Build claims valid from `issued_at` for `ttl_seconds`
    pub fn new(
        user_id: Uuid,
        purpose: TokenPurpose,
        fingerprint: Option<String>,
        issued_at: i64,
        ttl_seconds: i64,
        issuer: String,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            typ: purpose,
            prv: fingerprint,
            iat: issued_at,
            exp: issued_at + ttl_seconds,
            iss: issuer,
        }
    }

    /// Subject as a UUID; `None` when the claim is not a valid UUID
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// A token is usable up to and including its expiry second
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}
