//! Signed token codec
//!
//! Creates and verifies HS256 JWTs bound to a single [`TokenPurpose`]. Session
//! and reset tokens get separate codecs (and may get separate secrets); each
//! codec rejects tokens minted for the other purpose.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenPurpose};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature and structure are fine but `now > exp`
    Expired,
    /// Bad signature, malformed structure, wrong issuer or purpose, corrupted claims
    Invalid,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::TokenInvalid,
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Auth(err.into())
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    purpose: TokenPurpose,
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str, issuer: &str, purpose: TokenPurpose) -> Self {
        Self {
            purpose,
            issuer: issuer.to_string(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Codec for bearer session tokens
    pub fn session(settings: &AuthSettings) -> Self {
        Self::new(&settings.session_secret, &settings.issuer, TokenPurpose::Session)
    }

    /// Codec for password reset tokens
    pub fn password_reset(settings: &AuthSettings) -> Self {
        Self::new(settings.reset_secret(), &settings.issuer, TokenPurpose::PasswordReset)
    }

    /// Sign a token for `user_id`, valid for `ttl` from now
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn sign(
        &self,
        user_id: Uuid,
        fingerprint: Option<String>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        self.sign_at(user_id, fingerprint, ttl, Utc::now().timestamp())
    }

    pub fn sign_at(
        &self,
        user_id: Uuid,
        fingerprint: Option<String>,
        ttl: Duration,
        issued_at: i64,
    ) -> Result<String, AppError> {
        let claims = Claims::new(
            user_id,
            self.purpose,
            fingerprint,
            issued_at,
            ttl.num_seconds(),
            self.issuer.clone(),
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as of `now` (Unix seconds).
    ///
    /// Expiry is judged from the embedded `exp` claim with zero leeway.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // exp is compared below against the caller's clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => tracing::debug!("Token signature mismatch"),
                    _ => tracing::debug!(error = %e, "Token rejected"),
                }
                TokenError::Invalid
            })?;

        if claims.typ != self.purpose {
            tracing::warn!(
                expected = self.purpose.as_str(),
                presented = claims.typ.as_str(),
                "Token presented for the wrong purpose"
            );
            return Err(TokenError::Invalid);
        }

        if claims.user_id().is_none() {
            return Err(TokenError::Invalid);
        }

        if self.purpose == TokenPurpose::PasswordReset
            && claims.prv.as_deref().map_or(true, str::is_empty)
        {
            return Err(TokenError::Invalid);
        }

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn session_codec() -> TokenCodec {
        TokenCodec::new(SECRET, "test", TokenPurpose::Session)
    }

    fn reset_codec() -> TokenCodec {
        TokenCodec::new(SECRET, "test", TokenPurpose::PasswordReset)
    }

    #[test]
    fn test_sign_and_verify_session_token() {
        let codec = session_codec();
        let user_id = Uuid::new_v4();

        let token = codec.sign(user_id, None, Duration::hours(1)).expect("Failed to sign token");
        let claims = codec.verify(&token).expect("Failed to verify token");

        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.typ, TokenPurpose::Session);
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_garbage_token() {
        assert_eq!(session_codec().verify("invalid.token.here").unwrap_err(), TokenError::Invalid);
        assert_eq!(session_codec().verify("").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_flipping_any_byte_invalidates_token() {
        let codec = session_codec();
        let token = codec
            .sign(Uuid::new_v4(), None, Duration::hours(1))
            .expect("Failed to sign token");
        let bytes = token.as_bytes();

        for i in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] = if tampered[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(tampered).unwrap();

            assert_eq!(
                codec.verify(&tampered).unwrap_err(),
                TokenError::Invalid,
                "byte {} flipped but token still accepted",
                i
            );
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = session_codec();
        let issued_at = 1_700_000_000;
        let ttl = Duration::minutes(30);
        let token = codec
            .sign_at(Uuid::new_v4(), None, ttl, issued_at)
            .expect("Failed to sign token");
        let expires_at = issued_at + ttl.num_seconds();

        assert!(codec.verify_at(&token, expires_at - 1).is_ok());
        assert!(codec.verify_at(&token, expires_at).is_ok());
        assert_eq!(codec.verify_at(&token, expires_at + 1).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_wrong_secret() {
        let token = session_codec()
            .sign(Uuid::new_v4(), None, Duration::hours(1))
            .expect("Failed to sign token");
        let other = TokenCodec::new("another-secret", "test", TokenPurpose::Session);

        assert_eq!(other.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_wrong_issuer() {
        let token = session_codec()
            .sign(Uuid::new_v4(), None, Duration::hours(1))
            .expect("Failed to sign token");
        let other = TokenCodec::new(SECRET, "wrong-issuer", TokenPurpose::Session);

        assert_eq!(other.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_purpose_isolation_with_shared_secret() {
        let user_id = Uuid::new_v4();
        let session = session_codec()
            .sign(user_id, None, Duration::hours(1))
            .expect("Failed to sign token");
        let reset = reset_codec()
            .sign(user_id, Some("fingerprint".to_string()), Duration::minutes(30))
            .expect("Failed to sign token");

        assert_eq!(reset_codec().verify(&session).unwrap_err(), TokenError::Invalid);
        assert_eq!(session_codec().verify(&reset).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_reset_token_requires_fingerprint() {
        let token = reset_codec()
            .sign(Uuid::new_v4(), None, Duration::minutes(30))
            .expect("Failed to sign token");

        assert_eq!(reset_codec().verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn test_expired_but_tampered_is_invalid() {
        let codec = session_codec();
        let token = codec
            .sign_at(Uuid::new_v4(), None, Duration::minutes(1), 0)
            .expect("Failed to sign token");

        assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Expired);
        assert_eq!(codec.verify(&format!("{}X", token)).unwrap_err(), TokenError::Invalid);
    }
}
