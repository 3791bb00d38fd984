//! Password reset flow
//!
//! Three independently triggered steps share nothing but the signed token:
//! 1. `forgot_password` mails a reset link (silently does nothing for unknown emails)
//! 2. `verify_reset_token` is a user-facing pre-check
//! 3. `change_password` re-runs every check and swaps the password hash
//!
//! A reset token embeds a fingerprint of the password hash it was issued
//! against. Changing the password changes the fingerprint, so every token
//! issued before the change (including the one just used) stops verifying.
//! No reset state is stored server-side.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::jwt::TokenCodec;
use crate::auth::password::{password_fingerprint, PasswordHasher};
use crate::configuration::Settings;
use crate::email_client::Mailer;
use crate::email_template;
use crate::error::{AppError, AuthError};
use crate::users::{User, UserRepository};
use crate::validators::{is_valid_email, validate_password};

const RESET_EMAIL_SUBJECT: &str = "Password reset";

pub struct PasswordResetService {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    ttl_minutes: i64,
    frontend_url: String,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        codec: TokenCodec,
        hasher: PasswordHasher,
        ttl_minutes: i64,
        frontend_url: String,
    ) -> Self {
        Self {
            users,
            mailer,
            codec,
            hasher,
            ttl_minutes,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        settings: &Settings,
    ) -> Self {
        Self::new(
            users,
            mailer,
            TokenCodec::password_reset(&settings.auth),
            PasswordHasher::new(settings.auth.password_hash_cost),
            settings.auth.reset_token_ttl_minutes,
            settings.application.frontend_url.clone(),
        )
    }

    /// Reset token lifetime
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }

    /// Step 1: mail a reset link if the email belongs to a user.
    ///
    /// Succeeds identically whether or not the address is registered.
    ///
    /// # Errors
    /// - Validation error for a malformed email
    /// - Email error if the mail transport fails
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = is_valid_email(email)?;

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Password reset requested for unknown address");
                return Ok(());
            }
        };

        let fingerprint = password_fingerprint(&user.password_hash);
        let token = self.codec.sign(user.id, Some(fingerprint), self.ttl())?;
        // JWT segments are base64url, already safe inside a query string
        let reset_link = format!("{}/reset-password?token={}", self.frontend_url, token);
        let (html, text) =
            email_template::render_password_reset(&user.first_name, &reset_link, self.ttl_minutes)?;

        self.mailer
            .send(&user.email, RESET_EMAIL_SUBJECT, &html, &text)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset email sent");
        Ok(())
    }

    /// Step 2: check a reset token against the user's current state
    pub async fn verify_reset_token(&self, token: &str) -> Result<User, AppError> {
        self.verify_reset_token_at(token, Utc::now().timestamp()).await
    }

    pub async fn verify_reset_token_at(&self, token: &str, now: i64) -> Result<User, AppError> {
        self.authorize(token, now).await
    }

    /// Step 3: set a new password. Nothing from step 2 is trusted.
    ///
    /// # Errors
    /// - Validation error if the new password breaks the policy
    /// - `TokenExpired` / `TokenInvalid` if the token no longer verifies
    /// - `SamePassword` if the new password equals the current one
    pub async fn change_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        self.change_password_at(token, new_password, Utc::now().timestamp())
            .await
    }

    pub async fn change_password_at(
        &self,
        token: &str,
        new_password: &str,
        now: i64,
    ) -> Result<(), AppError> {
        validate_password("newPassword", new_password)?;

        let user = self.authorize(token, now).await?;

        let unchanged = self
            .hasher
            .verify_blocking(new_password.to_string(), user.password_hash.clone())
            .await?;
        if unchanged {
            return Err(AuthError::SamePassword.into());
        }

        let new_hash = self.hasher.hash_blocking(new_password.to_string()).await?;

        let replaced = self
            .users
            .replace_password_hash(user.id, &user.password_hash, &new_hash)
            .await?;
        if !replaced {
            tracing::warn!(user_id = %user.id, "Password changed concurrently, reset rejected");
            return Err(AuthError::TokenInvalid.into());
        }

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    /// Signature, purpose, expiry, subject existence, fingerprint match
    async fn authorize(&self, token: &str, now: i64) -> Result<User, AppError> {
        let claims = self.codec.verify_at(token, now)?;
        let user_id = claims.user_id().ok_or(AuthError::TokenInvalid)?;

        let user = match self.users.find_by_id(user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %user_id, "Reset token subject no longer exists");
                return Err(AuthError::TokenInvalid.into());
            }
        };

        let current = password_fingerprint(&user.password_hash);
        if claims.prv.as_deref() != Some(current.as_str()) {
            tracing::info!(user_id = %user.id, "Reset token issued for a previous password");
            return Err(AuthError::TokenInvalid.into());
        }

        Ok(user)
    }
}
