//! Password Reset Routes
//!
//! forgot-password -> emailed link -> verify-reset-token (sets cookie) -> change-password

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::auth::PasswordResetService;
use crate::configuration::ApplicationSettings;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::validators::validate_password;

/// Cookie carrying a verified reset token between the verify and commit steps
pub const RESET_COOKIE: &str = "reset_token";
const RESET_COOKIE_PATH: &str = "/api/auth";

const FORGOT_PASSWORD_MESSAGE: &str = "If that email exists, a reset link has been sent.";

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct VerifyResetTokenRequest {
    pub token: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub new_password: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn reset_cookie(value: String, application: &ApplicationSettings) -> Cookie<'static> {
    Cookie::build(RESET_COOKIE, value)
        .path(RESET_COOKIE_PATH)
        .http_only(true)
        .secure(application.secure_cookies)
        .same_site(SameSite::Lax)
        .finish()
}

fn removal_cookie(application: &ApplicationSettings) -> Cookie<'static> {
    let mut cookie = reset_cookie(String::new(), application);
    cookie.make_removal();
    cookie
}

/// POST /api/auth/forgot-password
///
/// Always 200 with the same body for well-formed input, registered or not.
///
/// # Errors
/// - 400: Missing or malformed email
/// - 503: Mail transport failed for a registered address
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    service: web::Data<PasswordResetService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("forgot_password");

    if let Err(e) = service
        .forgot_password(form.email.as_deref().unwrap_or(""))
        .await
    {
        context.log_error(&e);
        return Err(e);
    }

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: FORGOT_PASSWORD_MESSAGE,
    }))
}

/// POST /api/auth/verify-reset-token
///
/// On success the token is stored in an http-only cookie scoped to `/api/auth`
/// so the change-password step never needs it in the body.
///
/// # Errors
/// - 400: Missing token, or token invalid or already used
/// - 410: Token expired
pub async fn verify_reset_token(
    form: web::Json<VerifyResetTokenRequest>,
    service: web::Data<PasswordResetService>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let token = form.token.as_deref().map(str::trim).unwrap_or("");
    if token.is_empty() {
        return Err(ValidationError::EmptyField("token".to_string()).into());
    }

    let user = service.verify_reset_token(token).await?;
    tracing::info!(user_id = %user.id, "Reset token accepted");

    let mut cookie = reset_cookie(token.to_string(), &application);
    cookie.set_max_age(CookieDuration::seconds(service.ttl().num_seconds()));

    Ok(HttpResponse::Ok().cookie(cookie).json(MessageResponse {
        message: "Token accepted",
    }))
}

/// POST /api/auth/change-password
///
/// Reads the token from the reset cookie and re-verifies it in full.
///
/// # Errors
/// - 400: Password policy violation, invalid or used token, or unchanged password
/// - 401: No reset cookie
/// - 410: Token expired (the cookie is cleared)
pub async fn change_password(
    req: HttpRequest,
    form: web::Json<ChangePasswordRequest>,
    service: web::Data<PasswordResetService>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let new_password = form.new_password.clone().unwrap_or_default();
    validate_password("newPassword", &new_password)?;

    let token = req
        .cookie(RESET_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    match service.change_password(&token, &new_password).await {
        Ok(()) => Ok(HttpResponse::Ok()
            .cookie(removal_cookie(&application))
            .json(MessageResponse {
                message: "Password changed",
            })),
        Err(e) if e.is_auth(AuthError::TokenExpired) => {
            let mut response = ResponseError::error_response(&e);
            response
                .add_cookie(&removal_cookie(&application))
                .map_err(|e| AppError::Internal(e.to_string()))?;
            Ok(response)
        }
        Err(e) => Err(e),
    }
}
