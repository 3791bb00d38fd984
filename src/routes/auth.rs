//! Authentication Routes
//!
//! Registration, login, logout, and current-user lookups. Session tokens are
//! returned in the body and as an http-only cookie.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::{PasswordHasher, TokenCodec};
use crate::configuration::{ApplicationSettings, AuthSettings};
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, ValidationError};
use crate::middleware::{AuthenticatedUser, SESSION_COOKIE};
use crate::users::{NewUser, User, UserRepository, UserResponse};
use crate::validators::{is_valid_email, is_valid_name, parse_birth_date, validate_password};

/// User registration request
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub birth_date: Option<String>,
}

/// User login request
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Authentication response with the session token
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

pub(crate) fn collect<T>(
    errors: &mut Vec<ValidationError>,
    result: Result<T, ValidationError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

/// Validates every registration field, reporting all violations at once
fn validate_registration(form: &RegisterRequest) -> Result<(NewUser, String), AppError> {
    let mut errors = Vec::new();

    let first_name = collect(
        &mut errors,
        is_valid_name("firstName", form.first_name.as_deref().unwrap_or("")),
    );
    let last_name = collect(
        &mut errors,
        is_valid_name("lastName", form.last_name.as_deref().unwrap_or("")),
    );
    let email = collect(&mut errors, is_valid_email(form.email.as_deref().unwrap_or("")));
    let password = form.password.clone().unwrap_or_default();
    let password_ok = collect(&mut errors, validate_password("password", &password));
    let birth_date = collect(
        &mut errors,
        parse_birth_date(form.birth_date.as_deref().unwrap_or("")),
    );

    match (first_name, last_name, email, password_ok, birth_date) {
        (Some(first_name), Some(last_name), Some(email), Some(()), Some(birth_date))
            if errors.is_empty() =>
        {
            let new_user = NewUser {
                first_name,
                last_name,
                email,
                birth_date,
            };
            Ok((new_user, password))
        }
        _ => Err(errors.into()),
    }
}

fn session_cookie(
    token: &str,
    auth: &AuthSettings,
    application: &ApplicationSettings,
) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(application.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(auth.session_token_expiry))
        .finish()
}

fn issue_session(
    user: &User,
    codec: &TokenCodec,
    auth: &AuthSettings,
) -> Result<String, AppError> {
    codec.sign(user.id, None, Duration::seconds(auth.session_token_expiry))
}

/// POST /api/auth/register
///
/// # Errors
/// - 400: Validation errors (every violation listed in `details`)
/// - 409: Email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    users: web::Data<dyn UserRepository>,
    hasher: web::Data<PasswordHasher>,
    codec: web::Data<TokenCodec>,
    auth: web::Data<AuthSettings>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let (new_user, password) = validate_registration(&form)?;

    if users.find_by_email(&new_user.email).await?.is_some() {
        return Err(DatabaseError::UniqueConstraintViolation("Email already in use".to_string()).into());
    }

    let password_hash = hasher.hash_blocking(password).await?;
    let user = User::new(new_user, password_hash);
    users.insert(&user).await?;

    let access_token = issue_session(&user, &codec, &auth)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&access_token, &auth, &application))
        .json(AuthResponse {
            user: UserResponse::from(&user),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: auth.session_token_expiry,
        }))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    form: web::Json<LoginRequest>,
    users: web::Data<dyn UserRepository>,
    hasher: web::Data<PasswordHasher>,
    codec: web::Data<TokenCodec>,
    auth: web::Data<AuthSettings>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email = is_valid_email(form.email.as_deref().unwrap_or(""))?;
    let password = form.password.clone().unwrap_or_default();
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    let user = users.find_by_email(&email).await?;
    // Unknown emails pay the same bcrypt cost as a wrong password
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified = hasher.verify_stored_blocking(password, stored_hash).await?;

    let user = match user {
        Some(user) if verified => user,
        _ => return Err(AuthError::InvalidCredentials.into()),
    };

    let access_token = issue_session(&user, &codec, &auth)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&access_token, &auth, &application))
        .json(AuthResponse {
            user: UserResponse::from(&user),
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: auth.session_token_expiry,
        }))
}

/// POST /api/auth/logout
///
/// Clears the client's cookie. Session tokens are not revoked server-side.
pub async fn logout(application: web::Data<ApplicationSettings>) -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(application.secure_cookies)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "message": "Logged out" }))
}

/// GET /api/auth/me
///
/// **Requires a valid session token**; identity is injected by `SessionAuth`.
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 404: User no longer exists
pub async fn get_current_user(
    identity: web::ReqData<AuthenticatedUser>,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(CurrentUserResponse {
        user: UserResponse::from(&user),
    }))
}

/// GET /api/auth/session
///
/// Personalized when a session is present, anonymous otherwise.
pub async fn current_session(
    identity: Option<web::ReqData<AuthenticatedUser>>,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user = match identity {
        Some(identity) => users.find_by_id(identity.user_id).await?,
        None => None,
    };

    Ok(HttpResponse::Ok().json(SessionResponse {
        authenticated: user.is_some(),
        user: user.as_ref().map(UserResponse::from),
    }))
}
