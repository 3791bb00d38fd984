use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppError, DatabaseError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::routes::auth::{collect, CurrentUserResponse};
use crate::users::{UserRepository, UserResponse};
use crate::validators::{is_valid_name, parse_birth_date};

/// Partial profile update. Absent fields are left alone; an empty
/// `birthDate` clears it.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
}

/// PATCH /api/users/me
pub async fn update_current_user(
    identity: web::ReqData<AuthenticatedUser>,
    form: web::Json<UpdateProfileRequest>,
    users: web::Data<dyn UserRepository>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("update_profile").with_user_id(identity.user_id.to_string());

    let mut errors = Vec::new();
    let first_name = form
        .first_name
        .as_deref()
        .and_then(|v| collect(&mut errors, is_valid_name("firstName", v)));
    let last_name = form
        .last_name
        .as_deref()
        .and_then(|v| collect(&mut errors, is_valid_name("lastName", v)));
    let birth_date = form
        .birth_date
        .as_deref()
        .and_then(|v| collect(&mut errors, parse_birth_date(v)));

    if !errors.is_empty() {
        let err: AppError = errors.into();
        context.log_error(&err);
        return Err(err);
    }

    let mut user = users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

    if let Some(first_name) = first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = last_name {
        user.last_name = last_name;
    }
    if let Some(birth_date) = birth_date {
        user.birth_date = birth_date;
    }
    user.updated_at = Utc::now();

    users.save(&user).await?;
    tracing::info!(request_id = %context.request_id, user_id = %user.id, "Profile updated");

    Ok(HttpResponse::Ok().json(CurrentUserResponse {
        user: UserResponse::from(&user),
    }))
}
