mod auth;
mod health_check;
mod password_reset;
mod users;

pub use auth::{current_session, get_current_user, login, logout, register};
pub use health_check::health_check;
pub use password_reset::{change_password, forgot_password, verify_reset_token, RESET_COOKIE};
pub use users::update_current_user;
