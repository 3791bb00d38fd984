//! Middleware module
//!
//! Session authentication for protected and personalized routes.

mod session_auth;

pub use session_auth::{bearer_token, AuthenticatedUser, SessionAuth, SESSION_COOKIE};
