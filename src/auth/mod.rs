//! Authentication module
//!
//! Signed token codec, password hashing, and the password reset flow.

mod claims;
mod jwt;
mod password;
mod password_reset;

pub use claims::{Claims, TokenPurpose};
pub use jwt::{TokenCodec, TokenError};
pub use password::{password_fingerprint, PasswordHasher, DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
pub use password_reset::PasswordResetService;
