//! User records and the storage seam used by authentication.

mod in_memory;
mod postgres;
mod user;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

pub use in_memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;
pub use user::{NewUser, User, UserResponse};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up by normalized (lowercase) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Fails with `UniqueConstraintViolation` when the email is taken
    async fn insert(&self, user: &User) -> Result<(), AppError>;

    /// Persist profile fields. Never touches `password_hash`.
    async fn save(&self, user: &User) -> Result<(), AppError>;

    /// Swap the stored hash only if it still equals `expected_hash`.
    ///
    /// Returns `false` when the user is gone or the hash already changed.
    async fn replace_password_hash(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, AppError>;
}
