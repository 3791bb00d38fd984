use config::ConfigError as SourceError;

use crate::auth::{DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
use crate::email_client::SenderEmail;
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub email_client: EmailClientSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Base URL of the web client; reset links point at `{frontend_url}/reset-password`
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Marks auth cookies `Secure`. Enable in production.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Directory holding the built web client, served at `/` when set
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// One year
pub const MAX_SESSION_TOKEN_EXPIRY: i64 = 365 * 24 * 60 * 60;
/// One day
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Token and password hashing settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub session_secret: String,
    /// Falls back to `session_secret` when unset
    #[serde(default)]
    pub reset_secret: Option<String>,
    #[serde(default = "default_session_token_expiry")]
    pub session_token_expiry: i64, // seconds (604800 = 7 days)
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,
    pub issuer: String,
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

impl AuthSettings {
    pub fn reset_secret(&self) -> &str {
        self.reset_secret.as_deref().unwrap_or(&self.session_secret)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.session_secret".to_string()));
        }
        if self.reset_secret().trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.reset_secret".to_string()));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.password_hash_cost must be between {} and {}",
                MIN_HASH_COST,
                MAX_HASH_COST
            )));
        }
        if !(1..=MAX_SESSION_TOKEN_EXPIRY).contains(&self.session_token_expiry) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.session_token_expiry must be between 1 and {} seconds",
                MAX_SESSION_TOKEN_EXPIRY
            )));
        }
        if !(1..=MAX_RESET_TOKEN_TTL_MINUTES).contains(&self.reset_token_ttl_minutes) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.reset_token_ttl_minutes must be between 1 and {}",
                MAX_RESET_TOKEN_TTL_MINUTES
            )));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    #[serde(default = "default_email_timeout")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn sender(&self) -> Result<SenderEmail, ConfigError> {
        SenderEmail::parse(&self.sender_email).map_err(|e| {
            ConfigError::InvalidValue(format!("email_client.sender_email: {}", e))
        })
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_session_token_expiry() -> i64 {
    7 * 24 * 60 * 60
}

fn default_reset_token_ttl_minutes() -> i64 {
    30
}

fn default_password_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

fn default_email_timeout() -> u64 {
    10_000
}

/// Reads `configuration.{yaml,toml,json}` from the working directory, then
/// applies `APP_`-prefixed environment overrides (e.g. `APP_AUTH__SESSION_SECRET`).
pub fn get_configuration() -> Result<Settings, SourceError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
