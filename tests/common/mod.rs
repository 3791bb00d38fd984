#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use marketplace::configuration::{
    ApplicationSettings, AuthSettings, DatabaseSettings, EmailClientSettings, Settings,
};
use marketplace::email_client::Mailer;
use marketplace::error::EmailError;
use marketplace::startup::run;
use marketplace::telemetry::init_test_telemetry;
use marketplace::users::{InMemoryUserRepository, UserRepository};
use reqwest::header::SET_COOKIE;
use serde_json::{json, Value};

pub const SESSION_SECRET: &str = "integration-session-secret-0123456789";
pub const RESET_SECRET: &str = "integration-reset-secret-0123456789";
pub const ISSUER: &str = "marketplace-test";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Captures outgoing mail instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html: html_content.to_string(),
            text: text_content.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub settings: Settings,
    pub users: Arc<InMemoryUserRepository>,
    pub mailer: Arc<RecordingMailer>,
    pub client: reqwest::Client,
}

pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "unused".to_string(),
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            frontend_url: "http://localhost:5173".to_string(),
            secure_cookies: false,
            static_dir: None,
        },
        auth: AuthSettings {
            session_secret: SESSION_SECRET.to_string(),
            reset_secret: Some(RESET_SECRET.to_string()),
            session_token_expiry: 3600,
            reset_token_ttl_minutes: 30,
            issuer: ISSUER.to_string(),
            password_hash_cost: 4,
        },
        email_client: EmailClientSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            sender_email: "noreply@example.com".to_string(),
            timeout_milliseconds: 200,
        },
    }
}

pub async fn spawn_app() -> TestApp {
    init_test_telemetry();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let settings = test_settings();
    let users = Arc::new(InMemoryUserRepository::new());
    let mailer = Arc::new(RecordingMailer::default());

    let server = run(listener, &settings, users.clone(), mailer.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        settings,
        users,
        mailer,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, first_name: &str, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/api/auth/register",
            &json!({
                "firstName": first_name,
                "lastName": "Liddell",
                "email": email,
                "password": password
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/api/auth/login",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Registers a user and returns the session token from the body
    pub async fn register_and_get_token(&self, email: &str, password: &str) -> String {
        let response = self.register("Alice", email, password).await;
        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn forgot_password(&self, email: &str) -> reqwest::Response {
        self.post_json("/api/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    pub async fn verify_reset_token(&self, token: &str) -> reqwest::Response {
        self.post_json("/api/auth/verify-reset-token", &json!({ "token": token }))
            .await
    }

    /// change-password with an explicit reset cookie (or none)
    pub async fn change_password(&self, reset_token: Option<&str>, new_password: &str) -> reqwest::Response {
        let mut request = self
            .client
            .post(&format!("{}/api/auth/change-password", self.address))
            .json(&json!({ "newPassword": new_password }));
        if let Some(token) = reset_token {
            request = request.header("Cookie", format!("reset_token={}", token));
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// Token from the most recent reset email's link
    pub fn last_reset_token(&self) -> String {
        let sent = self.mailer.sent();
        let text = &sent.last().expect("no email sent").text;
        let start = text.find("token=").expect("no token in email") + "token=".len();
        text[start..]
            .split_whitespace()
            .next()
            .expect("empty token")
            .to_string()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub async fn password_hash_of(&self, email: &str) -> String {
        self.users
            .find_by_email(email)
            .await
            .unwrap()
            .expect("user missing")
            .password_hash
    }
}

/// Value of the named cookie in a response's `Set-Cookie` headers
pub fn set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookie_header(response, name).map(|header| {
        header
            .split(';')
            .next()
            .unwrap_or("")
            .splitn(2, '=')
            .nth(1)
            .unwrap_or("")
            .to_string()
    })
}

/// The full `Set-Cookie` header for the named cookie
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(str::to_string)
}
