mod common;

use chrono::Duration;
use common::{spawn_app, ISSUER, RESET_SECRET, SESSION_SECRET};
use marketplace::auth::{TokenCodec, TokenPurpose};
use marketplace::users::UserRepository;
use serde_json::Value;

#[tokio::test]
async fn me_returns_401_without_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Missing token");
}

#[tokio::test]
async fn me_returns_401_for_garbage_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn me_returns_user_for_bearer_token() {
    let app = spawn_app().await;
    let token = app.register_and_get_token("alice@example.com", "secret1").await;

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn me_accepts_session_cookie() {
    let app = spawn_app().await;
    let token = app.register_and_get_token("alice@example.com", "secret1").await;

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .header("Cookie", format!("token={}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn bearer_header_takes_precedence_over_cookie() {
    let app = spawn_app().await;
    let token = app.register_and_get_token("alice@example.com", "secret1").await;

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .bearer_auth("garbage")
        .header("Cookie", format!("token={}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn expired_session_token_is_rejected() {
    let app = spawn_app().await;
    app.register("Alice", "alice@example.com", "secret1").await;
    let user = app.users.find_by_email("alice@example.com").await.unwrap().unwrap();

    let two_hours_ago = chrono::Utc::now().timestamp() - 7200;
    let token = TokenCodec::new(SESSION_SECRET, ISSUER, TokenPurpose::Session)
        .sign_at(user.id, None, Duration::hours(1), two_hours_ago)
        .unwrap();

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn reset_token_is_not_a_session_token() {
    let app = spawn_app().await;
    app.register("Alice", "alice@example.com", "secret1").await;
    app.forgot_password("alice@example.com").await;
    let reset_token = app.last_reset_token();

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .bearer_auth(&reset_token)
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn reset_purpose_is_rejected_even_with_the_session_secret() {
    let app = spawn_app().await;
    app.register("Alice", "alice@example.com", "secret1").await;
    let user = app.users.find_by_email("alice@example.com").await.unwrap().unwrap();

    let token = TokenCodec::new(SESSION_SECRET, ISSUER, TokenPurpose::PasswordReset)
        .sign(user.id, Some("fp".to_string()), Duration::minutes(30))
        .unwrap();

    let response = app
        .client
        .get(&format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn session_endpoint_is_anonymous_without_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/auth/session", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], false);
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn session_endpoint_is_anonymous_with_bad_token() {
    let app = spawn_app().await;
    let foreign = TokenCodec::new(RESET_SECRET, ISSUER, TokenPurpose::Session)
        .sign(uuid::Uuid::new_v4(), None, Duration::hours(1))
        .unwrap();

    for token in ["garbage", foreign.as_str()] {
        let response = app
            .client
            .get(&format!("{}/api/auth/session", app.address))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();

        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["authenticated"], false);
    }
}

#[tokio::test]
async fn session_endpoint_is_personalized_with_token() {
    let app = spawn_app().await;
    let token = app.register_and_get_token("alice@example.com", "secret1").await;

    let response = app
        .client
        .get(&format!("{}/api/auth/session", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");
}
