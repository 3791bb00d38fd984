//! Session Authentication Middleware
//!
//! Reads a session token from `Authorization: Bearer <token>`, falling back to
//! the `token` cookie, verifies it, and injects the caller's identity into
//! request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::TokenCodec;
use crate::error::{AppError, AuthError};

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "token";

/// Identity resolved from a verified session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Required,
    Optional,
}

/// Session middleware.
///
/// `required()` rejects requests without a usable token with 401.
/// `optional()` lets them through anonymously.
pub struct SessionAuth {
    codec: TokenCodec,
    mode: Mode,
}

impl SessionAuth {
    pub fn required(codec: TokenCodec) -> Self {
        Self {
            codec,
            mode: Mode::Required,
        }
    }

    pub fn optional(codec: TokenCodec) -> Self {
        Self {
            codec,
            mode: Mode::Optional,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionAuthService {
            service: Rc::new(service),
            codec: self.codec.clone(),
            mode: self.mode,
        }))
    }
}

pub struct SessionAuthService<S> {
    service: Rc<S>,
    codec: TokenCodec,
    mode: Mode,
}

/// Token from an `Authorization: Bearer` header, if one is present and non-empty
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn session_token(req: &ServiceRequest) -> Option<String> {
    bearer_token(req.headers()).or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

impl<S, B> Service<ServiceRequest> for SessionAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Expired and malformed tokens both map to Unauthorized
        let identity = match session_token(&req) {
            None => Err(AuthError::MissingToken),
            Some(token) => self
                .codec
                .verify(&token)
                .ok()
                .and_then(|claims| claims.user_id())
                .ok_or(AuthError::Unauthorized),
        };

        match identity {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser { user_id });
                tracing::debug!(user_id = %user_id, "Session token validated");
            }
            Err(e) if self.mode == Mode::Required => {
                tracing::warn!(path = %req.path(), error = %e, "Rejected unauthenticated request");
                return Box::pin(async move { Err(AppError::Auth(e).into()) });
            }
            Err(e) => {
                tracing::debug!(error = %e, "Proceeding anonymously");
            }
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
