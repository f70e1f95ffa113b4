//! API Middleware
//!
//! `AuthLayer` puts [`AppState`] into request extensions; the `Authenticated`
//! and `Superuser` extractors read it and run the Access Gate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::Response,
};
use tower::{Layer, Service};

use crate::auth::access_gate::{require_superuser, AccessGate, Actor};
use crate::auth::token_service::extract_bearer_token;
use crate::shared::error::PlatformError;

/// Application state shared with extractors
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
}

/// Authenticated caller
pub struct Authenticated(pub Actor);

impl std::ops::Deref for Authenticated {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Authenticated caller with the superuser flag
pub struct Superuser(pub Actor);

impl std::ops::Deref for Superuser {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .map(String::from)
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| PlatformError::internal("Auth layer not configured"))?;

        let token = bearer_token(parts)
            .ok_or_else(|| PlatformError::unauthorized("Missing authentication token"))?;

        let actor = app_state.gate.authenticate(&token).await?;
        Ok(Authenticated(actor))
    }
}

impl<S> FromRequestParts<S> for Superuser
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(actor) = Authenticated::from_request_parts(parts, state).await?;
        require_superuser(&actor)?;
        Ok(Superuser(actor))
    }
}

/// Injects [`AppState`] into request extensions
#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());

        let future = self.inner.call(req);
        Box::pin(future)
    }
}
