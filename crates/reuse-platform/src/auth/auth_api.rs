//! Auth API Endpoints
//!
//! - POST /auth/signup - Register a user
//! - POST /auth/login - Exchange email and password for a token pair
//! - POST /auth/refresh - Exchange a refresh token for a new pair
//! - GET /auth/me - Current user

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::password_service::PasswordService;
use crate::auth::token_service::{TokenKind, TokenPair, TokenService};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::user::entity::{NewUser, UserRead};
use crate::user::repository::UserRepository;

/// Signup request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address (`username` is accepted for form-style clients)
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub user_repo: Arc<UserRepository>,
    pub password_service: Arc<PasswordService>,
    pub token_service: Arc<TokenService>,
}

pub(crate) fn validate_email(email: &str) -> Result<String, PlatformError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(PlatformError::invalid_argument("a valid email address is required"));
    }
    Ok(email.to_string())
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    operation_id = "signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = UserRead),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AuthState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserRead>), PlatformError> {
    let email = validate_email(&req.email)?;
    let hashed_password = state.password_service.hash_password(&req.password)?;

    let user = state
        .user_repo
        .insert(&NewUser {
            email,
            full_name: req.full_name,
            hashed_password,
            is_superuser: false,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "User signed up");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Password login
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Inactive user")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, PlatformError> {
    let user = match state.user_repo.find_by_email(req.email.trim()).await? {
        Some(user) => user,
        None => {
            state.password_service.verify_decoy(&req.password);
            warn!(email = %req.email, "Login failed: unknown email");
            return Err(PlatformError::InvalidCredentials);
        }
    };

    if !state.password_service.verify_password(&req.password, &user.hashed_password)? {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Err(PlatformError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(PlatformError::forbidden("inactive user"));
    }

    let pair = state.token_service.issue_pair(&user.email)?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(pair.into()))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/refresh",
    tag = "auth",
    operation_id = "refreshToken",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 403, description = "Inactive user")
    )
)]
pub async fn refresh(
    State(state): State<AuthState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, PlatformError> {
    let claims = state.token_service.decode_token(&req.refresh_token)?;

    if claims.kind != TokenKind::Refresh {
        return Err(PlatformError::InvalidToken {
            message: "refresh token required".to_string(),
        });
    }

    let user = state
        .user_repo
        .find_by_email(&claims.subject)
        .await?
        .ok_or_else(|| PlatformError::unauthorized("user not found"))?;

    if !user.is_active {
        return Err(PlatformError::forbidden("inactive user"));
    }

    Ok(Json(state.token_service.issue_pair(&user.email)?.into()))
}

/// Current user
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    operation_id = "me",
    responses(
        (status = 200, description = "Authenticated user", body = UserRead),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Inactive user")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(auth: Authenticated) -> Json<UserRead> {
    Json(UserRead::from(&auth.0))
}

pub fn auth_router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(signup))
        .routes(routes!(login))
        .routes(routes!(refresh))
        .routes(routes!(me))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  a@b.com ").unwrap(), "a@b.com");
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
    }

    #[test]
    fn test_login_accepts_username_alias() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username": "a@b.com", "password": "pw"}"#).unwrap();
        assert_eq!(req.email, "a@b.com");
    }
}
