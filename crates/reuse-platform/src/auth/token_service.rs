//! Token Service
//!
//! HS256 signed, self-contained tokens carrying subject, issue and expiry
//! times (integer epoch seconds) and a kind claim separating access tokens
//! from refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Access,
    Refresh,
}

/// Decoded token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User email
    #[serde(rename = "sub")]
    pub subject: String,

    #[serde(rename = "iat")]
    pub issued_at: i64,

    #[serde(rename = "exp")]
    pub expiry: i64,

    #[serde(default)]
    pub kind: TokenKind,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

impl TokenConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_minutes: 60,
            refresh_ttl_minutes: 60 * 24 * 7,
        }
    }
}

/// Access and refresh token issued together at login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        info!(
            access_ttl_minutes = config.access_ttl_minutes,
            refresh_ttl_minutes = config.refresh_ttl_minutes,
            "TokenService initialized with HS256"
        );

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue an access token.
    pub fn issue_token(&self, subject: &str, ttl_minutes: i64) -> Result<String> {
        self.issue_token_of_kind(subject, TokenKind::Access, ttl_minutes)
    }

    pub fn issue_token_of_kind(&self, subject: &str, kind: TokenKind, ttl_minutes: i64) -> Result<String> {
        let now = Utc::now();
        let expiry = Duration::try_minutes(ttl_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                PlatformError::internal(format!("Token lifetime out of range: {} minutes", ttl_minutes))
            })?;
        let claims = TokenClaims {
            subject: subject.to_string(),
            issued_at: now.timestamp(),
            expiry: expiry.timestamp(),
            kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to encode token: {}", e)))
    }

    /// Issue both tokens for one subject with the configured lifetimes.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_token_of_kind(subject, TokenKind::Access, self.config.access_ttl_minutes)?,
            refresh_token: self.issue_token_of_kind(subject, TokenKind::Refresh, self.config.refresh_ttl_minutes)?,
        })
    }

    /// `TokenExpired` once `exp` has passed, `InvalidToken` for everything else.
    pub fn decode_token(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                _ => PlatformError::InvalidToken { message: e.to_string() },
            })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
