//! Authentication
//!
//! Credential primitives (password hashing, signed tokens), the Access Gate
//! and the `/auth` endpoints.

pub mod password_service;
pub mod token_service;
pub mod access_gate;
pub mod auth_api;

pub use password_service::{Argon2Config, PasswordPolicy, PasswordService};
pub use token_service::{TokenClaims, TokenConfig, TokenKind, TokenPair, TokenService};
pub use access_gate::{require_superuser, AccessGate, Actor};
pub use auth_api::{auth_router, AuthState};
