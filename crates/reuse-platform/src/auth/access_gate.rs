//! Access Gate
//!
//! Resolves a bearer token to an [`Actor`] and applies role checks.
//! Holds no per-call state; every call decodes and looks the user up again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::auth::token_service::{TokenKind, TokenService};
use crate::shared::error::{PlatformError, Result};
use crate::user::entity::{User, UserRead};
use crate::user::repository::UserRepository;

/// The authenticated caller, threaded explicitly into handlers
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl Actor {
    /// Owners and superusers may modify a record owned by `owner_email`.
    pub fn can_modify(&self, owner_email: &str) -> bool {
        self.is_superuser || self.email == owner_email
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

impl From<&Actor> for UserRead {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            email: actor.email.clone(),
            full_name: actor.full_name.clone(),
            is_active: true,
            is_superuser: actor.is_superuser,
            created_at: actor.created_at,
        }
    }
}

pub struct AccessGate {
    token_service: Arc<TokenService>,
    users: Arc<UserRepository>,
}

impl AccessGate {
    pub fn new(token_service: Arc<TokenService>, users: Arc<UserRepository>) -> Self {
        Self { token_service, users }
    }

    /// Undecodable, expired or non-access tokens and unknown users are
    /// `Unauthorized`; inactive users are `Forbidden`.
    pub async fn authenticate(&self, token: &str) -> Result<Actor> {
        let claims = self
            .token_service
            .decode_token(token)
            .map_err(|e| PlatformError::unauthorized(e.to_string()))?;

        if claims.kind != TokenKind::Access {
            return Err(PlatformError::unauthorized("access token required"));
        }

        let user = self
            .users
            .find_by_email(&claims.subject)
            .await?
            .ok_or_else(|| PlatformError::unauthorized("user not found"))?;

        if !user.is_active {
            return Err(PlatformError::forbidden("inactive user"));
        }

        debug!(user_id = user.id, "Authenticated actor");
        Ok(user.into())
    }
}

pub fn require_superuser(actor: &Actor) -> Result<()> {
    if actor.is_superuser {
        Ok(())
    } else {
        Err(PlatformError::forbidden("not enough privileges"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_service::TokenConfig;
    use crate::shared::db;
    use crate::user::entity::NewUser;

    struct Fixture {
        gate: AccessGate,
        tokens: Arc<TokenService>,
        users: Arc<UserRepository>,
    }

    async fn fixture() -> Fixture {
        let pool = db::connect_in_memory().await.unwrap();
        db::init_schema(&pool).await.unwrap();
        let users = Arc::new(UserRepository::new(pool));
        let tokens = Arc::new(TokenService::new(TokenConfig::with_secret("gate-secret")));
        Fixture {
            gate: AccessGate::new(tokens.clone(), users.clone()),
            tokens,
            users,
        }
    }

    async fn add_user(users: &UserRepository, email: &str) -> User {
        users
            .insert(&NewUser {
                email: email.into(),
                full_name: None,
                hashed_password: "hash".into(),
                is_superuser: false,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_resolves_actor() {
        let f = fixture().await;
        let user = add_user(&f.users, "lee@campus.edu").await;
        let token = f.tokens.issue_token("lee@campus.edu", 60).unwrap();

        let actor = f.gate.authenticate(&token).await.unwrap();
        assert_eq!(actor.id, user.id);
        assert!(require_superuser(&actor).is_err());
    }

    #[tokio::test]
    async fn test_unknown_user_is_unauthorized() {
        let f = fixture().await;
        let token = f.tokens.issue_token("ghost@campus.edu", 60).unwrap();

        let err = f.gate.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, PlatformError::Unauthorized { ref message } if message == "user not found"));
    }

    #[tokio::test]
    async fn test_expired_and_refresh_tokens_are_unauthorized() {
        let f = fixture().await;
        add_user(&f.users, "lee@campus.edu").await;

        let expired = f.tokens.issue_token("lee@campus.edu", -1).unwrap();
        assert!(matches!(f.gate.authenticate(&expired).await, Err(PlatformError::Unauthorized { .. })));

        let refresh = f
            .tokens
            .issue_token_of_kind("lee@campus.edu", TokenKind::Refresh, 60)
            .unwrap();
        assert!(matches!(f.gate.authenticate(&refresh).await, Err(PlatformError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_inactive_user_is_forbidden() {
        let f = fixture().await;
        let mut user = add_user(&f.users, "lee@campus.edu").await;
        user.is_active = false;
        f.users.update(&user).await.unwrap();

        let token = f.tokens.issue_token("lee@campus.edu", 60).unwrap();
        assert!(matches!(f.gate.authenticate(&token).await, Err(PlatformError::Forbidden { .. })));
    }

    #[test]
    fn test_can_modify() {
        let actor = Actor {
            id: 1,
            email: "o@campus.edu".into(),
            full_name: None,
            is_superuser: false,
            created_at: Utc::now(),
        };
        assert!(actor.can_modify("o@campus.edu"));
        assert!(!actor.can_modify("x@campus.edu"));
        assert!(Actor { is_superuser: true, ..actor }.can_modify("x@campus.edu"));
    }
}
