//! Administrator Seeder
//!
//! Ensures the configured superuser exists on startup. An existing account
//! with the same email is left untouched.

use std::sync::Arc;

use tracing::info;

use crate::auth::password_service::PasswordService;
use crate::shared::error::Result;
use crate::user::entity::NewUser;
use crate::user::repository::UserRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
}

pub struct AdminSeeder {
    user_repo: Arc<UserRepository>,
    password_service: Arc<PasswordService>,
}

impl AdminSeeder {
    pub fn new(user_repo: Arc<UserRepository>, password_service: Arc<PasswordService>) -> Self {
        Self { user_repo, password_service }
    }

    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<SeedOutcome> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            info!(email, "Administrator already present");
            return Ok(SeedOutcome::AlreadyPresent);
        }

        let hashed_password = self.password_service.hash_password(password)?;
        let admin = self
            .user_repo
            .insert(&NewUser {
                email: email.to_string(),
                full_name: None,
                hashed_password,
                is_superuser: true,
            })
            .await?;

        info!(user_id = admin.id, email, "Created administrator");
        Ok(SeedOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password_service::{Argon2Config, PasswordPolicy};
    use crate::shared::db;

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let pool = db::connect_in_memory().await.unwrap();
        db::init_schema(&pool).await.unwrap();

        let users = Arc::new(UserRepository::new(pool));
        let passwords = Arc::new(
            PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap(),
        );
        let seeder = AdminSeeder::new(users.clone(), passwords.clone());

        assert_eq!(
            seeder.seed_admin("admin@campus.edu", "changeme123").await.unwrap(),
            SeedOutcome::Created
        );
        assert_eq!(
            seeder.seed_admin("admin@campus.edu", "different456").await.unwrap(),
            SeedOutcome::AlreadyPresent
        );

        let admin = users.find_by_email("admin@campus.edu").await.unwrap().unwrap();
        assert!(admin.is_superuser);
        assert!(admin.is_active);
        assert!(passwords.verify_password("changeme123", &admin.hashed_password).unwrap());
    }
}
