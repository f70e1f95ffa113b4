//! User Repository

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::shared::api_common::Page;
use crate::shared::db::{self, from_micros, to_micros};
use crate::shared::error::{PlatformError, Result};
use crate::user::entity::{NewUser, User};

const COLUMNS: &str = "id, email, full_name, hashed_password, is_active, is_superuser, created_at";

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &SqliteRow) -> Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            hashed_password: row.try_get("hashed_password")?,
            is_active: row.try_get("is_active")?,
            is_superuser: row.try_get("is_superuser")?,
            created_at: from_micros(row.try_get("created_at")?)?,
        })
    }

    /// Insert a user. A taken email yields `AlreadyExists`.
    pub async fn insert(&self, new_user: &NewUser) -> Result<User> {
        let created_at = db::now();

        let result = sqlx::query(
            "INSERT INTO user (email, full_name, hashed_password, is_active, is_superuser, created_at) \
             VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.hashed_password)
        .bind(new_user.is_superuser)
        .bind(to_micros(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                PlatformError::already_exists("User", "email", &new_user.email)
            }
            other => PlatformError::Database(other),
        })?;

        debug!(email = %new_user.email, "Inserted user");

        Ok(User {
            id: result.last_insert_rowid(),
            email: new_user.email.clone(),
            full_name: new_user.full_name.clone(),
            hashed_password: new_user.hashed_password.clone(),
            is_active: true,
            is_superuser: new_user.is_superuser,
            created_at,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM user WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM user WHERE email = ?", COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    pub async fn list(&self, page: Page) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM user ORDER BY id ASC LIMIT ? OFFSET ?",
            COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_row).collect()
    }

    /// Persist mutable fields. Returns false when the row is gone.
    pub async fn update(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user SET full_name = ?, is_active = ?, is_superuser = ? WHERE id = ?",
        )
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
