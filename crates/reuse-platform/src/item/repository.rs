//! Item Repository
//!
//! Text search uses SQLite `LIKE`; case folding covers ASCII letters only.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::item::entity::{Item, ItemFilter, NewItem};
use crate::shared::api_common::{like_pattern, Page};
use crate::shared::db::{from_micros, to_micros};
use crate::shared::error::Result;

const COLUMNS: &str =
    "id, title, description, category, condition, location, photo_url, owner_email, created_at, is_claimed";

pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &SqliteRow) -> Result<Item> {
        Ok(Item {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            condition: row.try_get("condition")?,
            location: row.try_get("location")?,
            photo_url: row.try_get("photo_url")?,
            owner_email: row.try_get("owner_email")?,
            created_at: from_micros(row.try_get("created_at")?)?,
            is_claimed: row.try_get("is_claimed")?,
        })
    }

    pub async fn insert(&self, new_item: &NewItem, created_at: chrono::DateTime<chrono::Utc>) -> Result<Item> {
        let result = sqlx::query(
            "INSERT INTO item (title, description, category, condition, location, photo_url, owner_email, created_at, is_claimed) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&new_item.title)
        .bind(&new_item.description)
        .bind(&new_item.category)
        .bind(&new_item.condition)
        .bind(&new_item.location)
        .bind(&new_item.photo_url)
        .bind(&new_item.owner_email)
        .bind(to_micros(created_at))
        .execute(&self.pool)
        .await?;

        Ok(Item {
            id: result.last_insert_rowid(),
            title: new_item.title.clone(),
            description: new_item.description.clone(),
            category: new_item.category.clone(),
            condition: new_item.condition.clone(),
            location: new_item.location.clone(),
            photo_url: new_item.photo_url.clone(),
            owner_email: new_item.owner_email.clone(),
            created_at,
            is_claimed: false,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {} FROM item WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    /// Newest first, id descending on equal timestamps.
    pub async fn list(&self, filter: &ItemFilter, page: Page) -> Result<Vec<Item>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM item WHERE 1 = 1", COLUMNS));

        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(q) = filter.text_query.as_deref().filter(|q| !q.is_empty()) {
            let pattern = like_pattern(q);
            qb.push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(is_claimed) = filter.is_claimed {
            qb.push(" AND is_claimed = ").push_bind(is_claimed);
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::parse_row).collect()
    }

    /// Returns false when the row is gone.
    pub async fn update(&self, item: &Item) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE item SET title = ?, description = ?, category = ?, condition = ?, location = ?, \
             photo_url = ?, is_claimed = ? WHERE id = ?",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.condition)
        .bind(&item.location)
        .bind(&item.photo_url)
        .bind(item.is_claimed)
        .bind(item.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the claim flag without inspecting its prior value.
    pub async fn mark_claimed(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE item SET is_claimed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an item, detaching its requests in the same transaction.
    /// Returns false when no such item existed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query("UPDATE request SET item_id = NULL WHERE item_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        debug!(item_id = id, detached, deleted, "Deleted item");
        Ok(deleted > 0)
    }
}
