//! Request Repository

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::request::entity::{NewRequest, Request, RequestStatus};
use crate::request::query::{RequestFilter, RequestSort};
use crate::shared::api_common::Page;
use crate::shared::db::{from_micros, to_micros};
use crate::shared::error::Result;

const COLUMNS: &str = "r.id, r.title, r.description, r.status, r.priority, r.requester_email, \
                       r.item_id, r.created_at, r.updated_at";

pub struct RequestRepository {
    pool: SqlitePool,
}

impl RequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &SqliteRow) -> Result<Request> {
        let status: String = row.try_get("status")?;
        Ok(Request {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: status.parse()?,
            priority: row.try_get("priority")?,
            requester_email: row.try_get("requester_email")?,
            item_id: row.try_get("item_id")?,
            created_at: from_micros(row.try_get("created_at")?)?,
            updated_at: from_micros(row.try_get("updated_at")?)?,
        })
    }

    pub async fn insert(&self, new_request: &NewRequest, now: DateTime<Utc>) -> Result<Request> {
        let status = RequestStatus::Open;
        let result = sqlx::query(
            "INSERT INTO request (title, description, status, priority, requester_email, item_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_request.title)
        .bind(&new_request.description)
        .bind(status.as_str())
        .bind(new_request.priority)
        .bind(&new_request.requester_email)
        .bind(new_request.item_id)
        .bind(to_micros(now))
        .bind(to_micros(now))
        .execute(&self.pool)
        .await?;

        Ok(Request {
            id: result.last_insert_rowid(),
            title: new_request.title.clone(),
            description: new_request.description.clone(),
            status,
            priority: new_request.priority,
            requester_email: new_request.requester_email.clone(),
            item_id: new_request.item_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Request>> {
        let row = sqlx::query(&format!("SELECT {} FROM request r WHERE r.id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    pub async fn search(
        &self,
        filter: &RequestFilter,
        sort: RequestSort,
        page: Page,
    ) -> Result<Vec<Request>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {}", COLUMNS));
        filter.push_from_where(&mut qb);
        qb.push(sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::parse_row).collect()
    }

    /// Rows matching `filter`, ignoring pagination.
    pub async fn count(&self, filter: &RequestFilter) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) AS total");
        filter.push_from_where(&mut qb);

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.try_get("total")?)
    }

    /// Returns false when the row is gone.
    pub async fn update(&self, request: &Request) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE request SET title = ?, description = ?, status = ?, priority = ?, \
             requester_email = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.priority)
        .bind(&request.requester_email)
        .bind(to_micros(request.updated_at))
        .bind(request.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Single-statement status change; `updated_at` still moves strictly forward.
    pub async fn set_status(&self, id: i64, status: RequestStatus, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE request SET status = ?, updated_at = MAX(?, updated_at + 1) WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(to_micros(now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM request WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
