//! Request search predicate and ordering.
//!
//! The same predicate feeds both the page query and the total count, so the
//! two can never disagree about which rows match. Text matching uses SQLite
//! `LIKE`, which folds case for ASCII letters only.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::request::entity::{validate_priority, RequestStatus};
use crate::shared::api_common::like_pattern;
use crate::shared::db::to_micros;
use crate::shared::error::{PlatformError, Result};

/// Conjunction of optional criteria
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Case-insensitive substring of title or description
    pub text_query: Option<String>,
    pub status: Option<RequestStatus>,
    pub requester_email: Option<String>,
    /// Owner of the referenced item
    pub owner_email: Option<String>,
    /// Inclusive
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive
    pub created_to: Option<DateTime<Utc>>,
    pub min_priority: Option<i64>,
    pub max_priority: Option<i64>,
}

impl RequestFilter {
    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_priority {
            validate_priority(min)?;
        }
        if let Some(max) = self.max_priority {
            validate_priority(max)?;
        }
        Ok(())
    }

    /// Append `FROM ... WHERE ...` for this filter.
    pub(crate) fn push_from_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" FROM request r LEFT JOIN item i ON i.id = r.item_id WHERE 1 = 1");

        if let Some(q) = self.text_query.as_deref().filter(|q| !q.is_empty()) {
            let pattern = like_pattern(q);
            qb.push(" AND (r.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR r.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(status) = self.status {
            qb.push(" AND r.status = ").push_bind(status.as_str());
        }
        if let Some(email) = &self.requester_email {
            qb.push(" AND r.requester_email = ").push_bind(email.clone());
        }
        if let Some(owner) = &self.owner_email {
            qb.push(" AND i.owner_email = ").push_bind(owner.clone());
        }
        if let Some(from) = self.created_from {
            qb.push(" AND r.created_at >= ").push_bind(to_micros(from));
        }
        if let Some(to) = self.created_to {
            qb.push(" AND r.created_at < ").push_bind(to_micros(to));
        }
        if let Some(min) = self.min_priority {
            qb.push(" AND r.priority >= ").push_bind(min);
        }
        if let Some(max) = self.max_priority {
            qb.push(" AND r.priority <= ").push_bind(max);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Status,
    Priority,
    RequesterEmail,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Id => "r.id",
            SortField::Title => "r.title",
            SortField::Status => "r.status",
            SortField::Priority => "r.priority",
            SortField::RequesterEmail => "r.requester_email",
            SortField::CreatedAt => "r.created_at",
            SortField::UpdatedAt => "r.updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            "priority" => Ok(SortField::Priority),
            "requester_email" => Ok(SortField::RequesterEmail),
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            other => Err(PlatformError::invalid_argument(format!(
                "unknown sort field '{}'",
                other
            ))),
        }
    }
}

/// Sort key parsed from `field` or `-field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for RequestSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for RequestSort {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        Ok(Self {
            field: name.parse()?,
            descending,
        })
    }
}

impl RequestSort {
    /// `ORDER BY` clause. Priority is a rank where 1 is the most important,
    /// so "descending importance" means ascending numbers. Ties fall back to
    /// id ascending.
    pub(crate) fn order_by(&self) -> String {
        let ascending_sql = match self.field {
            SortField::Priority => self.descending,
            _ => !self.descending,
        };
        let direction = if ascending_sql { "ASC" } else { "DESC" };

        if self.field == SortField::Id {
            format!(" ORDER BY r.id {}", direction)
        } else {
            format!(" ORDER BY {} {}, r.id ASC", self.field.column(), direction)
        }
    }
}
