//! Request Entity
//!
//! A ticket with title, status and priority that may reference an item.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use reuse_common::Patch;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};

pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 5;
pub const DEFAULT_PRIORITY: i64 = 3;

/// Request status. Any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    InProgress,
    Closed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(RequestStatus::Open),
            "in_progress" => Ok(RequestStatus::InProgress),
            "closed" => Ok(RequestStatus::Closed),
            other => Err(PlatformError::invalid_argument(format!(
                "unknown status '{}', expected one of open, in_progress, closed",
                other
            ))),
        }
    }
}

/// Priority 1 (highest) through 5.
pub fn validate_priority(priority: i64) -> Result<i64> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(priority)
    } else {
        Err(PlatformError::invalid_argument(format!(
            "priority must be between {} and {}, got {}",
            MIN_PRIORITY, MAX_PRIORITY, priority
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: RequestStatus,
    pub priority: i64,
    pub requester_email: String,
    pub item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Next `updated_at`: `now`, or one microsecond past the previous value
    /// if the clock has not moved beyond it.
    pub fn next_updated_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self.updated_at + Duration::microseconds(1);
        if now > floor { now } else { floor }
    }
}

/// Validated fields for insertion
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub requester_email: String,
    pub item_id: Option<i64>,
}

/// Create request payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateRequest {
    /// Required unless `item_id` is given
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the caller's email
    #[serde(default)]
    pub requester_email: Option<String>,
    /// 1 (highest) to 5, default 3
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub item_id: Option<i64>,
}

/// Partial request update. Every field is required on the record, so `null`
/// is rejected everywhere.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RequestPatch {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub description: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub priority: Patch<i64>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub requester_email: Patch<String>,
}

impl RequestPatch {
    /// Validate everything first, then merge field by field.
    pub fn apply(self, request: &mut Request) -> Result<()> {
        let title = self.title.require_non_null("title")?;
        let description = self.description.require_non_null("description")?;
        let requester_email = self.requester_email.require_non_null("requester_email")?;
        let status = self
            .status
            .require_non_null("status")?
            .map(|s| s.parse::<RequestStatus>())
            .transpose()?;
        let priority = self
            .priority
            .require_non_null("priority")?
            .map(validate_priority)
            .transpose()?;

        if let Some(title) = &title {
            if title.trim().is_empty() {
                return Err(PlatformError::invalid_argument("title cannot be empty"));
            }
        }
        if let Some(email) = &requester_email {
            if email.trim().is_empty() {
                return Err(PlatformError::invalid_argument("requester_email cannot be empty"));
            }
        }

        if let Some(title) = title {
            request.title = title.trim().to_string();
        }
        if let Some(description) = description {
            request.description = description;
        }
        if let Some(email) = requester_email {
            request.requester_email = email.trim().to_string();
        }
        if let Some(status) = status {
            request.status = status;
        }
        if let Some(priority) = priority {
            request.priority = priority;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestRead {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: RequestStatus,
    pub priority: i64,
    pub requester_email: String,
    pub item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Request> for RequestRead {
    fn from(r: Request) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            status: r.status,
            priority: r.priority,
            requester_email: r.requester_email,
            item_id: r.item_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    fn request() -> Request {
        let now = Utc::now().trunc_subsecs(6);
        Request {
            id: 1,
            title: "Need a kettle".into(),
            description: "for the dorm".into(),
            status: RequestStatus::Open,
            priority: 3,
            requester_email: "r@campus.edu".into(),
            item_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("in_progress".parse::<RequestStatus>().unwrap(), RequestStatus::InProgress);
        assert!("done".parse::<RequestStatus>().is_err());
        assert!("OPEN".parse::<RequestStatus>().is_err());
        assert_eq!(RequestStatus::Closed.to_string(), "closed");
    }

    #[test]
    fn test_priority_bounds() {
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(6).is_err());
        assert_eq!(validate_priority(1).unwrap(), 1);
        assert_eq!(validate_priority(5).unwrap(), 5);
    }

    #[test]
    fn test_patch_status_only() {
        let mut r = request();
        let patch: RequestPatch = serde_json::from_str(r#"{"status": "closed"}"#).unwrap();
        patch.apply(&mut r).unwrap();

        assert_eq!(r.status, RequestStatus::Closed);
        assert_eq!(r.title, "Need a kettle");
        assert_eq!(r.description, "for the dorm");
        assert_eq!(r.priority, 3);
    }

    #[test]
    fn test_patch_rejects_null_and_bad_values_without_mutating() {
        let mut r = request();
        let before = r.clone();

        for body in [
            r#"{"title": null}"#,
            r#"{"status": "archived", "title": "x"}"#,
            r#"{"priority": 9, "title": "x"}"#,
            r#"{"title": "   "}"#,
        ] {
            let patch: RequestPatch = serde_json::from_str(body).unwrap();
            assert!(matches!(patch.apply(&mut r), Err(PlatformError::InvalidArgument { .. })));
            assert_eq!(r, before);
        }
    }

    #[test]
    fn test_next_updated_at_is_strictly_increasing() {
        let r = request();
        assert!(r.next_updated_at(r.updated_at) > r.updated_at);
        assert!(r.next_updated_at(r.updated_at - Duration::seconds(5)) > r.updated_at);

        let later = r.updated_at + Duration::seconds(1);
        assert_eq!(r.next_updated_at(later), later);
    }
}
