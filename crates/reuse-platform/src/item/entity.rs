//! Item Entity

use chrono::{DateTime, Utc};
use reuse_common::Patch;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub location: String,
    pub photo_url: Option<String>,
    /// Email of the posting user; not a managed foreign key
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub is_claimed: bool,
}

/// Validated fields for a new item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub location: String,
    pub photo_url: Option<String>,
    pub owner_email: String,
}

fn required(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlatformError::invalid_argument(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl NewItem {
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            title: required("title", self.title)?,
            description: required("description", self.description)?,
            category: required("category", self.category)?,
            condition: required("condition", self.condition)?,
            location: required("location", self.location)?,
            photo_url: self.photo_url.filter(|url| !url.trim().is_empty()),
            owner_email: required("owner_email", self.owner_email)?,
        })
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub location: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Defaults to the caller's email
    #[serde(default)]
    pub owner_email: Option<String>,
}

impl CreateItemRequest {
    pub fn into_new_item(self, default_owner: &str) -> NewItem {
        NewItem {
            title: self.title,
            description: self.description,
            category: self.category,
            condition: self.condition,
            location: self.location,
            photo_url: self.photo_url,
            owner_email: self.owner_email.unwrap_or_else(|| default_owner.to_string()),
        }
    }
}

/// Partial item update
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ItemPatch {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub description: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub category: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub condition: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub location: Patch<String>,

    /// `null` removes the photo
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub photo_url: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub is_claimed: Patch<bool>,
}

impl ItemPatch {
    /// Merge into `item`. On error `item` is left unchanged.
    pub fn apply(self, item: &mut Item) -> Result<()> {
        let mut next = item.clone();

        self.title.map(|v| v.trim().to_string()).merge_into_required("title", &mut next.title)?;
        self.description.merge_into_required("description", &mut next.description)?;
        self.category.merge_into_required("category", &mut next.category)?;
        self.condition.merge_into_required("condition", &mut next.condition)?;
        self.location.merge_into_required("location", &mut next.location)?;
        self.photo_url.merge_into_optional(&mut next.photo_url);
        self.is_claimed.merge_into_required("is_claimed", &mut next.is_claimed)?;

        for (field, value) in [
            ("title", &next.title),
            ("description", &next.description),
            ("category", &next.category),
            ("condition", &next.condition),
            ("location", &next.location),
        ] {
            if value.trim().is_empty() {
                return Err(PlatformError::invalid_argument(format!("{} cannot be empty", field)));
            }
        }

        *item = next;
        Ok(())
    }
}

/// Item list filter
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category: Option<String>,
    /// Case-insensitive substring of title or description
    pub text_query: Option<String>,
    pub is_claimed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemRead {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: String,
    pub location: String,
    pub photo_url: Option<String>,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub is_claimed: bool,
}

impl From<Item> for ItemRead {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            category: item.category,
            condition: item.condition,
            location: item.location,
            photo_url: item.photo_url,
            owner_email: item.owner_email,
            created_at: item.created_at,
            is_claimed: item.is_claimed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item {
            id: 3,
            title: "Desk lamp".into(),
            description: "Works fine".into(),
            category: "furniture".into(),
            condition: "good".into(),
            location: "Dorm B".into(),
            photo_url: Some("lamp.jpg".into()),
            owner_email: "o@campus.edu".into(),
            created_at: Utc::now(),
            is_claimed: false,
        }
    }

    #[test]
    fn test_new_item_requires_fields() {
        let new_item = NewItem {
            title: "  ".into(),
            description: "d".into(),
            category: "c".into(),
            condition: "ok".into(),
            location: "here".into(),
            photo_url: None,
            owner_email: "o@campus.edu".into(),
        };
        let err = new_item.validated().unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_patch_unset_vs_null() {
        let mut it = item();
        let patch: ItemPatch =
            serde_json::from_str(r#"{"photo_url": null, "condition": "worn"}"#).unwrap();
        patch.apply(&mut it).unwrap();

        assert!(it.photo_url.is_none());
        assert_eq!(it.condition, "worn");
        assert_eq!(it.title, "Desk lamp");
    }

    #[test]
    fn test_patch_null_required_field_leaves_item_untouched() {
        let mut it = item();
        let before = it.clone();
        let patch: ItemPatch =
            serde_json::from_str(r#"{"condition": "worn", "title": null}"#).unwrap();

        assert!(matches!(patch.apply(&mut it), Err(PlatformError::InvalidArgument { .. })));
        assert_eq!(it, before);
    }

    #[test]
    fn test_create_request_defaults_owner() {
        let req: CreateItemRequest = serde_json::from_str(
            r#"{"title":"t","description":"d","category":"c","condition":"ok","location":"l"}"#,
        )
        .unwrap();
        let new_item = req.into_new_item("me@campus.edu");
        assert_eq!(new_item.owner_email, "me@campus.edu");
    }
}
