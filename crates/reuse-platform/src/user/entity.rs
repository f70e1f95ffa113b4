//! User Entity

use chrono::{DateTime, Utc};
use reuse_common::Patch;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub is_superuser: bool,
}

/// Admin update. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserPatch {
    /// `null` clears the display name
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub full_name: Patch<String>,

    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub is_active: Patch<bool>,

    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub is_superuser: Patch<bool>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User) -> Result<()> {
        self.full_name.merge_into_optional(&mut user.full_name);
        self.is_active.merge_into_required("is_active", &mut user.is_active)?;
        self.is_superuser.merge_into_required("is_superuser", &mut user.is_superuser)?;
        Ok(())
    }
}

/// Public user projection; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRead {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserRead {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::PlatformError;

    fn user() -> User {
        User {
            id: 1,
            email: "sam@campus.edu".into(),
            full_name: Some("Sam".into()),
            hashed_password: "$argon2id$x".into(),
            is_active: true,
            is_superuser: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_clears_name_and_keeps_flags() {
        let mut u = user();
        let patch: UserPatch = serde_json::from_str(r#"{"full_name": null}"#).unwrap();
        patch.apply(&mut u).unwrap();
        assert!(u.full_name.is_none());
        assert!(u.is_active);
        assert!(!u.is_superuser);
    }

    #[test]
    fn test_patch_rejects_null_flag() {
        let mut u = user();
        let patch: UserPatch = serde_json::from_str(r#"{"is_active": null}"#).unwrap();
        assert!(matches!(patch.apply(&mut u), Err(PlatformError::InvalidArgument { .. })));
    }
}
