//! Tri-state field for partial updates.
//!
//! A JSON body distinguishes three cases per field:
//!
//! | JSON            | `Patch<T>`        |
//! |-----------------|-------------------|
//! | field omitted   | `Patch::Unset`    |
//! | `"field": null` | `Patch::Null`     |
//! | `"field": v`    | `Patch::Value(v)` |
//!
//! Struct fields must carry `#[serde(default)]` so that omission maps to `Unset`.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

/// Returned when `null` is supplied for a field that cannot be cleared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' cannot be null")]
pub struct NullNotAllowed {
    pub field: &'static str,
}

impl<T> Patch<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Patch<U> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    /// Apply to an optional field: `Null` clears it.
    pub fn merge_into_optional(self, target: &mut Option<T>) {
        match self {
            Patch::Unset => {}
            Patch::Null => *target = None,
            Patch::Value(v) => *target = Some(v),
        }
    }

    /// Apply to a required field: `Null` is rejected and the target is left untouched.
    pub fn merge_into_required(self, field: &'static str, target: &mut T) -> Result<(), NullNotAllowed> {
        match self {
            Patch::Unset => Ok(()),
            Patch::Null => Err(NullNotAllowed { field }),
            Patch::Value(v) => {
                *target = v;
                Ok(())
            }
        }
    }

    /// Reject `Null` up front, keeping `Unset`/`Value` as an `Option`.
    pub fn require_non_null(self, field: &'static str) -> Result<Option<T>, NullNotAllowed> {
        match self {
            Patch::Unset => Ok(None),
            Patch::Null => Err(NullNotAllowed { field }),
            Patch::Value(v) => Ok(Some(v)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the key is present; omission goes through Default.
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        name: Patch<String>,
        #[serde(default)]
        photo: Patch<String>,
        #[serde(default)]
        rank: Patch<i64>,
    }

    #[test]
    fn test_omitted_null_and_value_are_distinct() {
        let body: Body = serde_json::from_str(r#"{"photo": null, "rank": 2}"#).unwrap();
        assert_eq!(body.name, Patch::Unset);
        assert_eq!(body.photo, Patch::Null);
        assert_eq!(body.rank, Patch::Value(2));
    }

    #[test]
    fn test_merge_into_optional() {
        let mut photo = Some("a.png".to_string());
        Patch::Unset.merge_into_optional(&mut photo);
        assert_eq!(photo.as_deref(), Some("a.png"));

        Patch::Value("b.png".to_string()).merge_into_optional(&mut photo);
        assert_eq!(photo.as_deref(), Some("b.png"));

        Patch::Null.merge_into_optional(&mut photo);
        assert!(photo.is_none());
    }

    #[test]
    fn test_merge_into_required_rejects_null() {
        let mut title = "lamp".to_string();
        let err = Patch::<String>::Null.merge_into_required("title", &mut title).unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(title, "lamp");

        Patch::Value("desk".to_string()).merge_into_required("title", &mut title).unwrap();
        assert_eq!(title, "desk");
    }

    #[test]
    fn test_require_non_null() {
        assert_eq!(Patch::<i64>::Unset.require_non_null("rank"), Ok(None));
        assert_eq!(Patch::Value(4).require_non_null("rank"), Ok(Some(4)));
        assert!(Patch::<i64>::Null.require_non_null("rank").is_err());
    }
}
