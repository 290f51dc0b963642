//! Comment model: an Asana story or a GitHub issue comment.

use serde::{Deserialize, Serialize};

use super::{Entity, keys, now_ms};
use crate::fields::Fields;

/// A remark attached to an [`Item`](super::Item).
///
/// Identity lives in `fields`: `aa.id`/`aa.commenter` for comments that
/// started in the manager, `gh.id`/`gh.commenter` for tracker comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub body: String,
    pub last_updated: i64,
    pub fields: Fields,
}

impl Default for Comment {
    fn default() -> Self {
        Self {
            body: String::new(),
            last_updated: now_ms(),
            fields: Fields::new(),
        }
    }
}

impl Comment {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_last_updated(mut self, ms: i64) -> Self {
        self.last_updated = ms;
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// A field's value, treating empty values as absent.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn manager_id(&self) -> Option<&str> {
        self.field(keys::AA_ID)
    }

    #[must_use]
    pub fn tracker_id(&self) -> Option<&str> {
        self.field(keys::GH_ID)
    }
}

impl Entity for Comment {
    fn last_updated(&self) -> i64 {
        self.last_updated
    }

    // Identity fields always differ between the two sides of a pair.
    fn content_eq(&self, other: &Self) -> bool {
        self.body.trim() == other.body.trim()
    }
}
