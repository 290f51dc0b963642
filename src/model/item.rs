//! Item model: a task in the manager or an issue in the tracker.

use serde::{Deserialize, Serialize};

use super::{Entity, RepoId, keys, now_ms};
use crate::error::{Error, Result};
use crate::fields::Fields;

/// A work record abstracted from either service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Short description
    pub title: String,

    /// Full description, with field lines removed
    pub body: String,

    /// Task id in the manager. `None` for records read from the tracker.
    pub manager_id: Option<String>,

    pub completed: bool,

    /// Last change in the owning service (Unix milliseconds)
    pub last_updated: i64,

    /// Tag names, in service order
    pub tags: Vec<String>,

    /// Metadata extracted from the body plus service-specific keys
    pub fields: Fields,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            manager_id: None,
            completed: false,
            last_updated: now_ms(),
            tags: Vec::new(),
            fields: Fields::new(),
        }
    }
}

impl Item {
    /// Create an item with the given title and default values.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_manager_id(mut self, id: impl Into<String>) -> Self {
        self.manager_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_last_updated(mut self, ms: i64) -> Self {
        self.last_updated = ms;
        self
    }

    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
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

    /// A field's value, or a structural error naming this item.
    pub fn require_field(&self, key: &str) -> Result<&str> {
        self.field(key)
            .ok_or_else(|| Error::missing_field(format!("item '{}'", self.title), key))
    }

    pub fn require_manager_id(&self) -> Result<&str> {
        self.manager_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::missing_field(format!("item '{}'", self.title), "manager id"))
    }

    /// Tracker issue number, if this item is already linked to one.
    #[must_use]
    pub fn number(&self) -> Option<&str> {
        self.field(keys::GH_NUMBER)
    }

    /// The repository this item points at, when both halves are present.
    #[must_use]
    pub fn repo_id(&self) -> Option<RepoId> {
        Some(RepoId::new(
            self.field(keys::GH_OWNER)?,
            self.field(keys::GH_REPO)?,
        ))
    }

    /// The repository this item must point at for a tracker call.
    pub fn require_repo_id(&self) -> Result<RepoId> {
        Ok(RepoId::new(
            self.require_field(keys::GH_OWNER)?,
            self.require_field(keys::GH_REPO)?,
        ))
    }
}

impl Entity for Item {
    fn last_updated(&self) -> i64 {
        self.last_updated
    }

    fn content_eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.body.trim() == other.body.trim()
            && self.completed == other.completed
            && self.fields == other.fields
    }
}
