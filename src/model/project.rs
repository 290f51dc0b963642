//! Containers paired by a sync pass.
//!
//! An Asana project is linked to a GitHub repository through fields in
//! its notes (`#gh.owner` and `#gh.repo`).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::keys;
use crate::fields::Fields;

/// An Asana workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// An Asana project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,

    /// Raw notes, still carrying field lines
    pub notes: String,

    /// Workspace the project belongs to (needed to create tasks)
    pub workspace_id: String,

    /// Fields extracted from `notes`, filled in by the orchestrator
    #[serde(default)]
    pub fields: Fields,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        notes: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            notes: notes.into(),
            workspace_id: workspace_id.into(),
            fields: Fields::new(),
        }
    }

    /// The linked repository, if the project's fields name one.
    #[must_use]
    pub fn repo_id(&self) -> Option<RepoId> {
        let owner = self.fields.get(keys::GH_OWNER).filter(|v| !v.is_empty())?;
        let repo = self.fields.get(keys::GH_REPO).filter(|v| !v.is_empty())?;
        Some(RepoId::new(owner, repo))
    }
}

/// A GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
