//! Remote services the sync engine talks to.
//!
//! The engine only sees the two traits below. [`asana::AsanaClient`] and
//! [`github::GitHubClient`] implement them over HTTP; tests use in-memory
//! fakes.
//!
//! Every method fails with [`Error::Service`](crate::Error::Service) for
//! remote problems and [`Error::MissingField`](crate::Error::MissingField)
//! when the record passed in lacks the identity the call needs.

use std::future::Future;

use crate::error::{Result, ServiceError};
use crate::model::{Comment, Item, Project, RepoId, Workspace};

pub mod asana;
pub mod github;
pub mod rate_limit;

#[cfg(test)]
pub mod fake;

pub use asana::AsanaClient;
pub use github::GitHubClient;
pub use rate_limit::RateLimitGate;

/// The task manager: owns projects, can't edit or delete comments.
pub trait ManagerService: Send + Sync {
    fn get_workspaces(&self) -> impl Future<Output = Result<Vec<Workspace>>> + Send;

    /// Projects in `workspace` whose name starts with `name_prefix`.
    fn get_projects(
        &self,
        workspace: &Workspace,
        name_prefix: &str,
    ) -> impl Future<Output = Result<Vec<Project>>> + Send;

    fn get_items(&self, project: &Project) -> impl Future<Output = Result<Vec<Item>>> + Send;

    fn create_item(
        &self,
        item: &Item,
        project: &Project,
    ) -> impl Future<Output = Result<Item>> + Send;

    /// Overwrite task `old` with the content of `new`.
    fn update_item(&self, old: &Item, new: &Item) -> impl Future<Output = Result<Item>> + Send;

    fn get_comments(&self, item: &Item) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    fn create_comment(
        &self,
        comment: &Comment,
        item: &Item,
    ) -> impl Future<Output = Result<Comment>> + Send;

    /// Reset time of the latest rate limit hit, if any (ms since epoch).
    fn rate_limited_until(&self) -> Option<i64>;
}

/// The issue tracker: items live in a repository, comments are editable.
pub trait TrackerService: Send + Sync {
    fn get_items(&self, repo: &RepoId) -> impl Future<Output = Result<Vec<Item>>> + Send;

    fn create_item(&self, item: &Item, repo: &RepoId)
    -> impl Future<Output = Result<Item>> + Send;

    /// Overwrite issue `old` with the content of `new`.
    fn update_item(&self, old: &Item, new: &Item) -> impl Future<Output = Result<Item>> + Send;

    fn get_comments(&self, item: &Item) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    fn create_comment(
        &self,
        comment: &Comment,
        item: &Item,
    ) -> impl Future<Output = Result<Comment>> + Send;

    fn update_comment(
        &self,
        old: &Comment,
        new: &Comment,
        parent: &Item,
    ) -> impl Future<Output = Result<Comment>> + Send;

    fn delete_comment(
        &self,
        comment: &Comment,
        parent: &Item,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Reset time of the latest rate limit hit, if any (ms since epoch).
    fn rate_limited_until(&self) -> Option<i64>;
}

/// Map a reqwest failure that produced no usable response.
pub(crate) fn transport_error(context: &str, e: &reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::transport(format!("{context}: request timed out"))
    } else {
        ServiceError::transport(format!("{context}: {e}"))
    }
}

/// Best human-readable message from an error response body.
///
/// Understands `{"message": ...}` (GitHub) and `{"errors": [{"message": ...}]}`
/// (Asana); anything else is returned as-is.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
        return msg.to_string();
    }

    let messages: Vec<&str> = value
        .get("errors")
        .and_then(|e| e.as_array())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        body.trim().to_string()
    } else {
        messages.join("; ")
    }
}

/// Milliseconds since epoch from an RFC 3339 timestamp.
pub(crate) fn parse_timestamp(value: &str) -> std::result::Result<i64, ServiceError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| ServiceError::transport(format!("invalid timestamp {value:?}: {e}")))
}
