//! Data models for tracksync.
//!
//! This module contains the service-neutral records that both clients map
//! to and from:
//! - Item (a task or an issue)
//! - Comment (a story or an issue comment)
//! - Workspace, Project and RepoId (the containers being paired)
//!
//! Records are plain values. A write-back to a service yields a new value
//! rather than mutating the one that was read.

pub mod comment;
pub mod item;
pub mod project;

pub use comment::Comment;
pub use item::Item;
pub use project::{Project, RepoId, Workspace};

/// Field names shared by both services.
pub mod keys {
    pub const GH_NUMBER: &str = "gh.number";
    pub const GH_OWNER: &str = "gh.owner";
    pub const GH_REPO: &str = "gh.repo";
    pub const GH_URL: &str = "gh.url";
    pub const GH_ASSIGNEE: &str = "gh.assignee";
    pub const GH_LABELS: &str = "gh.labels";
    pub const GH_MILESTONE: &str = "gh.milestone";
    pub const GH_ID: &str = "gh.id";
    pub const GH_COMMENTER: &str = "gh.commenter";
    pub const AA_ID: &str = "aa.id";
    pub const AA_COMMENTER: &str = "aa.commenter";
}

/// Which of two compared records should be treated as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    /// Content-equal; nothing to sync.
    Same,
    /// The first argument was updated more recently.
    FirstNewer,
    /// The second argument was updated more recently, or both share a timestamp.
    SecondNewer,
}

impl Recency {
    /// `0`, `-1` or `1`, matching the classic comparator convention.
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Same => 0,
            Self::FirstNewer => -1,
            Self::SecondNewer => 1,
        }
    }
}

/// A record that can be reconciled across services.
pub trait Entity {
    /// Milliseconds since epoch of the last change in the owning service.
    fn last_updated(&self) -> i64;

    /// Equality of the synchronized content, ignoring timestamps and
    /// identity that only one service knows about.
    fn content_eq(&self, other: &Self) -> bool;
}

/// Compare two records and pick the more recent one if they differ.
///
/// Equal timestamps resolve to [`Recency::SecondNewer`].
pub fn compare<T: Entity>(a: &T, b: &T) -> Recency {
    if a.content_eq(b) {
        Recency::Same
    } else if a.last_updated() > b.last_updated() {
        Recency::FirstNewer
    } else {
        Recency::SecondNewer
    }
}

/// Current time in milliseconds since epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// First `max` characters of `text`, trimmed. Used for log lines.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect::<String>().trim().to_string()
}
