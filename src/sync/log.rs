//! One-line descriptions of sync operations.
//!
//! Lines read `<entity>.<service>.<op> <where>: <what>`, for example
//! `I.gh.C acme/web: Fix login` or `C.aa.U #cc Web: #12 Fix login: Looks good`.
//! Names and bodies are cut to 20 characters.

use serde::Serialize;
use std::fmt;

use crate::model::{Comment, Item, keys, truncate};

const WIDTH: usize = 20;

/// Which service an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Manager,
    Tracker,
}

/// What an operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "C",
            Self::Update => "U",
            Self::Delete => "D",
        })
    }
}

/// Names needed to describe operations of one project.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub manager_keyword: String,
    pub tracker_keyword: String,
    pub project: String,
}

impl LogContext {
    pub fn new(
        manager_keyword: impl Into<String>,
        tracker_keyword: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            manager_keyword: manager_keyword.into(),
            tracker_keyword: tracker_keyword.into(),
            project: project.into(),
        }
    }

    fn location(&self, side: Side, tracker_item: &Item) -> (String, &str) {
        match side {
            Side::Manager => (truncate(&self.project, WIDTH), self.manager_keyword.as_str()),
            Side::Tracker => (
                format!(
                    "{}/{}",
                    tracker_item.field(keys::GH_OWNER).unwrap_or_default(),
                    tracker_item.field(keys::GH_REPO).unwrap_or_default()
                ),
                self.tracker_keyword.as_str(),
            ),
        }
    }

    /// `I.<svc>.<op> <where>: <title>`. `subject` must carry the
    /// repository fields for tracker operations.
    #[must_use]
    pub fn item_line(&self, side: Side, kind: OpKind, subject: &Item, title: &str) -> String {
        let (location, keyword) = self.location(side, subject);
        format!("I.{keyword}.{kind} {location}: {}", truncate(title, WIDTH))
    }

    /// `C.<svc>.<op> <where>: <item title>: <body>`.
    #[must_use]
    pub fn comment_line(&self, side: Side, kind: OpKind, parent: &Item, comment: &Comment) -> String {
        let (location, keyword) = self.location(side, parent);
        format!(
            "C.{keyword}.{kind} {location}: {}: {}",
            truncate(&parent.title, WIDTH),
            truncate(&comment.body, WIDTH)
        )
    }
}

/// Line for a failed operation.
#[must_use]
pub fn error_line(description: &str, cause: &str) -> String {
    format!("ERROR - {description}. CAUSE: {cause}")
}

/// Line for an operation the target service can't perform.
#[must_use]
pub fn unsupported_line(description: &str) -> String {
    format!("UNSUPPORTED - {description}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LogContext {
        LogContext::new("aa", "gh", "#cc A project with a long name")
    }

    fn issue() -> Item {
        Item::new("#12 Fix the login page for real")
            .with_field(keys::GH_OWNER, "acme")
            .with_field(keys::GH_REPO, "web")
    }

    #[test]
    fn test_item_lines() {
        let item = issue();
        assert_eq!(
            ctx().item_line(Side::Manager, OpKind::Create, &item, &item.title),
            "I.aa.C #cc A project with a: #12 Fix the login pa"
        );
        assert_eq!(
            ctx().item_line(Side::Tracker, OpKind::Update, &item, "Short"),
            "I.gh.U acme/web: Short"
        );
    }

    #[test]
    fn test_comment_lines() {
        let comment = Comment::new("  a comment that goes on and on");
        assert_eq!(
            ctx().comment_line(Side::Tracker, OpKind::Create, &issue(), &comment),
            "C.gh.C acme/web: #12 Fix the login pa: a comment that goe"
        );
        assert_eq!(
            ctx().comment_line(Side::Manager, OpKind::Delete, &issue(), &Comment::new("x")),
            "C.aa.D #cc A project with a: #12 Fix the login pa: x"
        );
    }

    #[test]
    fn test_error_and_unsupported_lines() {
        assert_eq!(
            error_line("I.gh.C acme/web: T", "Validation Failed"),
            "ERROR - I.gh.C acme/web: T. CAUSE: Validation Failed"
        );
        assert_eq!(unsupported_line("C.aa.U p: t: b"), "UNSUPPORTED - C.aa.U p: t: b");
    }
}
