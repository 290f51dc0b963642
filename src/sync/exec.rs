//! Apply operation sets to the two services.
//!
//! Stages run in a fixed order: manager create, update, delete, then
//! tracker create, update, delete. A service error fails only its own
//! operation; the rest of the batch still runs. Anything else (a record
//! missing the identity a call needs) aborts the batch.

use serde::Serialize;

use super::log::{LogContext, OpKind, Side, error_line, unsupported_line};
use super::ops::{CommentOps, ItemOps};
use crate::error::{Error, Result, ServiceError};
use crate::model::{Comment, Item};
use crate::service::{ManagerService, TrackerService};

/// Result of one attempted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Outcome<T> {
    /// The service accepted it; holds the record as the service now has it.
    Applied(T),
    /// The target service can't do this; nothing was sent.
    Unsupported,
    Failed(ServiceError),
}

impl<T> Outcome<T> {
    /// Settle a service call: service errors are captured, others propagate.
    fn settle(result: Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Self::Applied(value)),
            Err(Error::Service(e)) => Ok(Self::Failed(e)),
            Err(other) => Err(other),
        }
    }

    #[must_use]
    pub fn applied(&self) -> Option<&T> {
        match self {
            Self::Applied(value) => Some(value),
            _ => None,
        }
    }
}

/// One attempted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpRecord<T> {
    pub side: Side,
    pub kind: OpKind,
    pub description: String,
    pub outcome: Outcome<T>,
}

impl<T> OpRecord<T> {
    /// Log line, or `None` for a rate-limited failure (reported once per run).
    #[must_use]
    pub fn log_line(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Applied(_) => Some(self.description.clone()),
            Outcome::Unsupported => Some(unsupported_line(&self.description)),
            Outcome::Failed(e) if e.is_rate_limited() => None,
            Outcome::Failed(e) => Some(error_line(&self.description, &e.text)),
        }
    }
}

/// Everything an executor call attempted, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecReport<T> {
    pub records: Vec<OpRecord<T>>,
}

impl<T> Default for ExecReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> ExecReport<T> {
    fn push(&mut self, side: Side, kind: OpKind, description: String, outcome: Outcome<T>) {
        if let Outcome::Failed(e) = &outcome {
            if !e.is_rate_limited() {
                tracing::warn!(op = %description, error = %e, "operation failed");
            }
        } else {
            tracing::debug!(op = %description, "operation done");
        }
        self.records.push(OpRecord {
            side,
            kind,
            description,
            outcome,
        });
    }

    /// True if any operation failed. Unsupported operations don't count.
    #[must_use]
    pub fn has_blocking_error(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ServiceError> {
        self.records.iter().filter_map(|r| match &r.outcome {
            Outcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.records.iter().filter_map(OpRecord::log_line).collect()
    }
}

/// Apply item operations.
///
/// Creating an issue is followed by a manager update that writes the new
/// issue's fields back onto the task. A completed task's issue is created
/// open and then closed as a separate update; the task is stamped either way.
///
/// # Errors
///
/// Returns an error only for non-service failures, such as an item
/// missing the identity its operation needs.
pub async fn exec_item_ops<M, T>(
    manager: &M,
    tracker: &T,
    ops: &ItemOps,
    log: &LogContext,
) -> Result<ExecReport<Item>>
where
    M: ManagerService,
    T: TrackerService,
{
    let mut report = ExecReport::default();
    let project = &ops.manager.parent;

    for item in &ops.manager.create {
        let line = log.item_line(Side::Manager, OpKind::Create, item, &item.title);
        let outcome = Outcome::settle(manager.create_item(item, project).await)?;
        report.push(Side::Manager, OpKind::Create, line, outcome);
    }

    for update in &ops.manager.update {
        let line = log.item_line(Side::Manager, OpKind::Update, &update.old, &update.new.title);
        let outcome = Outcome::settle(manager.update_item(&update.old, &update.new).await)?;
        report.push(Side::Manager, OpKind::Update, line, outcome);
    }

    for item in &ops.manager.del {
        let line = log.item_line(Side::Manager, OpKind::Delete, item, &item.title);
        report.push(Side::Manager, OpKind::Delete, line, Outcome::Unsupported);
    }

    for item in &ops.tracker.create {
        let line = log.item_line(Side::Tracker, OpKind::Create, item, &item.title);
        let repo = item.require_repo_id()?;

        let created = Outcome::settle(tracker.create_item(item, &repo).await)?;
        let Outcome::Applied(issue) = created else {
            report.push(Side::Tracker, OpKind::Create, line, created);
            continue;
        };
        report.push(Side::Tracker, OpKind::Create, line, Outcome::Applied(issue.clone()));

        // The issue exists from here on, so the task gets its number even
        // if closing it fails.
        let mut stamp = issue.clone();
        if item.completed && !issue.completed {
            let closed = issue.clone().with_completed(true);
            let close_line = log.item_line(Side::Tracker, OpKind::Update, &issue, &closed.title);
            let outcome = Outcome::settle(tracker.update_item(&issue, &closed).await)?;
            stamp = match outcome.applied() {
                Some(updated) => updated.clone(),
                None => closed,
            };
            report.push(Side::Tracker, OpKind::Update, close_line, outcome);
        }

        let stamp_line = log.item_line(Side::Manager, OpKind::Update, item, &stamp.title);
        let stamped = Outcome::settle(manager.update_item(item, &stamp).await)?;
        report.push(Side::Manager, OpKind::Update, stamp_line, stamped);
    }

    for update in &ops.tracker.update {
        let line = log.item_line(Side::Tracker, OpKind::Update, &update.old, &update.new.title);
        let outcome = Outcome::settle(tracker.update_item(&update.old, &update.new).await)?;
        report.push(Side::Tracker, OpKind::Update, line, outcome);
    }

    for item in &ops.tracker.del {
        let line = log.item_line(Side::Tracker, OpKind::Delete, item, &item.title);
        report.push(Side::Tracker, OpKind::Delete, line, Outcome::Unsupported);
    }

    Ok(report)
}

/// Apply comment operations for one task/issue pair.
///
/// Asana stories can't be edited or deleted, so manager updates and
/// deletes are recorded as unsupported without a request.
///
/// # Errors
///
/// Returns an error only for non-service failures, such as a comment
/// missing the id its operation needs.
pub async fn exec_comment_ops<M, T>(
    manager: &M,
    tracker: &T,
    ops: &CommentOps,
    log: &LogContext,
) -> Result<ExecReport<Comment>>
where
    M: ManagerService,
    T: TrackerService,
{
    let mut report = ExecReport::default();
    let task = &ops.manager.parent;
    let issue = &ops.tracker.parent;

    for comment in &ops.manager.create {
        let line = log.comment_line(Side::Manager, OpKind::Create, task, comment);
        let outcome = Outcome::settle(manager.create_comment(comment, task).await)?;
        report.push(Side::Manager, OpKind::Create, line, outcome);
    }

    for update in &ops.manager.update {
        let line = log.comment_line(Side::Manager, OpKind::Update, task, &update.new);
        report.push(Side::Manager, OpKind::Update, line, Outcome::Unsupported);
    }

    for comment in &ops.manager.del {
        let line = log.comment_line(Side::Manager, OpKind::Delete, task, comment);
        report.push(Side::Manager, OpKind::Delete, line, Outcome::Unsupported);
    }

    for comment in &ops.tracker.create {
        let line = log.comment_line(Side::Tracker, OpKind::Create, issue, comment);
        let outcome = Outcome::settle(tracker.create_comment(comment, issue).await)?;
        report.push(Side::Tracker, OpKind::Create, line, outcome);
    }

    for update in &ops.tracker.update {
        let line = log.comment_line(Side::Tracker, OpKind::Update, issue, &update.new);
        let outcome =
            Outcome::settle(tracker.update_comment(&update.old, &update.new, issue).await)?;
        report.push(Side::Tracker, OpKind::Update, line, outcome);
    }

    for comment in &ops.tracker.del {
        let line = log.comment_line(Side::Tracker, OpKind::Delete, issue, comment);
        let outcome = Outcome::settle(
            tracker
                .delete_comment(comment, issue)
                .await
                .map(|()| comment.clone()),
        )?;
        report.push(Side::Tracker, OpKind::Delete, line, outcome);
    }

    Ok(report)
}
