//! Comment reconciliation for one task/issue pair.
//!
//! Asana stories can't be edited or deleted, so identity is carried in
//! text. A GitHub comment mirrored from Asana holds `aa.id`; an Asana
//! story mirrored from GitHub holds `gh.id`.

use std::collections::HashMap;

use super::ops::{CommentOps, Update};
use crate::error::{Error, Result};
use crate::model::{Comment, Recency, compare, keys};

/// Comments keyed by id, remembering arrival order for leftovers.
#[derive(Default)]
struct Index {
    slots: Vec<Option<Comment>>,
    by_id: HashMap<String, usize>,
}

impl Index {
    fn insert(&mut self, id: &str, comment: Comment) {
        if let Some(prev) = self.by_id.insert(id.to_string(), self.slots.len()) {
            tracing::debug!(id = %id, "duplicate comment id, keeping the later one");
            self.slots[prev] = None;
        }
        self.slots.push(Some(comment));
    }

    fn take(&mut self, id: &str) -> Option<Comment> {
        let idx = self.by_id.remove(id)?;
        self.slots.get_mut(idx).and_then(Option::take)
    }

    fn into_remaining(self) -> impl Iterator<Item = Comment> {
        self.slots.into_iter().flatten()
    }
}

/// Diff `manager_comments` against `tracker_comments` into `ops`.
///
/// `ops` must carry the task and the issue as parents.
///
/// # Errors
///
/// Returns [`Error::MissingField`] if a tracker comment has neither
/// `aa.id` nor `gh.id`.
pub fn diff_comments(
    mut manager_comments: Vec<Comment>,
    tracker_comments: Vec<Comment>,
    mut ops: CommentOps,
) -> Result<CommentOps> {
    let mut by_manager_id = Index::default();
    let mut by_tracker_id = Index::default();

    for comment in tracker_comments {
        if let Some(id) = comment.manager_id().map(str::to_string) {
            by_manager_id.insert(&id, comment);
        } else if let Some(id) = comment.tracker_id().map(str::to_string) {
            by_tracker_id.insert(&id, comment);
        } else {
            return Err(Error::missing_field(
                format!("comment on '{}'", ops.tracker.parent.title),
                keys::GH_ID,
            ));
        }
    }

    // Most recent first, so a duplicated story loses to the newest copy.
    manager_comments.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

    for manager_comment in manager_comments {
        let matched = if let Some(gh_id) = manager_comment.tracker_id() {
            match by_tracker_id.take(gh_id) {
                Some(found) => found,
                None => {
                    // Stories can't be deleted and a re-created copy would
                    // pile up next to this one on every pass.
                    ops.manager.del.push(manager_comment);
                    continue;
                }
            }
        } else if let Some(found) = manager_comment
            .manager_id()
            .and_then(|aa_id| by_manager_id.take(aa_id))
        {
            found
        } else {
            ops.tracker.create.push(manager_comment);
            continue;
        };

        match compare(&manager_comment, &matched) {
            Recency::FirstNewer => ops.tracker.update.push(Update {
                old: matched,
                new: manager_comment,
            }),
            Recency::SecondNewer => ops.manager.update.push(Update {
                old: manager_comment,
                new: matched,
            }),
            Recency::Same => {}
        }
    }

    // Mirrors whose story is gone are recreated in Asana, never deleted
    // from GitHub.
    ops.manager.create.extend(by_manager_id.into_remaining());
    ops.manager.create.extend(by_tracker_id.into_remaining());

    Ok(ops)
}
