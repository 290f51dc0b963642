//! Item reconciliation: Asana tasks against GitHub issues.
//!
//! Tasks and issues are paired by `gh.number`. Tasks without a number are
//! new and get an issue; issues without a task get a task. Matched pairs
//! are compared and the older side is updated. Pairs touched since the
//! last watermark are queued for comment reconciliation.

use std::collections::HashMap;

use super::cache::SyncCache;
use super::ops::{ChildPair, ItemOps, Update};
use crate::error::{Error, Result};
use crate::model::{Item, Recency, compare, keys};

/// Diff `manager_items` against `tracker_items` into `ops`.
///
/// `ops` must carry the project and repository as parents. Tracker items
/// are assumed to come from that one repository.
///
/// # Errors
///
/// Returns [`Error::MissingField`] if a tracker item has no issue number
/// or a matched task has no manager id.
pub fn diff_items(
    manager_items: Vec<Item>,
    tracker_items: Vec<Item>,
    mut ops: ItemOps,
    cache: &SyncCache,
) -> Result<ItemOps> {
    let repo = ops.tracker.parent.clone();

    let mut slots: Vec<Option<Item>> = Vec::with_capacity(tracker_items.len());
    let mut by_number: HashMap<String, usize> = HashMap::with_capacity(tracker_items.len());
    for item in tracker_items {
        let number = item.require_field(keys::GH_NUMBER)?.to_string();
        if let Some(prev) = by_number.insert(number.clone(), slots.len()) {
            tracing::warn!(repo = %repo, number = %number, "duplicate issue number, keeping the later one");
            slots[prev] = None;
        }
        slots.push(Some(item));
    }

    for manager_item in manager_items {
        let Some(number) = manager_item.number().map(str::to_string) else {
            let mut new_item = manager_item;
            new_item.fields.insert(keys::GH_OWNER.into(), repo.owner.clone());
            new_item.fields.insert(keys::GH_REPO.into(), repo.repo.clone());
            ops.tracker.create.push(new_item);
            continue;
        };

        let owner_differs = manager_item
            .field(keys::GH_OWNER)
            .is_some_and(|owner| owner != repo.owner);
        let repo_differs = manager_item
            .field(keys::GH_REPO)
            .is_some_and(|name| name != repo.repo);
        if owner_differs || repo_differs {
            tracing::warn!(
                task = %manager_item.title,
                number = %number,
                expected = %repo,
                "skipping task linked to a different repository"
            );
            continue;
        }

        let tracker_item = by_number
            .remove(&number)
            .and_then(|idx| slots.get_mut(idx).and_then(Option::take));

        let Some(tracker_item) = tracker_item else {
            tracing::warn!(
                task = %manager_item.title,
                number = %number,
                repo = %repo,
                "task references an issue that does not exist"
            );
            ops.manager.del.push(manager_item);
            continue;
        };

        let last_sync = cache.get_last_sync(manager_item.require_manager_id()?);
        let children_changed =
            manager_item.last_updated > last_sync || tracker_item.last_updated > last_sync;

        match compare(&manager_item, &tracker_item) {
            Recency::FirstNewer => ops.tracker.update.push(Update {
                old: tracker_item.clone(),
                new: manager_item.clone(),
            }),
            Recency::SecondNewer => ops.manager.update.push(Update {
                old: manager_item.clone(),
                new: tracker_item.clone(),
            }),
            Recency::Same => {}
        }

        if children_changed {
            ops.to_diff_children.push(ChildPair {
                manager: manager_item,
                tracker: tracker_item,
            });
        }
    }

    ops.manager.create.extend(slots.into_iter().flatten());

    Ok(ops)
}
