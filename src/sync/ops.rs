//! Operation sets produced by the reconcilers.

use serde::Serialize;

use crate::model::{Comment, Item, Project, RepoId};

/// Replace `old` (as read from the target service) with the content of `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Update<T> {
    pub old: T,
    pub new: T,
}

/// Operations against one service.
///
/// `parent` is the container the operations apply to: the project or
/// repository for items, the owning item for comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideOps<T, P> {
    pub parent: P,
    pub create: Vec<T>,
    pub update: Vec<Update<T>>,
    pub del: Vec<T>,
}

impl<T, P> SideOps<T, P> {
    pub fn new(parent: P) -> Self {
        Self {
            parent,
            create: Vec::new(),
            update: Vec::new(),
            del: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.del.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A matched task/issue pair whose comments need reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildPair {
    pub manager: Item,
    pub tracker: Item,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ops<T, MP, TP> {
    pub manager: SideOps<T, MP>,
    pub tracker: SideOps<T, TP>,
    pub to_diff_children: Vec<ChildPair>,
}

impl<T, MP, TP> Ops<T, MP, TP> {
    pub fn new(manager_parent: MP, tracker_parent: TP) -> Self {
        Self {
            manager: SideOps::new(manager_parent),
            tracker: SideOps::new(tracker_parent),
            to_diff_children: Vec::new(),
        }
    }

    /// True when neither service needs a write. Child pairs don't count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manager.is_empty() && self.tracker.is_empty()
    }
}

pub type ItemOps = Ops<Item, Project, RepoId>;
pub type CommentOps = Ops<Comment, Item, Item>;
