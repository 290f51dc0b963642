//! In-memory services for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{ManagerService, TrackerService};
use crate::error::{Error, Result, ServiceError};
use crate::model::{Comment, Item, Project, RepoId, Workspace, keys, now_ms};

fn fail_if_set(failures: &HashMap<String, ServiceError>, op: &str) -> Result<()> {
    match failures.get(op) {
        Some(err) => Err(Error::Service(err.clone())),
        None => Ok(()),
    }
}

// ── Manager ───────────────────────────────────────────────────

#[derive(Default)]
pub struct ManagerState {
    pub workspaces: Vec<Workspace>,
    pub projects: Vec<Project>,
    /// Tasks by project id
    pub items: HashMap<String, Vec<Item>>,
    /// Stories by task id
    pub comments: HashMap<String, Vec<Comment>>,
    /// Operation name → error returned by every call
    pub failures: HashMap<String, ServiceError>,
    pub calls: Vec<String>,
    pub rate_limited_until: Option<i64>,
    next_id: u64,
}

#[derive(Default)]
pub struct FakeManager {
    pub state: Mutex<ManagerState>,
}

impl FakeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, project: Project, items: Vec<Item>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if !state.workspaces.iter().any(|w| w.id == project.workspace_id) {
                state.workspaces.push(Workspace {
                    id: project.workspace_id.clone(),
                    name: format!("ws-{}", project.workspace_id),
                });
            }
            state.items.insert(project.id.clone(), items);
            state.projects.push(project);
        }
        self
    }

    pub fn with_comments(self, task_id: &str, comments: Vec<Comment>) -> Self {
        self.state
            .lock()
            .unwrap()
            .comments
            .insert(task_id.to_string(), comments);
        self
    }

    pub fn fail(&self, op: &str, err: ServiceError) {
        self.state.lock().unwrap().failures.insert(op.to_string(), err);
    }

    pub fn items(&self, project_id: &str) -> Vec<Item> {
        self.state
            .lock()
            .unwrap()
            .items
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn comments(&self, task_id: &str) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn begin(&self, op: &str) -> Result<std::sync::MutexGuard<'_, ManagerState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op.to_string());
        fail_if_set(&state.failures, op)?;
        Ok(state)
    }
}

impl ManagerState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

impl ManagerService for FakeManager {
    async fn get_workspaces(&self) -> Result<Vec<Workspace>> {
        Ok(self.begin("get_workspaces")?.workspaces.clone())
    }

    async fn get_projects(&self, workspace: &Workspace, name_prefix: &str) -> Result<Vec<Project>> {
        let state = self.begin("get_projects")?;
        Ok(state
            .projects
            .iter()
            .filter(|p| p.workspace_id == workspace.id && p.name.starts_with(name_prefix))
            .map(|p| Project::new(&p.id, &p.name, &p.notes, &p.workspace_id))
            .collect())
    }

    async fn get_items(&self, project: &Project) -> Result<Vec<Item>> {
        let state = self.begin("get_items")?;
        Ok(state.items.get(&project.id).cloned().unwrap_or_default())
    }

    async fn create_item(&self, item: &Item, project: &Project) -> Result<Item> {
        let mut state = self.begin("create_item")?;
        let id = state.next_id("task-");
        let created = item.clone().with_manager_id(id).with_last_updated(now_ms());
        state
            .items
            .entry(project.id.clone())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_item(&self, old: &Item, new: &Item) -> Result<Item> {
        let id = old.require_manager_id()?.to_string();
        let mut state = self.begin("update_item")?;
        let stored = state
            .items
            .values_mut()
            .flatten()
            .find(|i| i.manager_id.as_deref() == Some(id.as_str()))
            .ok_or_else(|| Error::Service(ServiceError::from_status(404, "task not found")))?;

        stored.title.clone_from(&new.title);
        stored.body.clone_from(&new.body);
        stored.completed = new.completed;
        stored.fields.clone_from(&new.fields);
        stored.last_updated = now_ms();
        Ok(stored.clone())
    }

    async fn get_comments(&self, item: &Item) -> Result<Vec<Comment>> {
        let id = item.require_manager_id()?.to_string();
        let state = self.begin("get_comments")?;
        Ok(state.comments.get(&id).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, comment: &Comment, item: &Item) -> Result<Comment> {
        let task_id = item.require_manager_id()?.to_string();
        let mut state = self.begin("create_comment")?;
        let story_id = state.next_id("story-");

        let mut created = Comment::new(&comment.body);
        if comment.manager_id().is_some() {
            for key in [keys::AA_ID, keys::AA_COMMENTER] {
                if let Some(value) = comment.fields.get(key) {
                    created.fields.insert(key.to_string(), value.clone());
                }
            }
        } else if comment.tracker_id().is_some() {
            for key in [keys::GH_ID, keys::GH_COMMENTER] {
                if let Some(value) = comment.fields.get(key) {
                    created.fields.insert(key.to_string(), value.clone());
                }
            }
        }
        created.fields.entry(keys::AA_ID.into()).or_insert(story_id);
        created
            .fields
            .entry(keys::AA_COMMENTER.into())
            .or_insert_with(|| "Sync Bot".into());

        state
            .comments
            .entry(task_id)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    fn rate_limited_until(&self) -> Option<i64> {
        self.state.lock().unwrap().rate_limited_until
    }
}

// ── Tracker ───────────────────────────────────────────────────

#[derive(Default)]
pub struct TrackerState {
    pub issues: HashMap<RepoId, Vec<Item>>,
    /// Comments by (repository, issue number)
    pub comments: HashMap<(RepoId, String), Vec<Comment>>,
    pub failures: HashMap<String, ServiceError>,
    pub calls: Vec<String>,
    pub rate_limited_until: Option<i64>,
    next_number: u64,
    next_comment_id: u64,
}

#[derive(Default)]
pub struct FakeTracker {
    pub state: Mutex<TrackerState>,
}

fn issue_key(item: &Item) -> Result<(RepoId, String)> {
    Ok((
        item.require_repo_id()?,
        item.require_field(keys::GH_NUMBER)?.to_string(),
    ))
}

fn numbered_title(number: &str, title: &str) -> String {
    let marker = format!("#{number} ");
    if title.starts_with(&marker) {
        title.to_string()
    } else {
        format!("{marker}{title}")
    }
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed issues; numbers already present are kept.
    pub fn with_issues(self, repo: &RepoId, issues: Vec<Item>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for issue in &issues {
                if let Some(n) = issue.number().and_then(|n| n.parse::<u64>().ok()) {
                    state.next_number = state.next_number.max(n);
                }
            }
            state.issues.insert(repo.clone(), issues);
        }
        self
    }

    pub fn with_comments(self, repo: &RepoId, number: &str, comments: Vec<Comment>) -> Self {
        self.state
            .lock()
            .unwrap()
            .comments
            .insert((repo.clone(), number.to_string()), comments);
        self
    }

    pub fn fail(&self, op: &str, err: ServiceError) {
        self.state.lock().unwrap().failures.insert(op.to_string(), err);
    }

    /// Fail `get_comments` for one issue only.
    pub fn fail_comments_of(&self, number: &str, err: ServiceError) {
        self.fail(&format!("get_comments#{number}"), err);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn issues(&self, repo: &RepoId) -> Vec<Item> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(repo)
            .cloned()
            .unwrap_or_default()
    }

    pub fn comments(&self, repo: &RepoId, number: &str) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&(repo.clone(), number.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn begin(&self, op: &str) -> Result<std::sync::MutexGuard<'_, TrackerState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op.to_string());
        fail_if_set(&state.failures, op)?;
        Ok(state)
    }
}

fn tracker_copy(comment: &Comment, id: String, last_updated: i64) -> Comment {
    let mut copy = Comment::new(&comment.body).with_last_updated(last_updated);
    if comment.manager_id().is_some() && comment.tracker_id().is_none() {
        for key in [keys::AA_ID, keys::AA_COMMENTER] {
            if let Some(value) = comment.fields.get(key) {
                copy.fields.insert(key.to_string(), value.clone());
            }
        }
    }
    copy.with_field(keys::GH_ID, id)
        .with_field(keys::GH_COMMENTER, "octocat")
}

impl TrackerService for FakeTracker {
    async fn get_items(&self, repo: &RepoId) -> Result<Vec<Item>> {
        let state = self.begin("get_items")?;
        Ok(state.issues.get(repo).cloned().unwrap_or_default())
    }

    async fn create_item(&self, item: &Item, repo: &RepoId) -> Result<Item> {
        let mut state = self.begin("create_item")?;
        state.next_number += 1;
        let number = state.next_number.to_string();

        let mut created = Item::new(numbered_title(&number, &item.title))
            .with_body(&item.body)
            .with_last_updated(now_ms());
        created.fields.clone_from(&item.fields);
        created.fields.insert(keys::GH_NUMBER.into(), number);
        created.fields.insert(keys::GH_OWNER.into(), repo.owner.clone());
        created.fields.insert(keys::GH_REPO.into(), repo.repo.clone());

        state
            .issues
            .entry(repo.clone())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_item(&self, old: &Item, new: &Item) -> Result<Item> {
        let (repo, number) = issue_key(old)?;
        let mut state = self.begin("update_item")?;
        let stored = state
            .issues
            .get_mut(&repo)
            .and_then(|issues| issues.iter_mut().find(|i| i.number() == Some(number.as_str())))
            .ok_or_else(|| Error::Service(ServiceError::from_status(404, "Not Found")))?;

        stored.title = numbered_title(&number, &new.title);
        stored.body.clone_from(&new.body);
        stored.completed = new.completed;
        stored.fields.clone_from(&new.fields);
        stored.fields.insert(keys::GH_NUMBER.into(), number);
        stored.fields.insert(keys::GH_OWNER.into(), repo.owner.clone());
        stored.fields.insert(keys::GH_REPO.into(), repo.repo.clone());
        stored.last_updated = now_ms();
        Ok(stored.clone())
    }

    async fn get_comments(&self, item: &Item) -> Result<Vec<Comment>> {
        let key = issue_key(item)?;
        let state = self.begin("get_comments")?;
        fail_if_set(&state.failures, &format!("get_comments#{}", key.1))?;
        Ok(state.comments.get(&key).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, comment: &Comment, item: &Item) -> Result<Comment> {
        let key = issue_key(item)?;
        let mut state = self.begin("create_comment")?;
        state.next_comment_id += 1;
        let created = tracker_copy(comment, state.next_comment_id.to_string(), now_ms());
        state.comments.entry(key).or_default().push(created.clone());
        Ok(created)
    }

    async fn update_comment(&self, old: &Comment, new: &Comment, parent: &Item) -> Result<Comment> {
        let key = issue_key(parent)?;
        let id = old
            .tracker_id()
            .ok_or_else(|| Error::missing_field("comment", keys::GH_ID))?
            .to_string();
        let mut state = self.begin("update_comment")?;
        let stored = state
            .comments
            .get_mut(&key)
            .and_then(|cs| cs.iter_mut().find(|c| c.tracker_id() == Some(id.as_str())))
            .ok_or_else(|| Error::Service(ServiceError::from_status(404, "Not Found")))?;

        *stored = tracker_copy(new, id, now_ms());
        Ok(stored.clone())
    }

    async fn delete_comment(&self, comment: &Comment, parent: &Item) -> Result<()> {
        let key = issue_key(parent)?;
        let id = comment
            .tracker_id()
            .ok_or_else(|| Error::missing_field("comment", keys::GH_ID))?
            .to_string();
        let mut state = self.begin("delete_comment")?;
        if let Some(comments) = state.comments.get_mut(&key) {
            comments.retain(|c| c.tracker_id() != Some(id.as_str()));
        }
        Ok(())
    }

    fn rate_limited_until(&self) -> Option<i64> {
        self.state.lock().unwrap().rate_limited_until
    }
}
