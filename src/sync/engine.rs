//! Sync orchestration.
//!
//! One pass lists every Asana project whose name starts with the keyword
//! prefix, pairs it with the GitHub repository named in its notes, and for
//! each pair: reconciles items, applies the item operations, then
//! reconciles and applies comments for every task/issue pair that changed
//! since its watermark.
//!
//! Projects run concurrently, and so do comment pairs within a project,
//! each bounded by `concurrency`. A failing project or pair never cancels
//! its siblings.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::cache::SyncCache;
use super::comment::diff_comments;
use super::exec::{ExecReport, exec_comment_ops, exec_item_ops};
use super::item::diff_items;
use super::log::LogContext;
use super::ops::{ChildPair, ItemOps, Ops};
use crate::config::Config;
use crate::error::{Error, Result, ServiceError};
use crate::fields::FieldCodec;
use crate::model::{Comment, Item, Project, RepoId, now_ms};
use crate::service::{ManagerService, TrackerService};

/// Settings the orchestrator needs from [`Config`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub project_prefix: String,
    pub manager_keyword: String,
    pub tracker_keyword: String,
    pub last_sync_safety: i64,
    pub concurrency: usize,
}

impl SyncSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            project_prefix: config.project_prefix(),
            manager_keyword: config.asana.keyword.clone(),
            tracker_keyword: config.github.keyword.clone(),
            last_sync_safety: config.last_sync_safety,
            concurrency: config.concurrency.max(1),
        }
    }
}

/// What happened to one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    pub project: String,
    pub repo: RepoId,
    pub log: Vec<String>,
    pub errors: Vec<String>,
    pub rate_limited: bool,
    /// Pairs whose watermark was advanced
    pub pairs_synced: usize,
    pub item_ops: ItemOps,
    pub items: ExecReport<Item>,
    pub comments: Vec<ExecReport<Comment>>,
}

impl ProjectReport {
    fn record_error(&mut self, context: &str, error: &Error) {
        if error.is_rate_limited() {
            self.rate_limited = true;
        } else {
            self.errors.push(format!("{context}: {error}"));
        }
    }
}

/// Result of a full pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// One line per attempted operation
    pub log: Vec<String>,
    /// Failures outside individual operations
    pub errors: Vec<String>,
    /// A rate limit was hit somewhere during the pass
    pub rate_limited: bool,
    /// Latest reset time reported by either service (ms since epoch)
    pub rate_limit_reached_until: Option<i64>,
    pub projects: Vec<ProjectReport>,
}

impl SyncSummary {
    fn record_error(&mut self, context: &str, error: &Error) {
        if error.is_rate_limited() {
            tracing::debug!(context, "rate limited");
            self.rate_limited = true;
        } else {
            tracing::error!(context, error = %error, "sync error");
            self.errors.push(format!("{context}: {error}"));
        }
    }

    /// Nothing was done and nothing went wrong.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.log.is_empty() && self.errors.is_empty() && !self.rate_limited
    }
}

/// Drives sync passes between a manager and a tracker.
pub struct Syncer<M, T> {
    manager: Arc<M>,
    tracker: Arc<T>,
    cache: Arc<SyncCache>,
    codec: FieldCodec,
    settings: Arc<SyncSettings>,
}

impl<M, T> Clone for Syncer<M, T> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            tracker: Arc::clone(&self.tracker),
            cache: Arc::clone(&self.cache),
            codec: self.codec.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Spawn `jobs` with at most `limit` running at once.
fn spawn_bounded<F, R>(limit: usize, jobs: Vec<F>) -> Vec<JoinHandle<Result<R>>>
where
    F: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit));
    jobs.into_iter()
        .map(|job| {
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("task queue closed: {e}")))?;
                job.await
            })
        })
        .collect()
}

impl<M, T> Syncer<M, T>
where
    M: ManagerService + 'static,
    T: TrackerService + 'static,
{
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the field settings are invalid.
    pub fn new(manager: M, tracker: T, cache: SyncCache, config: &Config) -> Result<Self> {
        Ok(Self {
            manager: Arc::new(manager),
            tracker: Arc::new(tracker),
            cache: Arc::new(cache),
            codec: config.codec()?,
            settings: Arc::new(SyncSettings::from_config(config)),
        })
    }

    #[must_use]
    pub fn cache(&self) -> &SyncCache {
        &self.cache
    }

    #[must_use]
    pub fn manager(&self) -> &M {
        &self.manager
    }

    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Run one pass over every matching project and persist the cache.
    pub async fn sync(&self) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let workspaces = match self.manager.get_workspaces().await {
            Ok(workspaces) => workspaces,
            Err(e) => {
                summary.record_error("list workspaces", &e);
                return self.finish(summary);
            }
        };

        let mut projects = Vec::new();
        for workspace in &workspaces {
            match self
                .manager
                .get_projects(workspace, &self.settings.project_prefix)
                .await
            {
                Ok(found) => projects.extend(found),
                Err(e) => {
                    summary.record_error(&format!("list projects in '{}'", workspace.name), &e);
                }
            }
        }

        tracing::info!(projects = projects.len(), "syncing projects");

        let names: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();
        let jobs = projects
            .into_iter()
            .map(|project| {
                let this = self.clone();
                async move { this.sync_project(project).await }
            })
            .collect();
        let handles = spawn_bounded(self.settings.concurrency, jobs);

        for (name, handle) in names.into_iter().zip(handles) {
            match handle.await {
                Ok(Ok(Some(report))) => {
                    summary.log.extend(report.log.iter().cloned());
                    summary.errors.extend(report.errors.iter().cloned());
                    summary.rate_limited |= report.rate_limited;
                    summary.projects.push(report);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => summary.record_error(&name, &e),
                Err(e) => summary
                    .errors
                    .push(format!("{name}: sync task failed: {e}")),
            }
        }

        self.finish(summary)
    }

    fn finish(&self, mut summary: SyncSummary) -> SyncSummary {
        if let Err(e) = self.cache.save() {
            summary.record_error("save sync cache", &e);
        }
        summary.rate_limit_reached_until = self
            .manager
            .rate_limited_until()
            .max(self.tracker.rate_limited_until());
        summary.rate_limited |= summary.rate_limit_reached_until.is_some();
        summary
    }

    /// Sync one project with its repository.
    ///
    /// Returns `Ok(None)` when the project's notes don't name a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if either item list can't be fetched or an item
    /// lacks the identity an operation needs. Failures of individual
    /// operations and comment pairs are recorded in the report instead.
    pub async fn sync_project(&self, mut project: Project) -> Result<Option<ProjectReport>> {
        let (_, fields) = self.codec.extract(Some(&project.notes));
        project.fields = fields;

        let Some(repo) = project.repo_id() else {
            tracing::warn!(project = %project.name, "project notes don't name gh.owner and gh.repo, skipping");
            return Ok(None);
        };
        tracing::debug!(project = %project.name, repo = %repo, "syncing project");

        let (manager_items, tracker_items) = tokio::join!(
            self.manager.get_items(&project),
            self.tracker.get_items(&repo)
        );
        let ops = diff_items(
            manager_items?,
            tracker_items?,
            Ops::new(project.clone(), repo.clone()),
            &self.cache,
        )?;

        let log = LogContext::new(
            &self.settings.manager_keyword,
            &self.settings.tracker_keyword,
            &project.name,
        );
        let items = exec_item_ops(&*self.manager, &*self.tracker, &ops, &log).await?;
        let rate_limited = items.failures().any(ServiceError::is_rate_limited);

        let mut report = ProjectReport {
            project: project.name.clone(),
            repo,
            log: items.log_lines(),
            errors: Vec::new(),
            rate_limited,
            pairs_synced: 0,
            item_ops: ops.clone(),
            items,
            comments: Vec::new(),
        };

        let mut pairs = Vec::with_capacity(ops.to_diff_children.len());
        let mut jobs = Vec::with_capacity(ops.to_diff_children.len());
        for pair in ops.to_diff_children {
            pairs.push((pair.manager.require_manager_id()?.to_string(), pair.manager.title.clone()));
            let manager = Arc::clone(&self.manager);
            let tracker = Arc::clone(&self.tracker);
            let log = log.clone();
            jobs.push(async move { sync_pair(&*manager, &*tracker, pair, &log).await });
        }
        let handles = spawn_bounded(self.settings.concurrency, jobs);

        for ((task_id, title), handle) in pairs.into_iter().zip(handles) {
            match handle.await {
                Ok(Ok(comments)) => {
                    report.log.extend(comments.log_lines());
                    if comments.has_blocking_error() {
                        report.rate_limited |= comments.failures().any(ServiceError::is_rate_limited);
                    } else {
                        let watermark = (now_ms() - self.settings.last_sync_safety).max(0);
                        self.cache.set_last_sync(&task_id, watermark)?;
                        report.pairs_synced += 1;
                    }
                    report.comments.push(comments);
                }
                Ok(Err(e)) => report.record_error(&format!("comments of '{title}'"), &e),
                Err(e) => report
                    .errors
                    .push(format!("comments of '{title}': sync task failed: {e}")),
            }
        }

        Ok(Some(report))
    }
}

/// Reconcile and apply the comments of one task/issue pair.
async fn sync_pair<M, T>(
    manager: &M,
    tracker: &T,
    pair: ChildPair,
    log: &LogContext,
) -> Result<ExecReport<Comment>>
where
    M: ManagerService,
    T: TrackerService,
{
    let (manager_comments, tracker_comments) = tokio::join!(
        manager.get_comments(&pair.manager),
        tracker.get_comments(&pair.tracker)
    );
    let ops = diff_comments(
        manager_comments?,
        tracker_comments?,
        Ops::new(pair.manager, pair.tracker),
    )?;
    exec_comment_ops(manager, tracker, &ops, log).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::keys;
    use crate::service::fake::{FakeManager, FakeTracker};
    use tempfile::TempDir;

    const NOTES: &str = "Web frontend\n\n#gh.owner acme\n#gh.repo web";

    fn repo() -> RepoId {
        RepoId::new("acme", "web")
    }

    fn project() -> Project {
        Project::new("p1", "#cc Web", NOTES, "ws1")
    }

    fn linked_task(id: &str, number: &str, title: &str, updated: i64) -> Item {
        Item::new(format!("#{number} {title}"))
            .with_manager_id(id)
            .with_last_updated(updated)
            .with_field(keys::GH_NUMBER, number)
            .with_field(keys::GH_OWNER, "acme")
            .with_field(keys::GH_REPO, "web")
    }

    fn linked_issue(number: &str, title: &str, updated: i64) -> Item {
        Item::new(format!("#{number} {title}"))
            .with_last_updated(updated)
            .with_field(keys::GH_NUMBER, number)
            .with_field(keys::GH_OWNER, "acme")
            .with_field(keys::GH_REPO, "web")
    }

    fn syncer(manager: FakeManager, tracker: FakeTracker) -> Syncer<FakeManager, FakeTracker> {
        Syncer::new(manager, tracker, SyncCache::in_memory(), &Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_new_task_becomes_issue() {
        let task = Item::new("Fix login").with_manager_id("t1").with_body("Steps");
        let s = syncer(
            FakeManager::new().with_project(project(), vec![task]),
            FakeTracker::new(),
        );

        let summary = s.sync().await;

        assert!(summary.errors.is_empty(), "{:?}", summary.errors);
        assert_eq!(
            summary.log,
            vec!["I.gh.C acme/web: Fix login", "I.aa.U #cc Web: #1 Fix login"]
        );
        let issues = s.tracker().issues(&repo());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].body, "Steps");
        assert_eq!(s.manager().items("p1")[0].number(), Some("1"));
    }

    #[tokio::test]
    async fn test_second_pass_does_nothing() {
        let task = Item::new("Fix login").with_manager_id("t1");
        let s = syncer(
            FakeManager::new().with_project(project(), vec![task]),
            FakeTracker::new(),
        );

        s.sync().await;
        let second = s.sync().await;

        assert!(second.is_quiet(), "{:?}", second.log);
        assert!(s.cache().get_last_sync("t1") > 0);
    }

    #[tokio::test]
    async fn test_newer_task_updates_issue() {
        let s = syncer(
            FakeManager::new().with_project(
                project(),
                vec![linked_task("t1", "3", "Renamed", 2_000).with_body("new body")],
            ),
            FakeTracker::new().with_issues(&repo(), vec![linked_issue("3", "Old name", 1_000)]),
        );

        let summary = s.sync().await;

        assert_eq!(summary.log, vec!["I.gh.U acme/web: #3 Renamed"]);
        let issue = &s.tracker().issues(&repo())[0];
        assert_eq!(issue.title, "#3 Renamed");
        assert_eq!(issue.body, "new body");
    }

    #[tokio::test]
    async fn test_issue_only_in_tracker_creates_task() {
        let s = syncer(
            FakeManager::new().with_project(project(), vec![]),
            FakeTracker::new().with_issues(&repo(), vec![linked_issue("8", "From GitHub", 1)]),
        );

        let summary = s.sync().await;

        assert_eq!(summary.log, vec!["I.aa.C #cc Web: #8 From GitHub"]);
        assert_eq!(s.manager().items("p1")[0].number(), Some("8"));
    }

    #[tokio::test]
    async fn test_new_story_is_mirrored_and_watermark_advances() {
        let story = Comment::new("Looks good")
            .with_last_updated(5)
            .with_field(keys::AA_ID, "s1")
            .with_field(keys::AA_COMMENTER, "Ann");
        let s = syncer(
            FakeManager::new()
                .with_project(project(), vec![linked_task("t1", "3", "Task", 10)])
                .with_comments("t1", vec![story]),
            FakeTracker::new().with_issues(&repo(), vec![linked_issue("3", "Task", 10)]),
        );

        let summary = s.sync().await;

        assert_eq!(summary.log, vec!["C.gh.C acme/web: #3 Task: Looks good"]);
        let mirrored = s.tracker().comments(&repo(), "3");
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].manager_id(), Some("s1"));
        assert_eq!(summary.projects[0].pairs_synced, 1);
        assert!(s.cache().get_last_sync("t1") > 0);
    }

    #[tokio::test]
    async fn test_unchanged_pair_is_not_rediffed() {
        let s = syncer(
            FakeManager::new().with_project(project(), vec![linked_task("t1", "3", "Task", 10)]),
            FakeTracker::new().with_issues(&repo(), vec![linked_issue("3", "Task", 10)]),
        );
        s.cache().set_last_sync("t1", 100).unwrap();

        let summary = s.sync().await;

        assert!(summary.is_quiet());
        assert!(!s.manager().calls().contains(&"get_comments".to_string()));
        assert_eq!(s.cache().get_last_sync("t1"), 100);
    }

    #[tokio::test]
    async fn test_failed_comment_keeps_watermark() {
        let story = Comment::new("hello").with_field(keys::AA_ID, "s1");
        let tracker = FakeTracker::new().with_issues(&repo(), vec![linked_issue("3", "Task", 10)]);
        tracker.fail("create_comment", ServiceError::from_status(500, "Server Error"));
        let s = syncer(
            FakeManager::new()
                .with_project(project(), vec![linked_task("t1", "3", "Task", 10)])
                .with_comments("t1", vec![story]),
            tracker,
        );

        let summary = s.sync().await;

        assert_eq!(
            summary.log,
            vec!["ERROR - C.gh.C acme/web: #3 Task: hello. CAUSE: Server Error"]
        );
        assert_eq!(s.cache().get_last_sync("t1"), 0);
        assert_eq!(summary.projects[0].pairs_synced, 0);
    }

    #[tokio::test]
    async fn test_unsupported_does_not_block_watermark() {
        // Story copied from a GitHub comment that was edited there since.
        let story = Comment::new("v1")
            .with_last_updated(1)
            .with_field(keys::GH_ID, "50")
            .with_field(keys::AA_ID, "s1");
        let edited = Comment::new("v2")
            .with_last_updated(9)
            .with_field(keys::GH_ID, "50")
            .with_field(keys::GH_COMMENTER, "octocat");
        let s = syncer(
            FakeManager::new()
                .with_project(project(), vec![linked_task("t1", "3", "Task", 10)])
                .with_comments("t1", vec![story]),
            FakeTracker::new()
                .with_issues(&repo(), vec![linked_issue("3", "Task", 10)])
                .with_comments(&repo(), "3", vec![edited]),
        );

        let summary = s.sync().await;

        assert_eq!(summary.log, vec!["UNSUPPORTED - C.aa.U #cc Web: #3 Task: v2"]);
        assert!(s.cache().get_last_sync("t1") > 0);
    }

    #[tokio::test]
    async fn test_task_pointing_at_missing_issue_is_flagged() {
        let s = syncer(
            FakeManager::new().with_project(project(), vec![linked_task("t1", "404", "Lost", 1)]),
            FakeTracker::new(),
        );

        let summary = s.sync().await;
        assert_eq!(summary.log, vec!["UNSUPPORTED - I.aa.D #cc Web: #404 Lost"]);
    }

    #[tokio::test]
    async fn test_project_without_repo_is_skipped() {
        let bare = Project::new("p2", "#cc Notes only", "no fields here", "ws1");
        let s = syncer(
            FakeManager::new().with_project(bare, vec![Item::new("x").with_manager_id("t")]),
            FakeTracker::new(),
        );

        let summary = s.sync().await;

        assert!(summary.is_quiet());
        assert!(summary.projects.is_empty());
        assert!(s.tracker().calls().is_empty());
    }

    #[tokio::test]
    async fn test_projects_outside_prefix_are_ignored() {
        let other = Project::new("p3", "Personal", NOTES, "ws1");
        let s = syncer(
            FakeManager::new().with_project(other, vec![Item::new("x").with_manager_id("t")]),
            FakeTracker::new(),
        );

        s.sync().await;
        assert!(s.tracker().calls().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_is_swallowed() {
        let manager = FakeManager::new().with_project(project(), vec![]);
        manager.fail("get_items", ServiceError::rate_limited("slow down"));
        let s = syncer(manager, FakeTracker::new());

        let summary = s.sync().await;

        assert!(summary.errors.is_empty());
        assert!(summary.log.is_empty());
        assert!(summary.rate_limited);
    }

    #[tokio::test]
    async fn test_workspace_listing_failure_is_global_error() {
        let manager = FakeManager::new();
        manager.fail("get_workspaces", ServiceError::from_status(401, "Not Authorized"));
        let s = syncer(manager, FakeTracker::new());

        let summary = s.sync().await;
        assert_eq!(
            summary.errors,
            vec!["list workspaces: Service error: Not Authorized"]
        );
    }

    #[tokio::test]
    async fn test_failing_project_does_not_stop_others() {
        let broken = Project::new("p9", "#cc Broken", "#gh.owner acme\n#gh.repo gone", "ws1");
        let tracker = FakeTracker::new();
        let s = syncer(
            FakeManager::new()
                .with_project(broken, vec![Item::new("x").with_manager_id("t9")])
                .with_project(project(), vec![Item::new("Fix login").with_manager_id("t1")]),
            tracker,
        );
        s.tracker()
            .state
            .lock()
            .unwrap()
            .issues
            .insert(RepoId::new("acme", "gone"), vec![Item::new("no number")]);

        let summary = s.sync().await;

        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("#cc Broken:"));
        assert!(summary.log.contains(&"I.gh.C acme/web: Fix login".to_string()));
    }

    #[tokio::test]
    async fn test_failed_close_does_not_duplicate_issue() {
        let task = Item::new("Done").with_manager_id("t1").with_completed(true);
        let s = syncer(
            FakeManager::new().with_project(project(), vec![task]),
            FakeTracker::new(),
        );
        s.tracker()
            .fail("update_item", ServiceError::from_status(502, "Bad Gateway"));

        let first = s.sync().await;
        assert_eq!(
            first.log,
            vec![
                "I.gh.C acme/web: Done",
                "ERROR - I.gh.U acme/web: #1 Done. CAUSE: Bad Gateway",
                "I.aa.U #cc Web: #1 Done",
            ]
        );
        assert_eq!(s.manager().items("p1")[0].number(), Some("1"));

        s.tracker().clear_failures();
        s.sync().await;

        assert_eq!(s.tracker().issues(&repo()).len(), 1);
        assert_eq!(s.manager().items("p1").len(), 1);
    }

    #[tokio::test]
    async fn test_failing_pair_does_not_stop_siblings() {
        let tracker = FakeTracker::new().with_issues(
            &repo(),
            vec![linked_issue("3", "Task", 10), linked_issue("4", "Other", 10)],
        );
        tracker.fail_comments_of("3", ServiceError::from_status(500, "Server Error"));
        let s = syncer(
            FakeManager::new().with_project(
                project(),
                vec![
                    linked_task("t1", "3", "Task", 10),
                    linked_task("t2", "4", "Other", 10),
                ],
            ),
            tracker,
        );

        let summary = s.sync().await;

        assert_eq!(
            summary.errors,
            vec!["comments of '#3 Task': Service error: Server Error"]
        );
        assert_eq!(s.cache().get_last_sync("t1"), 0);
        assert!(s.cache().get_last_sync("t2") > 0);
        assert_eq!(summary.projects[0].pairs_synced, 1);
    }

    #[tokio::test]
    async fn test_pair_missing_repo_fields_is_isolated() {
        // Linked by number only, so the issue can't be addressed for comments.
        let unaddressable = Item::new("#4 Other")
            .with_last_updated(10)
            .with_field(keys::GH_NUMBER, "4");
        let s = syncer(
            FakeManager::new().with_project(
                project(),
                vec![
                    linked_task("t1", "3", "Task", 10),
                    unaddressable.clone().with_manager_id("t2"),
                ],
            ),
            FakeTracker::new()
                .with_issues(&repo(), vec![linked_issue("3", "Task", 10), unaddressable]),
        );

        let summary = s.sync().await;

        assert_eq!(summary.errors.len(), 1, "{:?}", summary.errors);
        assert!(summary.errors[0].starts_with("comments of '#4 Other':"));
        assert!(summary.errors[0].contains("gh.owner"));
        assert_eq!(s.cache().get_last_sync("t2"), 0);
        assert!(s.cache().get_last_sync("t1") > 0);
    }

    #[tokio::test]
    async fn test_dangling_story_is_never_duplicated() {
        // Copied from a GitHub comment that has since been deleted there.
        let stale = Comment::new("copied")
            .with_last_updated(5)
            .with_field(keys::GH_ID, "77")
            .with_field(keys::AA_ID, "s1");
        let s = syncer(
            FakeManager::new()
                .with_project(project(), vec![linked_task("t1", "3", "Task", 10)])
                .with_comments("t1", vec![stale]),
            FakeTracker::new().with_issues(&repo(), vec![linked_issue("3", "Task", 10)]),
        );

        for _ in 0..2 {
            s.cache().clear();
            let summary = s.sync().await;
            assert_eq!(
                summary.log,
                vec!["UNSUPPORTED - C.aa.D #cc Web: #3 Task: copied"]
            );
        }

        assert_eq!(s.manager().comments("t1").len(), 1);
        assert!(s.tracker().comments(&repo(), "3").is_empty());
        assert!(!s.manager().calls().contains(&"create_comment".to_string()));
    }

    #[tokio::test]
    async fn test_cache_is_saved_after_pass() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        let s = Syncer::new(
            FakeManager::new().with_project(project(), vec![linked_task("t1", "3", "Task", 10)]),
            FakeTracker::new().with_issues(&repo(), vec![linked_issue("3", "Task", 10)]),
            SyncCache::load(&path).unwrap(),
            &Config::default(),
        )
        .unwrap();

        s.sync().await;

        let reloaded = SyncCache::load(&path).unwrap();
        assert!(reloaded.get_last_sync("t1") > 0);
    }
}
