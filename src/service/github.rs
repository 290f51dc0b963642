//! GitHub REST client (the tracker service).
//!
//! Issues map to items and issue comments map to comments. Issue metadata
//! (number, assignee, labels, milestone) becomes `gh.*` fields; any other
//! field travels in the issue body as field lines.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::rate_limit::{RateLimitGate, parse_retry_after};
use super::{TrackerService, error_message, parse_timestamp, transport_error};
use crate::config::{Config, GitHubConfig};
use crate::error::{Error, Result, ServiceError};
use crate::fields::{FieldCodec, Fields};
use crate::model::{Comment, Item, RepoId, keys};

const PER_PAGE: usize = 100;

/// `User-Agent` sent with every request; GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("tracksync/", env!("CARGO_PKG_VERSION"));

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    html_url: String,
    updated_at: String,
    #[serde(default)]
    assignee: Option<GhUser>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    #[serde(default)]
    milestone: Option<GhMilestone>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhMilestone {
    title: String,
}

#[derive(Debug, Deserialize)]
struct GhComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    updated_at: String,
    #[serde(default)]
    user: Option<GhUser>,
}

#[derive(Debug, Serialize, PartialEq)]
struct IssuePayload<'a> {
    title: &'a str,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    /// `Some(None)` clears the assignee
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
struct CommentPayload {
    body: String,
}

// ── Client ────────────────────────────────────────────────────

/// GitHub API client.
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    settings: GitHubConfig,
    codec: FieldCodec,
    gate: RateLimitGate,
}

impl GitHubClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid field settings or if the HTTP
    /// client can't be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build GitHub HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.github.base_url.trim_end_matches('/').to_string(),
            settings: config.github.clone(),
            codec: config.codec()?,
            gate: RateLimitGate::new(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')));

        match (
            &self.settings.personal_access_token,
            &self.settings.user_name,
        ) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, Some(user)) => builder.basic_auth(user, self.settings.password.as_ref()),
            (None, None) => builder,
        }
    }

    /// Send a request and return the successful response.
    async fn execute(&self, request: RequestBuilder, context: &str) -> Result<reqwest::Response> {
        self.gate.check()?;

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(context, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if let Some(until) = rate_limit_reset(status, response.headers()) {
            self.gate.trip_until(until);
            return Err(ServiceError::rate_limited(format!("{context}: API rate limit reached")).into());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::from_status(status.as_u16(), format!("{context}: {}", error_message(&body))).into())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, context: &str) -> Result<T> {
        let response = self.execute(request, context).await?;
        response.json::<T>().await.map_err(|e| {
            ServiceError::transport(format!("{context}: failed to parse response: {e}")).into()
        })
    }

    /// GET every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let per_page = PER_PAGE.to_string();

        for page in 1.. {
            let page = page.to_string();
            let request = self
                .request(reqwest::Method::GET, path)
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page.as_str())]);
            let batch: Vec<T> = self.send(request, context).await?;
            let done = batch.len() < PER_PAGE;
            results.extend(batch);
            if done {
                break;
            }
        }

        Ok(results)
    }

    fn issue_path(item: &Item) -> Result<String> {
        let repo = item.require_repo_id()?;
        let number = item.require_field(keys::GH_NUMBER)?;
        Ok(format!("repos/{}/{}/issues/{number}", repo.owner, repo.repo))
    }

    fn comment_path(comment: &Comment, parent: &Item) -> Result<String> {
        let repo = parent.require_repo_id()?;
        let id = comment
            .tracker_id()
            .ok_or_else(|| Error::missing_field(format!("comment on '{}'", parent.title), keys::GH_ID))?;
        Ok(format!("repos/{}/{}/issues/comments/{id}", repo.owner, repo.repo))
    }

    // ── Mapping ───────────────────────────────────────────────

    fn issue_to_item(&self, issue: GhIssue, repo: &RepoId) -> Result<Item> {
        let title = format!(
            "{}{} {}",
            self.settings.issue_number_prefix,
            issue.number,
            issue.title.trim()
        );
        let mut item = Item::new(title)
            .with_completed(issue.state == "closed")
            .with_last_updated(parse_timestamp(&issue.updated_at)?);
        item.body = self.codec.extract_into(issue.body.as_deref(), &mut item.fields);

        let assignee = issue
            .assignee
            .map_or_else(|| self.settings.unassigned_user.clone(), |u| u.login);
        let labels = issue
            .labels
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let fields = &mut item.fields;
        fields.insert(keys::GH_URL.into(), issue.html_url);
        fields.insert(keys::GH_ASSIGNEE.into(), assignee);
        fields.insert(keys::GH_NUMBER.into(), issue.number.to_string());
        fields.insert(keys::GH_OWNER.into(), repo.owner.clone());
        fields.insert(keys::GH_REPO.into(), repo.repo.clone());
        fields.insert(keys::GH_LABELS.into(), labels);
        if let Some(milestone) = issue.milestone {
            fields.insert(keys::GH_MILESTONE.into(), milestone.title);
        }
        Ok(item)
    }

    fn issue_payload<'a>(&self, item: &'a Item) -> IssuePayload<'a> {
        let mut title = item.title.as_str();
        if let Some(number) = item.number() {
            let marker = format!("{}{number} ", self.settings.issue_number_prefix);
            if let Some(rest) = title.strip_prefix(&marker) {
                title = rest;
            }
        }

        // Issue metadata has its own API fields; everything else rides in the body.
        let extra: Fields = item
            .fields
            .iter()
            .filter(|(key, _)| !key.starts_with("gh."))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let assignee = item.fields.get(keys::GH_ASSIGNEE).map(|login| {
            Some(login.as_str()).filter(|l| !l.is_empty() && *l != self.settings.unassigned_user)
        });

        let labels = item.field(keys::GH_LABELS).map(|labels| {
            labels
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect()
        });

        IssuePayload {
            title,
            body: self.codec.embed(&item.body, &extra),
            state: Some(if item.completed { "closed" } else { "open" }),
            assignee,
            labels,
        }
    }

    fn to_comment(&self, gh: GhComment) -> Result<Comment> {
        let mut comment = Comment::default().with_last_updated(parse_timestamp(&gh.updated_at)?);
        comment.body = self.codec.extract_into(gh.body.as_deref(), &mut comment.fields);
        comment.fields.insert(keys::GH_ID.into(), gh.id.to_string());
        comment.fields.insert(
            keys::GH_COMMENTER.into(),
            gh.user.map(|u| u.login).unwrap_or_default(),
        );
        Ok(comment)
    }

    /// Comment text for GitHub. Only a comment that started in Asana
    /// carries its Asana identity; a GitHub comment copied back is plain.
    fn comment_body(&self, comment: &Comment) -> String {
        if comment.manager_id().is_none() || comment.tracker_id().is_some() {
            return comment.body.clone();
        }

        let identity: Fields = [keys::AA_COMMENTER, keys::AA_ID]
            .iter()
            .map(|key| {
                let value = comment.fields.get(*key).cloned().unwrap_or_default();
                ((*key).to_string(), value)
            })
            .collect();
        self.codec.embed(&comment.body, &identity)
    }
}

/// Reset time (ms) when a response means the rate limit was hit.
///
/// GitHub answers 429 for secondary limits and 403 with
/// `x-ratelimit-remaining: 0` for the primary one.
fn rate_limit_reset(status: StatusCode, headers: &HeaderMap) -> Option<i64> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let exhausted = header("x-ratelimit-remaining").is_some_and(|v| v.trim() == "0");
    if status != StatusCode::TOO_MANY_REQUESTS
        && !(status == StatusCode::FORBIDDEN && exhausted)
    {
        return None;
    }

    if let Some(reset) = header("x-ratelimit-reset").and_then(|v| v.trim().parse::<i64>().ok()) {
        return Some(reset.saturating_mul(1000));
    }

    let wait = parse_retry_after(header("retry-after"));
    Some(crate::model::now_ms().saturating_add(i64::try_from(wait.as_millis()).unwrap_or(i64::MAX)))
}

fn excluded(issue: &GhIssue, exclude_labels: &[String]) -> bool {
    issue
        .labels
        .iter()
        .any(|label| exclude_labels.contains(&label.name))
}

impl TrackerService for GitHubClient {
    async fn get_items(&self, repo: &RepoId) -> Result<Vec<Item>> {
        let path = format!("repos/{}/{}/issues", repo.owner, repo.repo);
        let issues: Vec<GhIssue> = self
            .get_all(&path, &[("state", "all")], &format!("list issues of {repo}"))
            .await?;

        // Pages can shift while we walk them; keep the first copy of each number.
        let mut seen = HashSet::new();
        issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .filter(|issue| seen.insert(issue.number))
            .filter(|issue| !excluded(issue, &self.settings.exclude_issues_with_labels))
            .map(|issue| self.issue_to_item(issue, repo))
            .collect()
    }

    async fn create_item(&self, item: &Item, repo: &RepoId) -> Result<Item> {
        let mut payload = self.issue_payload(item);
        // New issues are always open; closing is a separate update.
        payload.state = None;

        let request = self
            .request(
                reqwest::Method::POST,
                &format!("repos/{}/{}/issues", repo.owner, repo.repo),
            )
            .json(&payload);
        let issue: GhIssue = self
            .send(request, &format!("create issue '{}' in {repo}", item.title))
            .await?;

        self.issue_to_item(issue, repo)
    }

    async fn update_item(&self, old: &Item, new: &Item) -> Result<Item> {
        let path = Self::issue_path(old)?;
        let repo = old.require_repo_id()?;
        let request = self
            .request(reqwest::Method::PATCH, &path)
            .json(&self.issue_payload(new));
        let issue: GhIssue = self
            .send(request, &format!("update issue '{}'", old.title))
            .await?;

        self.issue_to_item(issue, &repo)
    }

    async fn get_comments(&self, item: &Item) -> Result<Vec<Comment>> {
        let path = format!("{}/comments", Self::issue_path(item)?);
        let comments: Vec<GhComment> = self
            .get_all(&path, &[], &format!("list comments of '{}'", item.title))
            .await?;

        comments
            .into_iter()
            .map(|c| self.to_comment(c))
            .collect()
    }

    async fn create_comment(&self, comment: &Comment, item: &Item) -> Result<Comment> {
        let path = format!("{}/comments", Self::issue_path(item)?);
        let request = self
            .request(reqwest::Method::POST, &path)
            .json(&CommentPayload {
                body: self.comment_body(comment),
            });
        let created: GhComment = self
            .send(request, &format!("comment on '{}'", item.title))
            .await?;

        self.to_comment(created)
    }

    async fn update_comment(&self, old: &Comment, new: &Comment, parent: &Item) -> Result<Comment> {
        let path = Self::comment_path(old, parent)?;
        let request = self
            .request(reqwest::Method::PATCH, &path)
            .json(&CommentPayload {
                body: self.comment_body(new),
            });
        let updated: GhComment = self
            .send(request, &format!("update comment on '{}'", parent.title))
            .await?;

        self.to_comment(updated)
    }

    async fn delete_comment(&self, comment: &Comment, parent: &Item) -> Result<()> {
        let path = Self::comment_path(comment, parent)?;
        self.execute(
            self.request(reqwest::Method::DELETE, &path),
            &format!("delete comment on '{}'", parent.title),
        )
        .await?;
        Ok(())
    }

    fn rate_limited_until(&self) -> Option<i64> {
        self.gate.reached_until()
    }
}
