//! Asana REST client (the manager service).
//!
//! Tasks map to items and comment stories map to comments. Asana has no
//! custom metadata we can rely on, so issue numbers and comment ids are
//! written as field lines at the end of task notes and story text.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::rate_limit::{RateLimitGate, parse_retry_after};
use super::{ManagerService, error_message, parse_timestamp, transport_error};
use crate::config::Config;
use crate::error::{Error, Result, ServiceError};
use crate::fields::{FieldCodec, Fields};
use crate::model::{Comment, Item, Project, Workspace, keys};

const PAGE_LIMIT: &str = "100";
const TASK_FIELDS: &str = "gid,name,notes,completed,modified_at,tags.name";
const STORY_FIELDS: &str = "gid,type,resource_subtype,text,created_at,created_by.name";

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    offset: String,
}

#[derive(Debug, Serialize)]
struct Outgoing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct AsanaWorkspace {
    gid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AsanaProject {
    gid: String,
    name: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsanaTask {
    gid: String,
    name: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    completed: bool,
    modified_at: String,
    #[serde(default)]
    tags: Vec<AsanaNamed>,
}

#[derive(Debug, Deserialize)]
struct AsanaNamed {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsanaStory {
    gid: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    resource_subtype: Option<String>,
    #[serde(default)]
    text: Option<String>,
    created_at: String,
    #[serde(default)]
    created_by: Option<AsanaNamed>,
}

impl AsanaStory {
    fn is_comment(&self) -> bool {
        self.kind.as_deref() == Some("comment")
            || self.resource_subtype.as_deref() == Some("comment_added")
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct TaskPayload<'a> {
    name: &'a str,
    notes: String,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projects: Option<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
struct StoryPayload {
    text: String,
}

// ── Client ────────────────────────────────────────────────────

/// Asana API client.
pub struct AsanaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    codec: FieldCodec,
    gate: RateLimitGate,
}

impl AsanaClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid field settings or if the HTTP
    /// client can't be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Asana HTTP client: {e}")))?;

        if config.asana.api_key.is_none() {
            tracing::warn!("no Asana API key configured, requests will be anonymous");
        }

        Ok(Self {
            client,
            base_url: config.asana.base_url.trim_end_matches('/').to_string(),
            api_key: config.asana.api_key.clone(),
            codec: config.codec()?,
            gate: RateLimitGate::new(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, context: &str) -> Result<Envelope<T>> {
        self.gate.check()?;

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(context, &e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok());
            self.gate.trip(parse_retry_after(retry_after));
            return Err(ServiceError::rate_limited(format!("{context}: API rate limit reached")).into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(
                status.as_u16(),
                format!("{context}: {}", error_message(&body)),
            )
            .into());
        }

        response.json::<Envelope<T>>().await.map_err(|e| {
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
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .request(reqwest::Method::GET, path)
                .query(query)
                .query(&[("limit", PAGE_LIMIT)]);
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset.as_str())]);
            }

            let page: Envelope<Vec<T>> = self.send(request, context).await?;
            results.extend(page.data);

            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        Ok(results)
    }

    // ── Mapping ───────────────────────────────────────────────

    fn task_to_item(&self, task: AsanaTask) -> Result<Item> {
        let mut item = Item::new(task.name)
            .with_manager_id(task.gid)
            .with_completed(task.completed)
            .with_last_updated(parse_timestamp(&task.modified_at)?);
        item.body = self.codec.extract_into(task.notes.as_deref(), &mut item.fields);
        item.tags = task.tags.into_iter().filter_map(|t| t.name).collect();
        Ok(item)
    }

    fn item_payload<'a>(&self, item: &'a Item) -> TaskPayload<'a> {
        TaskPayload {
            name: &item.title,
            notes: self.codec.embed(&item.body, &item.fields),
            completed: item.completed,
            workspace: None,
            projects: None,
        }
    }

    fn story_to_comment(&self, story: AsanaStory) -> Result<Comment> {
        let mut comment = Comment::default().with_last_updated(parse_timestamp(&story.created_at)?);
        comment.body = self.codec.extract_into(story.text.as_deref(), &mut comment.fields);

        // Ids already carried in the text win, so a story recreated from a
        // GitHub mirror keeps pointing at the original story.
        comment
            .fields
            .entry(keys::AA_ID.to_string())
            .or_insert(story.gid);
        let commenter = story.created_by.and_then(|u| u.name).unwrap_or_default();
        comment
            .fields
            .entry(keys::AA_COMMENTER.to_string())
            .or_insert(commenter);
        Ok(comment)
    }

    fn story_text(&self, comment: &Comment) -> String {
        let identity = if comment.manager_id().is_some() {
            [keys::AA_COMMENTER, keys::AA_ID]
        } else if comment.tracker_id().is_some() {
            [keys::GH_COMMENTER, keys::GH_ID]
        } else {
            return comment.body.clone();
        };

        let fields: Fields = identity
            .iter()
            .map(|key| {
                let value = comment.fields.get(*key).cloned().unwrap_or_default();
                ((*key).to_string(), value)
            })
            .collect();
        self.codec.embed(&comment.body, &fields)
    }
}

/// Fill in the project's repository on items that don't name one.
fn with_project_repo(mut item: Item, project: &Project) -> Item {
    for key in [keys::GH_OWNER, keys::GH_REPO] {
        if let Some(value) = project.fields.get(key).filter(|v| !v.is_empty()) {
            let entry = item.fields.entry(key.to_string()).or_default();
            if entry.is_empty() {
                entry.clone_from(value);
            }
        }
    }
    item
}

impl ManagerService for AsanaClient {
    async fn get_workspaces(&self) -> Result<Vec<Workspace>> {
        let workspaces: Vec<AsanaWorkspace> = self
            .get_all("workspaces", &[("opt_fields", "gid,name")], "list workspaces")
            .await?;

        Ok(workspaces
            .into_iter()
            .map(|w| Workspace { id: w.gid, name: w.name })
            .collect())
    }

    async fn get_projects(&self, workspace: &Workspace, name_prefix: &str) -> Result<Vec<Project>> {
        let path = format!("workspaces/{}/projects", workspace.id);
        let context = format!("list projects in '{}'", workspace.name);
        let projects: Vec<AsanaProject> = self
            .get_all(
                &path,
                &[("archived", "false"), ("opt_fields", "gid,name,notes")],
                &context,
            )
            .await?;

        Ok(projects
            .into_iter()
            .filter(|p| p.name.starts_with(name_prefix))
            .map(|p| Project::new(p.gid, p.name, p.notes.unwrap_or_default(), workspace.id.clone()))
            .collect())
    }

    async fn get_items(&self, project: &Project) -> Result<Vec<Item>> {
        let path = format!("projects/{}/tasks", project.id);
        let context = format!("list tasks of '{}'", project.name);
        let tasks: Vec<AsanaTask> = self
            .get_all(&path, &[("opt_fields", TASK_FIELDS)], &context)
            .await?;

        tasks
            .into_iter()
            .map(|task| Ok(with_project_repo(self.task_to_item(task)?, project)))
            .collect()
    }

    async fn create_item(&self, item: &Item, project: &Project) -> Result<Item> {
        let mut payload = self.item_payload(item);
        payload.workspace = Some(&project.workspace_id);
        payload.projects = Some(vec![project.id.as_str()]);

        let request = self
            .request(reqwest::Method::POST, "tasks")
            .query(&[("opt_fields", TASK_FIELDS)])
            .json(&Outgoing { data: payload });
        let created: Envelope<AsanaTask> = self
            .send(request, &format!("create task '{}'", item.title))
            .await?;

        Ok(with_project_repo(self.task_to_item(created.data)?, project))
    }

    async fn update_item(&self, old: &Item, new: &Item) -> Result<Item> {
        let task_id = old.require_manager_id()?;
        let request = self
            .request(reqwest::Method::PUT, &format!("tasks/{task_id}"))
            .query(&[("opt_fields", TASK_FIELDS)])
            .json(&Outgoing { data: self.item_payload(new) });
        let updated: Envelope<AsanaTask> = self
            .send(request, &format!("update task '{}'", old.title))
            .await?;

        self.task_to_item(updated.data)
    }

    async fn get_comments(&self, item: &Item) -> Result<Vec<Comment>> {
        let task_id = item.require_manager_id()?;
        let context = format!("list stories of '{}'", item.title);
        let stories: Vec<AsanaStory> = self
            .get_all(
                &format!("tasks/{task_id}/stories"),
                &[("opt_fields", STORY_FIELDS)],
                &context,
            )
            .await?;

        stories
            .into_iter()
            .filter(AsanaStory::is_comment)
            .map(|story| self.story_to_comment(story))
            .collect()
    }

    async fn create_comment(&self, comment: &Comment, item: &Item) -> Result<Comment> {
        let task_id = item.require_manager_id()?;
        let request = self
            .request(reqwest::Method::POST, &format!("tasks/{task_id}/stories"))
            .query(&[("opt_fields", STORY_FIELDS)])
            .json(&Outgoing {
                data: StoryPayload {
                    text: self.story_text(comment),
                },
            });
        let created: Envelope<AsanaStory> = self
            .send(request, &format!("comment on '{}'", item.title))
            .await?;

        self.story_to_comment(created.data)
    }

    fn rate_limited_until(&self) -> Option<i64> {
        self.gate.reached_until()
    }
}
