//! Configuration management.
//!
//! Settings live in `~/.tracksync/config.json` (camelCase keys, every key
//! optional). Credentials can also come from the environment, which wins
//! over the file:
//!
//! - `ASANA_API_KEY` for the Asana personal access token
//! - `GITHUB_TOKEN` for the GitHub token
//!
//! The loaded [`Config`] is passed explicitly to the clients and the
//! orchestrator; nothing reads it from global state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fields::FieldCodec;

const APP_DIR: &str = ".tracksync";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Projects named `<keywordPrefix><keyword>...` are synced
    pub keyword: String,

    /// Single character that starts a field line (and the project keyword)
    pub keyword_prefix: String,

    /// Single character between a field's key and value
    pub field_separator: String,

    /// Value given to a field line without a separator
    pub empty_field_value: String,

    /// Sync cache file (default: `~/.tracksync/cache.json`)
    pub cache_location: Option<PathBuf>,

    /// Milliseconds subtracted from "now" when advancing a watermark
    pub last_sync_safety: i64,

    /// Projects, and comment pairs within a project, processed at once
    pub concurrency: usize,

    /// Per-request timeout for both services
    pub request_timeout_secs: u64,

    pub asana: AsanaConfig,
    pub github: GitHubConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyword: "cc".into(),
            keyword_prefix: "#".into(),
            field_separator: " ".into(),
            empty_field_value: String::new(),
            cache_location: None,
            last_sync_safety: 5000,
            concurrency: 5,
            request_timeout_secs: 30,
            asana: AsanaConfig::default(),
            github: GitHubConfig::default(),
        }
    }
}

/// Asana (manager) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AsanaConfig {
    /// Short service name used in log lines and field keys
    pub keyword: String,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for AsanaConfig {
    fn default() -> Self {
        Self {
            keyword: "aa".into(),
            api_key: None,
            base_url: "https://app.asana.com/api/1.0".into(),
        }
    }
}

/// GitHub (tracker) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitHubConfig {
    pub keyword: String,
    pub personal_access_token: Option<String>,

    /// Basic auth, used only when no token is set
    pub user_name: Option<String>,
    pub password: Option<String>,

    /// Issues carrying any of these labels are ignored
    pub exclude_issues_with_labels: Vec<String>,

    /// Prepended to the issue number in task titles ("#12 Fix login")
    pub issue_number_prefix: String,

    /// `gh.assignee` value for unassigned issues
    pub unassigned_user: String,

    pub base_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            keyword: "gh".into(),
            personal_access_token: None,
            user_name: None,
            password: None,
            exclude_issues_with_labels: vec!["invalid".into()],
            issue_number_prefix: "#".into(),
            unassigned_user: String::new(),
            base_url: "https://api.github.com".into(),
        }
    }
}

fn single_char(name: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::Config(format!(
            "{name} must be exactly one character, got {value:?}"
        ))),
    }
}

impl Config {
    /// Check values that serde can't.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        single_char("keywordPrefix", &self.keyword_prefix)?;
        single_char("fieldSeparator", &self.field_separator)?;
        if self.keyword.is_empty() {
            return Err(Error::Config("keyword must not be empty".into()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        if self.last_sync_safety < 0 {
            return Err(Error::Config("lastSyncSafety must not be negative".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("requestTimeoutSecs must be at least 1".into()));
        }
        Ok(())
    }

    /// Field codec built from the prefix/separator settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either setting isn't a single character.
    pub fn codec(&self) -> Result<FieldCodec> {
        Ok(FieldCodec::new(
            single_char("keywordPrefix", &self.keyword_prefix)?,
            single_char("fieldSeparator", &self.field_separator)?,
            self.empty_field_value.clone(),
        ))
    }

    /// Name prefix that marks a project for syncing, e.g. `#cc`.
    #[must_use]
    pub fn project_prefix(&self) -> String {
        format!("{}{}", self.keyword_prefix, self.keyword)
    }

    /// Where the sync cache is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if no location is configured and the home
    /// directory can't be determined.
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_location {
            Some(path) => Ok(path.clone()),
            None => app_dir().map(|dir| dir.join("cache.json")),
        }
    }

    /// Overlay credentials from the environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(key) = non_empty("ASANA_API_KEY") {
            self.asana.api_key = Some(key);
        }
        if let Some(token) = non_empty("GITHUB_TOKEN") {
            self.github.personal_access_token = Some(token);
        }
    }

    /// Copy with credentials masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.asana.api_key = mask(&self.asana.api_key);
        copy.github.personal_access_token = mask(&self.github.personal_access_token);
        copy.github.password = mask(&self.github.password);
        copy
    }
}

fn app_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(APP_DIR))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Resolve the config file path: explicit path, else `~/.tracksync/config.json`.
///
/// # Errors
///
/// Returns an error if the home directory can't be determined.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => app_dir().map(|dir| dir.join("config.json")),
    }
}

/// Read the config file, falling back to defaults when it doesn't exist.
///
/// Environment credentials are not applied; see [`load_config`].
///
/// # Errors
///
/// Returns [`Error::Config`] if the file can't be read or parsed.
pub fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Load, apply environment credentials and validate.
///
/// # Errors
///
/// Returns [`Error::Config`] for unreadable or invalid configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = config_path(explicit)?;
    let mut config = read_config_file(&path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Write `config` as pretty JSON, creating the parent directory.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file can't be written.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}
