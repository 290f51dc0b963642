//! Last-sync watermarks, keyed by manager task id.
//!
//! A task's comments are only re-diffed when the task or its issue changed
//! after the stored watermark. Missing entries read as 0 (never synced).
//!
//! The cache is persisted as a JSON document and written with the usual
//! temp file + rename so an interrupted save never leaves a torn file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

/// On-disk cache payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheFile {
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sync: BTreeMap<String, i64>,
}

/// Shared watermark store.
#[derive(Debug, Default)]
pub struct SyncCache {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, i64>>,
}

impl SyncCache {
    /// An empty cache that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache stored at `path`, or start empty if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let file: CacheFile = serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Corrupt sync cache {}: {e}", path.display()))
            })?;
            file.last_sync
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded sync cache");

        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, i64>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Watermark for `manager_id`, 0 when never synced.
    #[must_use]
    pub fn get_last_sync(&self, manager_id: &str) -> i64 {
        self.lock().get(manager_id).copied().unwrap_or(0)
    }

    /// Record `timestamp` as the watermark for `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty id or a negative timestamp.
    pub fn set_last_sync(&self, manager_id: &str, timestamp: i64) -> Result<()> {
        if manager_id.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot record a sync watermark without a manager id".into(),
            ));
        }
        if timestamp < 0 {
            return Err(Error::InvalidArgument(format!(
                "invalid sync watermark {timestamp} for {manager_id}"
            )));
        }
        self.lock().insert(manager_id.to_string(), timestamp);
        Ok(())
    }

    /// Copy of every entry, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Persist to the load path. In-memory caches are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = CacheFile {
            saved_at: Some(Utc::now()),
            last_sync: self.snapshot(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let mut tmp = fs::File::create(&temp_path)?;
            tmp.write_all(json.as_bytes())?;
            tmp.flush()?;
            tmp.sync_all()?;
        }
        fs::rename(&temp_path, path)?;

        tracing::debug!(path = %path.display(), entries = file.last_sync.len(), "saved sync cache");
        Ok(())
    }
}
