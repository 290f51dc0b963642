//! Sync command implementation.
//!
//! Builds the Asana and GitHub clients from configuration, runs one pass
//! (or one pass every `--interval` seconds) and prints the operation log.

use chrono::{Local, TimeZone};
use colored::Colorize;
use std::path::Path;
use std::time::Duration;

use crate::config::load_config;
use crate::error::{Error, Result};
use crate::service::{AsanaClient, GitHubClient};
use crate::sync::{SyncCache, SyncSummary, Syncer};

const RULE: &str = "------------------------------------------------------";

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if configuration or the cache can't be loaded, or if
/// a single pass finished with errors.
pub fn execute(interval: Option<u64>, config_path: Option<&Path>, json: bool, quiet: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let cache = SyncCache::load(config.cache_path()?)?;
    let syncer = Syncer::new(
        AsanaClient::new(&config)?,
        GitHubClient::new(&config)?,
        cache,
        &config,
    )?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    let Some(secs) = interval else {
        let summary = rt.block_on(syncer.sync());
        print_summary(&summary, json, quiet)?;
        return match summary.errors.len() {
            0 => Ok(()),
            n => Err(Error::Other(format!("sync finished with {n} error(s)"))),
        };
    };

    let period = Duration::from_secs(secs.max(1));
    tracing::info!(every_secs = period.as_secs(), "starting periodic sync");
    loop {
        let summary = rt.block_on(syncer.sync());
        print_summary(&summary, json, quiet)?;
        rt.block_on(tokio::time::sleep(period));
    }
}

fn print_summary(summary: &SyncSummary, json: bool, quiet: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "log": summary.log,
            "errors": summary.errors,
            "rate_limited": summary.rate_limited,
            "rate_limit_reached_until": summary.rate_limit_reached_until,
            "projects": summary.projects.len(),
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if quiet && summary.errors.is_empty() {
        return Ok(());
    }

    println!("{RULE}");
    println!("Sync - {}", Local::now().format("%a %b %e %Y %H:%M:%S"));

    if summary.log.is_empty() {
        println!("Nothing to sync!");
    }
    for line in &summary.log {
        if line.starts_with("ERROR") {
            println!("{}", line.red());
        } else if line.starts_with("UNSUPPORTED") {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }

    for error in &summary.errors {
        println!("{}", format!("ERROR - {error}").red());
    }

    if summary.rate_limited {
        println!("{}", rate_limit_notice(summary.rate_limit_reached_until).yellow());
    }
    Ok(())
}

fn rate_limit_notice(until_ms: Option<i64>) -> String {
    match until_ms.and_then(|ms| Local.timestamp_millis_opt(ms).single()) {
        Some(at) => format!("API rate limit was reached. Try again after {}", at.format("%H:%M:%S")),
        None => "API rate limit was reached. Try again later.".to_string(),
    }
}
