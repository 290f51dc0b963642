//! Cache command implementations.

use colored::Colorize;
use std::path::Path;

use crate::cli::CacheCommands;
use crate::config::load_config;
use crate::error::Result;
use crate::service::rate_limit::format_ms;
use crate::sync::SyncCache;

/// Execute cache commands.
pub fn execute(command: &CacheCommands, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let cache = SyncCache::load(config.cache_path()?)?;

    match command {
        CacheCommands::Show => show(&cache, json),
        CacheCommands::Clear => clear(&cache, json),
    }
}

fn show(cache: &SyncCache, json: bool) -> Result<()> {
    let entries = cache.snapshot();

    if json {
        let output = serde_json::json!({
            "path": cache.path().map(|p| p.display().to_string()),
            "count": entries.len(),
            "last_sync": entries,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No tasks synced yet.");
        return Ok(());
    }

    println!("{}", "Last sync by task".bold());
    for (task_id, ms) in &entries {
        println!("  {task_id}  {}", format_ms(*ms).dimmed());
    }
    println!();
    println!("  Total: {} tasks", entries.len());
    Ok(())
}

fn clear(cache: &SyncCache, json: bool) -> Result<()> {
    let count = cache.snapshot().len();
    cache.clear();
    cache.save()?;

    if json {
        let output = serde_json::json!({ "cleared": count });
        println!("{output}");
    } else {
        println!("Cleared {count} watermarks. Every task's comments are re-checked on the next sync.");
    }
    Ok(())
}
