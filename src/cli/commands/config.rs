//! Config command implementations.

use std::path::Path;

use crate::cli::ConfigCommands;
use crate::config::{Config, config_path, load_config, save_config};
use crate::error::{Error, Result};

/// Execute config commands.
pub fn execute(command: &ConfigCommands, explicit: Option<&Path>, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(explicit, json),
        ConfigCommands::Path => path(explicit, json),
        ConfigCommands::Init { force } => init(explicit, *force, json),
    }
}

fn show(explicit: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(explicit)?.redacted();

    if json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

fn path(explicit: Option<&Path>, json: bool) -> Result<()> {
    let path = config_path(explicit)?;

    if json {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{output}");
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn init(explicit: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let path = config_path(explicit)?;

    if path.exists() && !force {
        return Err(Error::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    save_config(&Config::default(), &path)?;

    if json {
        let output = serde_json::json!({
            "created": true,
            "path": path.display().to_string(),
        });
        println!("{output}");
    } else {
        println!("Wrote default configuration to {}", path.display());
        println!("Set asana.apiKey and github.personalAccessToken (or ASANA_API_KEY / GITHUB_TOKEN) before syncing.");
    }
    Ok(())
}
