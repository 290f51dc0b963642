//! Version command implementation.

use crate::error::Result;
use crate::service::github::USER_AGENT;
use serde::Serialize;

const NAME: &str = "tracksync";

#[derive(Serialize)]
struct VersionOutput<'a> {
    name: &'a str,
    version: &'a str,
    build: &'a str,
    /// Sent with every GitHub request
    user_agent: &'a str,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let output = VersionOutput {
        name: NAME,
        version: env!("CARGO_PKG_VERSION"),
        build: if cfg!(debug_assertions) { "dev" } else { "release" },
        user_agent: USER_AGENT,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} {} ({})", output.name, output.version, output.build);
    }
    Ok(())
}
