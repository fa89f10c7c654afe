//! Show command - displays information.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::{Config, ScratchLayout, SourceLayout};

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration and the derived paths
    Config { json: bool },
}

#[derive(Serialize)]
struct ConfigView<'a> {
    config: &'a Config,
    scratch: ScratchLayout,
    source: SourceLayout,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config { json: true } => {
            let view = ConfigView {
                config,
                scratch: config.scratch(),
                source: config.source(),
            };
            let out = serde_json::to_string_pretty(&view)
                .context("Failed to serialize configuration")?;
            println!("{}", out);
        }
        ShowTarget::Config { json: false } => {
            config.print();
            println!();
            config.scratch().print();
        }
    }
    Ok(())
}
