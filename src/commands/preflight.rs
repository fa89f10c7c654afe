//! Preflight command - runs preflight checks.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::pipeline;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(config: &Config, xml: Option<&Path>, strict: bool) -> Result<()> {
    let project = xml
        .map(|xml| pipeline::load_project(xml, None))
        .transpose()?;

    if strict {
        preflight::run_preflight_or_fail(config, project.as_ref())?;
    } else {
        let report = preflight::run_preflight(config, project.as_ref());
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to fail the command.");
        }
    }
    Ok(())
}
