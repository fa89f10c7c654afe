//! create-target-rfs command - runs the whole pipeline.

use anyhow::Result;

use crate::config::Config;
use crate::pipeline::{self, BuildOptions};
use crate::select::AptRdepends;
use crate::timing::Timer;

/// Execute the create-target-rfs command.
pub fn cmd_create_target_rfs(config: &Config, options: &BuildOptions) -> Result<()> {
    let deps = AptRdepends::new(&config.tools.depends);
    let t = Timer::start("create-target-rfs");
    let summary = pipeline::create_target_rfs(config, options, &deps)?;
    let elapsed = t.finish();

    println!(
        "\n=== Done: {} entries in {}{} ({:.1}s) ===",
        summary.file_count,
        summary.target.display(),
        if summary.pruned { ", packages pruned" } else { "" },
        elapsed.as_secs_f64(),
    );
    if !summary.assembly.licenses.failed.is_empty() {
        println!(
            "  {} license file(s) could not be read, see the report",
            summary.assembly.licenses.failed.len()
        );
    }
    Ok(())
}
