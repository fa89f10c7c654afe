//! Preflight checks for create-target-rfs.
//!
//! Verifies the external tools and scratch files a run depends on before
//! anything under the target is touched. Run with `elbe-rfs preflight`.

mod host_tools;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::project::ProjectDescriptor;

pub use host_tools::Needs;
pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
///
/// Without a project every tool is required. With one, tools the project
/// never calls only produce warnings when missing.
pub fn run_preflight(config: &Config, project: Option<&ProjectDescriptor>) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    let needs = project.map(Needs::for_project).unwrap_or(Needs::ALL);
    checks.extend(host_tools::check_host_tools(config, needs, project.is_some()));

    println!("Checking scratch area...");
    checks.extend(host_tools::check_scratch(config, project));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(config: &Config, project: Option<&ProjectDescriptor>) -> Result<()> {
    let report = run_preflight(config, project);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
