//! The create-target-rfs pipeline.
//!
//! validate -> select -> materialize -> prune (setsel only) -> assemble.
//! The target is emptied once the project has loaded. Every stage runs to
//! completion before the next starts. A failing stage stops the run and
//! leaves the target and scratch area as they are.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::assemble::{AssembleOptions, Assembler, Assembly};
use crate::config::Config;
use crate::error::RfsError;
use crate::materialize;
use crate::project::{
    resolve_buildtype, validate_project, Defaults, ProjectDescriptor, ProjectTree, XmlTree,
};
use crate::prune;
use crate::select::{DependencySource, Selector};
use crate::timing::Timer;

/// Command-line inputs of one run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub xml: PathBuf,
    pub target: PathBuf,
    pub debug: bool,
    pub buildchroot: bool,
    pub buildtype: Option<String>,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub project: ProjectDescriptor,
    pub target: PathBuf,
    pub file_count: usize,
    pub pruned: bool,
    pub assembly: Assembly,
}

/// Validate and load the project file.
pub fn load_project(xml: &Path, buildtype: Option<&str>) -> Result<ProjectDescriptor> {
    validate_project(xml).map_err(|problems| RfsError::Validation {
        path: xml.to_path_buf(),
        problems,
    })?;

    let tree = XmlTree::load(xml)?;
    let buildtype = resolve_buildtype(buildtype, tree.text("project/buildtype"));
    let defaults = Defaults::for_buildtype(&buildtype);
    ProjectDescriptor::from_tree(&tree, &defaults)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("Failed to determine working directory")?
            .join(path))
    }
}

/// Run the whole pipeline.
pub fn create_target_rfs(
    config: &Config,
    options: &BuildOptions,
    deps: &dyn DependencySource,
) -> Result<BuildSummary> {
    let project = load_project(&options.xml, options.buildtype.as_deref())?;
    let target = absolute(&options.target)?;
    let scratch = config.scratch();
    let source = config.source();

    println!("=== Target RFS: {} {} ({}) ===\n", project.name, project.version, project.arch);

    // A failed run must never leave the previous target looking current.
    materialize::recreate_dir(&target)?;

    println!("Selecting files ({} mode)...", project.selection);
    let t = Timer::start("Select");
    let selector = Selector {
        source: &source,
        scratch: &scratch,
        target: &target,
        arch: &project.arch,
        deps,
    };
    let list = selector
        .select(project.selection)
        .context("File selection failed")?;
    println!("  {} entries written to {}", list.len(), scratch.filelist.display());
    t.finish();

    println!("\nMaterializing target...");
    let t = Timer::start("Materialize");
    materialize::materialize(&source.root, &target, &list)?;
    t.finish();

    if project.setsel {
        println!("\nPruning packages...");
        let t = Timer::start("Prune");
        prune::prune_packages(&config.tools, &source.root, &target, &scratch.pkg_selections)?;
        t.finish();
    }

    println!("\nAssembling artifacts...");
    let t = Timer::start("Assemble");
    let assembly = Assembler::new(config, &project, &target).assemble(AssembleOptions {
        debug: options.debug,
        buildchroot: options.buildchroot,
    })?;
    t.finish();

    if !assembly.report_tool_ok {
        println!("  Note: report tool failed, see {}", scratch.dump_log.display());
    }
    println!(
        "\n{} artifacts listed in {}",
        assembly.manifest.len(),
        scratch.files_to_extract.display()
    );

    Ok(BuildSummary {
        file_count: list.len(),
        pruned: project.setsel,
        project,
        target,
        assembly,
    })
}
