//! Final deliverables once the target tree is in place.
//!
//! Order matters: the report tool creates the report that license errors,
//! partition script output and the trailer are appended to, and the
//! Artifact Manifest mirrors the order artifacts become available.

pub mod kernel;
pub mod licenses;
pub mod manifest;
pub mod package;
pub mod report;
pub mod version;

pub use licenses::LicenseSummary;
pub use manifest::ArtifactManifest;

use anyhow::Result;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::config::{Config, ScratchLayout, SourceLayout};
use crate::project::ProjectDescriptor;

/// Flags from the command line that shape assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    /// Ship the host system log as well.
    pub debug: bool,
    /// Building the build chroot itself: its kernel is already in place.
    pub buildchroot: bool,
}

/// What assembly produced.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub report_tool_ok: bool,
    pub licenses: LicenseSummary,
    /// Paths appended to the Artifact Manifest, in order.
    pub manifest: Vec<PathBuf>,
}

pub struct Assembler<'a> {
    config: &'a Config,
    scratch: ScratchLayout,
    source: SourceLayout,
    project: &'a ProjectDescriptor,
    target: &'a Path,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a Config, project: &'a ProjectDescriptor, target: &'a Path) -> Self {
        Self {
            config,
            scratch: config.scratch(),
            source: config.source(),
            project,
            target,
        }
    }

    pub fn assemble(&self, options: AssembleOptions) -> Result<Assembly> {
        let scratch = &self.scratch;
        let tools = &self.config.tools;
        let mut manifest = ArtifactManifest::new(&scratch.files_to_extract);

        version::write_version_stamp(
            &self.source.version_file,
            self.project,
            OffsetDateTime::now_utc(),
        )?;

        let report_tool_ok =
            report::run_report_tool(&tools.report, scratch, self.project, self.target)?;

        let licenses =
            licenses::bundle_licenses(&self.source.doc_root, &scratch.license, &scratch.report)?;

        report::run_part_script(scratch)?;

        if self.project.packaging.tar {
            package::create_tar(tools, self.target, &scratch.tar)?;
            manifest.append(&scratch.tar)?;
        }
        if let Some(name) = &self.project.packaging.cpio {
            let out = scratch.cpio(name)?;
            package::create_cpio(tools, self.target, &out)?;
            manifest.append(&out)?;
        }

        report::append_trailer(scratch)?;

        for artifact in [
            &self.source.version_file,
            &scratch.license,
            &scratch.report,
            &scratch.source_xml,
            &scratch.validation,
        ] {
            manifest.append(artifact)?;
        }
        if options.debug {
            manifest.append(&self.config.syslog)?;
        }

        if !options.buildchroot {
            for image in kernel::copy_kernel_images(&self.source, scratch, &self.project.arch)? {
                manifest.append(&image)?;
            }
        }

        Ok(Assembly {
            report_tool_ok,
            licenses,
            manifest: manifest.appended().to_vec(),
        })
    }
}
