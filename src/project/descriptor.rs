//! Typed view of the project attributes the pipeline consumes.

use anyhow::{Context, Result};

use super::{text_or_default, Defaults, ProjectTree};
use crate::error::RfsError;
use crate::select::SelectionMode;

/// Which archives of the target tree to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packaging {
    pub tar: bool,
    /// File name of the cpio archive, if requested.
    pub cpio: Option<String>,
}

/// Project and target settings read once at pipeline start.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    pub name: String,
    pub version: String,
    /// Debian architecture of the build image.
    pub arch: String,
    /// Package providing kernel and initrd for the build image.
    pub kinitrd: String,
    pub selection: SelectionMode,
    /// Re-apply `pkg-selections` and purge inside the target.
    pub setsel: bool,
    pub packaging: Packaging,
    /// Project carries an `archive` element.
    pub has_archive: bool,
}

impl ProjectDescriptor {
    pub fn from_tree(tree: &dyn ProjectTree, defaults: &Defaults) -> Result<Self> {
        let name = tree.text("project/name").context("project/name is missing")?;
        let version = tree
            .text("project/version")
            .context("project/version is missing")?;
        let arch = text_or_default(tree, "project/buildimage/arch", defaults, "arch")?;
        let kinitrd = tree.text("project/buildimage/kinitrd").unwrap_or_default();

        let selection = match (tree.has("target/tighten"), tree.has("target/diet")) {
            (true, true) => return Err(RfsError::ConflictingSelection.into()),
            (true, false) => SelectionMode::Tighten,
            (false, true) => SelectionMode::Diet,
            (false, false) => SelectionMode::Default,
        };

        let cpio = if tree.has("target/package/cpio") {
            Some(
                tree.text("target/package/cpio/name")
                    .context("target/package/cpio/name is missing")?,
            )
        } else {
            None
        };

        Ok(Self {
            name,
            version,
            arch,
            kinitrd,
            selection,
            setsel: tree.has("target/setsel"),
            packaging: Packaging {
                tar: tree.has("target/package/tar"),
                cpio,
            },
            has_archive: tree.has("archive"),
        })
    }
}
