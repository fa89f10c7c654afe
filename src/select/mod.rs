//! Target file selection.
//!
//! Turns the project's selection mode into the File List: the ordered,
//! duplicate-free set of absolute paths that make up the target tree.
//!
//! - **Tighten**: manifests of the packages in `pkg-list`.
//! - **Diet**: manifests of the dependency closure of `pkg-list`,
//!   including arch-qualified multi-arch manifests.
//! - **Default**: the whole build chroot minus pseudo filesystems, the
//!   target directory and the scratch area.

pub mod closure;
pub mod manifest;
pub mod walk;

pub use closure::{resolve_closure, AptRdepends, DependencySource};
pub use manifest::{ManifestKind, ManifestLookup, PackageManifests};

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::config::{ScratchLayout, SourceLayout};
use crate::error::RfsError;

/// How the target's file set is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionMode {
    Tighten,
    Diet,
    Default,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SelectionMode::Tighten => "tighten",
            SelectionMode::Diet => "diet",
            SelectionMode::Default => "default",
        })
    }
}

/// Ordered set of absolute paths destined for the target.
///
/// Entries are raw paths: names that are not valid UTF-8 survive from
/// manifest to target unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    entries: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless it is already present. Relative entries are
    /// anchored at `/`.
    pub fn push(&mut self, entry: impl AsRef<Path>) {
        let entry = Path::new("/").join(entry.as_ref());
        if self.seen.insert(entry.clone()) {
            self.entries.push(entry);
        }
    }

    pub fn extend<I, P>(&mut self, entries: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write one entry per line to `path`, byte for byte.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let mut content = Vec::new();
        for entry in &self.entries {
            content.extend_from_slice(entry.as_os_str().as_bytes());
            content.push(b'\n');
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Read the seed package list, one package per line.
pub fn read_package_list(path: &Path) -> Result<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RfsError::MissingPackageList {
                path: path.to_path_buf(),
                source: e,
            }
            .into())
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Everything file selection needs to know about the host.
pub struct Selector<'a> {
    pub source: &'a SourceLayout,
    pub scratch: &'a ScratchLayout,
    /// Target directory (absolute); excluded in default mode.
    pub target: &'a Path,
    /// Architecture used for multi-arch manifest names.
    pub arch: &'a str,
    pub deps: &'a dyn DependencySource,
}

impl Selector<'_> {
    /// Compute the File List for `mode` and persist it to the scratch area.
    pub fn select(&self, mode: SelectionMode) -> Result<FileList> {
        let list = match mode {
            SelectionMode::Tighten => self.tighten()?,
            SelectionMode::Diet => self.diet()?,
            SelectionMode::Default => self.whole_root()?,
        };
        list.persist(&self.scratch.filelist)?;
        Ok(list)
    }

    fn tighten(&self) -> Result<FileList> {
        let packages = read_package_list(&self.scratch.pkg_list)?;
        println!("  {} packages in {}", packages.len(), self.scratch.pkg_list.display());
        self.collect(&packages, None)
    }

    fn diet(&self) -> Result<FileList> {
        let explicit = read_package_list(&self.scratch.pkg_list)?;
        let closure = resolve_closure(self.deps, &explicit)
            .context("Failed to compute dependency closure")?;
        println!(
            "  {} explicit packages, {} with dependencies",
            explicit.len(),
            closure.len()
        );

        let mut content = closure.join("\n");
        content.push('\n');
        fs::write(&self.scratch.allpkg_list, content).with_context(|| {
            format!("Failed to write {}", self.scratch.allpkg_list.display())
        })?;

        self.collect(&closure, Some(self.arch))
    }

    fn collect(&self, packages: &[String], arch: Option<&str>) -> Result<FileList> {
        let manifests = PackageManifests::new(&self.source.dpkg_info);
        let mut list = FileList::new();
        let mut absent = 0usize;

        for package in packages {
            let mut qualifiers = vec![None];
            if arch.is_some() {
                qualifiers.push(arch);
            }
            for qualifier in qualifiers {
                for kind in ManifestKind::ALL {
                    match manifests.lookup(package, qualifier, kind)? {
                        ManifestLookup::Found(entries) => list.extend(entries),
                        ManifestLookup::Absent => absent += 1,
                    }
                }
            }
        }

        tracing::debug!("{} manifests absent", absent);
        Ok(list)
    }

    fn whole_root(&self) -> Result<FileList> {
        let excluded: Vec<PathBuf> = vec![
            self.source.proc_dir.clone(),
            self.source.sys_dir.clone(),
            self.target.to_path_buf(),
            self.scratch.root.clone(),
        ];
        let mut list = FileList::new();
        list.extend(walk::enumerate_root(&self.source.root, &excluded)?);
        Ok(list)
    }
}
