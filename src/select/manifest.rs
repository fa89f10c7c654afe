//! Per-package file manifests kept by dpkg.
//!
//! dpkg records what every installed package put on disk in
//! `var/lib/dpkg/info/<pkg>.list` and which of those are configuration
//! files in `<pkg>.conffiles`. Multi-arch packages use `<pkg>:<arch>.*`.

use anyhow::{Context, Result};
use std::fs;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// The two manifest kinds, in the order they contribute to the File List.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Files,
    Conffiles,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 2] = [ManifestKind::Files, ManifestKind::Conffiles];

    fn extension(self) -> &'static str {
        match self {
            ManifestKind::Files => "list",
            ManifestKind::Conffiles => "conffiles",
        }
    }
}

/// Outcome of looking up one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLookup {
    /// Manifest exists; its path entries in file order.
    Found(Vec<PathBuf>),
    /// No such manifest. The package contributes nothing of this kind.
    Absent,
}

/// Reader for the dpkg info directory.
#[derive(Debug, Clone)]
pub struct PackageManifests {
    info_dir: PathBuf,
}

impl PackageManifests {
    pub fn new(info_dir: &Path) -> Self {
        Self {
            info_dir: info_dir.to_path_buf(),
        }
    }

    /// Path of the manifest for `package` (optionally arch-qualified).
    pub fn path(&self, package: &str, arch: Option<&str>, kind: ManifestKind) -> PathBuf {
        let stem = match arch {
            Some(arch) => format!("{}:{}", package, arch),
            None => package.to_string(),
        };
        self.info_dir.join(format!("{}.{}", stem, kind.extension()))
    }

    /// Read a manifest. A missing file is [`ManifestLookup::Absent`]; any
    /// other I/O failure is an error. Content is taken as raw bytes, dpkg
    /// does not promise UTF-8 file names.
    pub fn lookup(
        &self,
        package: &str,
        arch: Option<&str>,
        kind: ManifestKind,
    ) -> Result<ManifestLookup> {
        let path = self.path(package, arch, kind);
        match fs::read(&path) {
            Ok(content) => Ok(ManifestLookup::Found(parse_manifest(&content))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("no manifest {}", path.display());
                Ok(ManifestLookup::Absent)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

/// Split manifest content into path entries.
///
/// Blank lines and the `/.` root entry every `.list` starts with are dropped.
pub fn parse_manifest(content: &[u8]) -> Vec<PathBuf> {
    content
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty() && *line != b"/.")
        .map(|line| PathBuf::from(OsStr::from_bytes(line)))
        .collect()
}
