//! Whole-filesystem enumeration for the default selection mode.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every path below `root` as an absolute path (relative to `root`),
/// skipping the `excluded` subtrees. Symlinks are listed, never followed.
pub fn enumerate_root(root: &Path, excluded: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !excluded.iter().any(|ex| entry.path() == ex.as_path()));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} escaped {}", entry.path().display(), root.display()))?;
        entries.push(Path::new("/").join(relative));
    }

    Ok(entries)
}
