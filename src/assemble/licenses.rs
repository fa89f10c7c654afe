//! License bundle for redistributed packages.
//!
//! Collects `usr/share/doc/<package>/copyright` of every installed package
//! into a single file. A package whose copyright file cannot be read is
//! noted in the build report and skipped; the bundle is still written.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use super::report::append_to_report;

/// Underline between package name and its copyright text.
const RULE: &str =
    "================================================================================";

/// Outcome of building the bundle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LicenseSummary {
    /// Packages whose copyright text made it into the bundle.
    pub bundled: Vec<String>,
    /// Packages that were skipped because their copyright could not be read.
    pub failed: Vec<String>,
}

/// Write the license bundle for every package directory under `doc_root`.
///
/// Symlinked entries and plain files are ignored. Packages are processed
/// in name order.
pub fn bundle_licenses(doc_root: &Path, bundle: &Path, report: &Path) -> Result<LicenseSummary> {
    let mut names: Vec<_> = fs::read_dir(doc_root)
        .with_context(|| format!("Failed to list {}", doc_root.display()))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.file_name())
        .collect();
    names.sort();

    let mut content: Vec<u8> = Vec::new();
    let mut summary = LicenseSummary::default();

    for name in names {
        let dir = doc_root.join(&name);
        let meta = fs::symlink_metadata(&dir)?;
        if meta.file_type().is_symlink() || !meta.is_dir() {
            continue;
        }
        let package = name.to_string_lossy().into_owned();
        let copyright = dir.join("copyright");

        // Copyright files predate UTF-8 in places; copy them byte for byte.
        match fs::read(&copyright) {
            Ok(text) => {
                content.extend_from_slice(name.as_bytes());
                content.extend_from_slice(b":\n");
                content.extend_from_slice(RULE.as_bytes());
                content.push(b'\n');
                content.extend_from_slice(&text);
                content.extend_from_slice(b"\n\n");
                summary.bundled.push(package);
            }
            Err(e) => {
                tracing::warn!("license of {} skipped: {}", package, e);
                append_to_report(
                    report,
                    &format!(
                        "Error while processing license file {}: '{}'\n",
                        copyright.display(),
                        e
                    ),
                )?;
                summary.failed.push(package);
            }
        }
    }

    fs::write(bundle, content).with_context(|| format!("Failed to write {}", bundle.display()))?;

    println!(
        "  Bundled {} licenses ({} packages without readable copyright)",
        summary.bundled.len(),
        summary.failed.len()
    );
    Ok(summary)
}
