//! Version stamp written into the build chroot.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::project::ProjectDescriptor;

/// Version of this tool, as recorded in stamps and reports.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Remove a file that may legitimately be absent.
pub fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Human-readable build time, e.g. `Mon Oct 19 09:05:03 2026 UTC`.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String> {
    let format = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] \
         [hour]:[minute]:[second] [year]"
    );
    Ok(format!("{} UTC", at.to_offset(time::UtcOffset::UTC).format(&format)?))
}

/// Replace `path` with the project name/version, tool version and build time.
pub fn write_version_stamp(
    path: &Path,
    project: &ProjectDescriptor,
    at: OffsetDateTime,
) -> Result<()> {
    remove_if_present(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = format!(
        "{} {}\nthis RFS was generated by elbe-rfs {}\n{}\n",
        project.name,
        project.version,
        TOOL_VERSION,
        format_timestamp(at)?
    );
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
