//! tar and cpio archives of the target tree.

use anyhow::{Context, Result};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Tools;
use crate::process::Cmd;

/// `tar cf <out> -C <target> .`
pub fn create_tar(tools: &Tools, target: &Path, out: &Path) -> Result<()> {
    println!("  Creating {}...", out.display());
    Cmd::new(&tools.tar)
        .arg("cf")
        .arg_path(out)
        .arg("-C")
        .arg_path(target)
        .arg(".")
        .error_msg(format!("Failed to create {}", out.display()))
        .run()?;
    Ok(())
}

/// NUL-separated `./`-relative paths of everything under `target`, in
/// sorted walk order, as `find . -print0` would list them. Names are
/// passed through as raw bytes.
pub fn cpio_input(target: &Path) -> Result<Vec<u8>> {
    let mut input = Vec::new();
    for entry in WalkDir::new(target).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", target.display()))?;
        let relative = entry.path().strip_prefix(target)?;
        if relative.as_os_str().is_empty() {
            input.push(b'.');
        } else {
            input.extend_from_slice(b"./");
            input.extend_from_slice(relative.as_os_str().as_bytes());
        }
        input.push(0);
    }
    Ok(input)
}

/// newc cpio archive of the target tree.
pub fn create_cpio(tools: &Tools, target: &Path, out: &Path) -> Result<()> {
    println!("  Creating {}...", out.display());
    Cmd::new(&tools.cpio)
        .args(["--null", "-o", "-H", "newc"])
        .dir(target)
        .stdin_bytes(cpio_input(target)?)
        .stdout_file(out)
        .error_msg(format!("Failed to create {}", out.display()))
        .run()?;
    Ok(())
}
