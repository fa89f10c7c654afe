//! Package pruning inside the materialized target.
//!
//! Re-applies the dpkg selection state from `pkg-selections` inside the
//! target (as its own root) and purges everything it marks for removal.
//! dpkg needs `/proc` and `/sys` there, so the purge runs between a pair
//! of bind mounts held by [`BindMounts`], which are released on every
//! exit path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Tools;
use crate::error::RfsError;
use crate::process::Cmd;

/// Bind mounts of the host's `/proc` and `/sys` into a target tree.
///
/// Unmounts in reverse order on [`BindMounts::release`] or, failing that,
/// on drop.
pub struct BindMounts {
    umount: String,
    mounted: Vec<PathBuf>,
}

impl BindMounts {
    /// Bind `proc` and `sys` from `host_root` into `target`. If the second
    /// mount fails the first one is released before returning.
    pub fn acquire(tools: &Tools, host_root: &Path, target: &Path) -> Result<Self> {
        let mut mounts = Self {
            umount: tools.umount.clone(),
            mounted: Vec::new(),
        };
        for dir in ["proc", "sys"] {
            let source = host_root.join(dir);
            let mountpoint = target.join(dir);
            Cmd::new(&tools.mount)
                .args(["-o", "bind"])
                .arg_path(&source)
                .arg_path(&mountpoint)
                .error_msg(format!(
                    "Failed to bind {} to {}",
                    source.display(),
                    mountpoint.display()
                ))
                .run()?;
            mounts.mounted.push(mountpoint);
        }
        Ok(mounts)
    }

    /// Mount points currently held.
    pub fn mountpoints(&self) -> &[PathBuf] {
        &self.mounted
    }

    /// Unmount everything. Every mount point is attempted even if an
    /// earlier one fails; the first failure is returned.
    pub fn release(mut self) -> Result<()> {
        self.unmount_all()
    }

    fn unmount_all(&mut self) -> Result<()> {
        let mut first_err = None;
        while let Some(mountpoint) = self.mounted.pop() {
            let result = Cmd::new(&self.umount)
                .arg_path(&mountpoint)
                .error_msg(format!("Failed to unmount {}", mountpoint.display()))
                .run();
            if let Err(e) = result {
                tracing::warn!("{:#}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for BindMounts {
    fn drop(&mut self) {
        if !self.mounted.is_empty() {
            let _ = self.unmount_all();
        }
    }
}

/// Apply `selections` inside `target` and purge deselected packages.
///
/// A purge failure is returned as [`RfsError::PurgeFailed`] after the bind
/// mounts were released; an unmount failure is reported after that.
pub fn prune_packages(
    tools: &Tools,
    host_root: &Path,
    target: &Path,
    selections: &Path,
) -> Result<()> {
    println!("  Applying {} inside {}", selections.display(), target.display());

    let mounts = BindMounts::acquire(tools, host_root, target)?;
    tracing::debug!("bind mounts held: {:?}", mounts.mountpoints());
    let purged = purge_in_chroot(tools, target, selections);
    let released = mounts.release();

    purged.map_err(|source| RfsError::PurgeFailed {
        target: target.to_path_buf(),
        source,
    })?;
    released
}

fn chroot_dpkg(tools: &Tools, target: &Path) -> Cmd {
    Cmd::new(&tools.chroot)
        .arg_path(target)
        .arg(&tools.dpkg)
        .env("LANG", "C")
        .env("LANGUAGE", "C")
        .env("LC_ALL", "C")
}

fn purge_in_chroot(tools: &Tools, target: &Path, selections: &Path) -> Result<()> {
    if !selections.is_file() {
        anyhow::bail!("selection file {} not found", selections.display());
    }

    chroot_dpkg(tools, target)
        .arg("--clear-selections")
        .run()
        .context("dpkg --clear-selections failed")?;
    chroot_dpkg(tools, target)
        .arg("--set-selections")
        .stdin_file(selections)
        .run()
        .context("dpkg --set-selections failed")?;
    chroot_dpkg(tools, target)
        .args(["--purge", "-a"])
        .run()
        .context("dpkg --purge -a failed")?;
    Ok(())
}
