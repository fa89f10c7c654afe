//! Copy the File List from the build chroot into the target directory.
//!
//! Works like `rsync -a --files-from`: only listed paths are copied,
//! directories are created but not descended into, and every ancestor of a
//! listed path is recreated with its source mode and owner. Ancestors that
//! are symlinks in the source stay symlinks in the target and are resolved
//! inside the source root, never on the host. Directory times are
//! restored once everything is in place.

use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::ffi::{CString, OsString};
use std::fs::{self, FileTimes, Metadata};
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::select::FileList;

/// Symlink hops allowed while resolving one path (same limit as the kernel).
const MAX_SYMLINK_HOPS: usize = 40;

/// Remove `target` if it exists and create it empty.
pub fn recreate_dir(target: &Path) -> Result<()> {
    match fs::remove_dir_all(target) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to remove {}", target.display()))
        }
    }
    fs::create_dir_all(target).with_context(|| format!("Failed to create {}", target.display()))
}

/// Build the target tree from `list`.
///
/// The target is recreated from empty first and gets `proc` and `sys`
/// mount points afterwards. On failure the partial tree is left in place.
pub fn materialize(source_root: &Path, target: &Path, list: &FileList) -> Result<()> {
    recreate_dir(target)?;

    let copier = TreeCopier::new(source_root, target);
    for entry in list.entries() {
        copier
            .copy_entry(entry)
            .with_context(|| {
                format!("Failed to copy {} into {}", entry.display(), target.display())
            })?;
    }

    for mountpoint in ["proc", "sys"] {
        let dir = target.join(mountpoint);
        if !dir.exists() {
            fs::create_dir(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    copier.restore_dir_times()?;

    println!("  Copied {} entries into {}", list.len(), target.display());
    Ok(())
}

/// Copies single list entries from one root to another.
pub struct TreeCopier {
    source: PathBuf,
    target: PathBuf,
    is_root: bool,
}

impl TreeCopier {
    pub fn new(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            // SAFETY: geteuid has no preconditions and cannot fail.
            is_root: unsafe { libc::geteuid() } == 0,
        }
    }

    /// Copy one absolute list entry (`/usr/bin/foo`).
    pub fn copy_entry(&self, entry: impl AsRef<Path>) -> Result<()> {
        let entry = entry.as_ref();
        let relative = entry.strip_prefix("/").unwrap_or(entry);
        let Some(name) = relative.file_name() else {
            // `/` itself: the target root already exists.
            return Ok(());
        };
        let parent = self.resolve_parent(relative.parent().unwrap_or(Path::new("")))?;
        let rel = parent.join(name);

        let src = self.source.join(&rel);
        let meta = fs::symlink_metadata(&src)
            .with_context(|| format!("{} does not exist in the source", src.display()))?;
        let dst = self.target.join(&rel);
        self.copy_node(&src, &dst, &meta)
    }

    /// Walk `relative` component by component inside the source root,
    /// mirroring directories and symlinks into the target. Returns the
    /// symlink-free path the components resolve to.
    fn resolve_parent(&self, relative: &Path) -> Result<PathBuf> {
        let mut resolved = PathBuf::new();
        let mut pending: VecDeque<OsString> = normal_components(relative);
        let mut hops = 0;

        while let Some(name) = pending.pop_front() {
            if name == ".." {
                resolved.pop();
                continue;
            }
            let candidate = resolved.join(&name);
            let src = self.source.join(&candidate);
            let meta = fs::symlink_metadata(&src)
                .with_context(|| format!("{} does not exist in the source", src.display()))?;

            if meta.file_type().is_symlink() {
                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    bail!("too many levels of symbolic links at {}", src.display());
                }
                let link = fs::read_link(&src)?;
                let dst = self.target.join(&candidate);
                if fs::symlink_metadata(&dst).is_err() {
                    self.copy_node(&src, &dst, &meta)?;
                }
                if link.is_absolute() {
                    resolved = PathBuf::new();
                }
                for component in normal_components(&link).into_iter().rev() {
                    pending.push_front(component);
                }
            } else if meta.is_dir() {
                let dst = self.target.join(&candidate);
                if !dst.is_dir() {
                    self.copy_node(&src, &dst, &meta)?;
                }
                resolved = candidate;
            } else {
                bail!("{} is not a directory", src.display());
            }
        }

        Ok(resolved)
    }

    fn copy_node(&self, src: &Path, dst: &Path, meta: &Metadata) -> Result<()> {
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            let present = fs::symlink_metadata(dst)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if present {
                return Ok(());
            }
            let link = fs::read_link(src)?;
            std::os::unix::fs::symlink(&link, dst)
                .with_context(|| format!("Failed to create symlink {}", dst.display()))?;
            self.chown(dst, meta)?;
            return Ok(());
        }

        if file_type.is_dir() {
            if !dst.is_dir() {
                fs::create_dir(dst)
                    .with_context(|| format!("Failed to create {}", dst.display()))?;
            }
        } else if file_type.is_file() {
            fs::copy(src, dst)
                .with_context(|| format!("Failed to copy {}", src.display()))?;
            let times = FileTimes::new()
                .set_accessed(meta.accessed()?)
                .set_modified(meta.modified()?);
            fs::File::open(dst)?.set_times(times)?;
        } else if file_type.is_fifo()
            || file_type.is_socket()
            || file_type.is_char_device()
            || file_type.is_block_device()
        {
            mknod(dst, meta)?;
        } else {
            bail!("unsupported file type at {}", src.display());
        }

        self.chown(dst, meta)?;
        fs::set_permissions(dst, fs::Permissions::from_mode(meta.mode() & 0o7777))
            .with_context(|| format!("Failed to set mode of {}", dst.display()))?;
        Ok(())
    }

    /// Give every directory below the target its source access and
    /// modification times. Runs last: copying into a directory bumps its
    /// mtime.
    pub fn restore_dir_times(&self) -> Result<()> {
        let walker = WalkDir::new(&self.target).min_depth(1).follow_links(false);
        for entry in walker {
            let entry =
                entry.with_context(|| format!("Failed to walk {}", self.target.display()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.target) else {
                continue;
            };
            let meta = match fs::symlink_metadata(self.source.join(relative)) {
                Ok(meta) if meta.is_dir() => meta,
                // Mount points created for the target only.
                _ => continue,
            };
            let times = FileTimes::new()
                .set_accessed(meta.accessed()?)
                .set_modified(meta.modified()?);
            fs::File::open(entry.path())
                .and_then(|dir| dir.set_times(times))
                .with_context(|| format!("Failed to set times of {}", entry.path().display()))?;
        }
        Ok(())
    }

    /// Preserve ownership. Without root, EPERM is expected and skipped.
    fn chown(&self, dst: &Path, meta: &Metadata) -> Result<()> {
        match std::os::unix::fs::lchown(dst, Some(meta.uid()), Some(meta.gid())) {
            Ok(()) => Ok(()),
            Err(e) if !self.is_root && e.kind() == ErrorKind::PermissionDenied => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to chown {}", dst.display())),
        }
    }
}

fn normal_components(path: &Path) -> VecDeque<OsString> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_os_string()),
            Component::ParentDir => Some(OsString::from("..")),
            _ => None,
        })
        .collect()
}

fn mknod(dst: &Path, meta: &Metadata) -> Result<()> {
    let c_path = CString::new(dst.as_os_str().as_bytes())
        .with_context(|| format!("{} contains a NUL byte", dst.display()))?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe {
        libc::mknod(
            c_path.as_ptr(),
            meta.mode() as libc::mode_t,
            meta.rdev() as libc::dev_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("mknod {} failed", dst.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn list(entries: &[&str]) -> FileList {
        let mut list = FileList::new();
        list.extend(entries);
        list
    }

    #[test]
    fn test_recreate_removes_stale_content() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir_all(target.join("old/deep")).unwrap();
        fs::write(target.join("old/deep/leftover"), "stale").unwrap();

        recreate_dir(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_copies_listed_paths_with_modes() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(source.join("usr/bin")).unwrap();
        fs::create_dir_all(source.join("usr/share/unlisted")).unwrap();
        fs::write(source.join("usr/bin/tool"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(source.join("usr/bin/tool"), fs::Permissions::from_mode(0o750))
            .unwrap();
        fs::write(source.join("usr/share/unlisted/file"), "").unwrap();
        std::os::unix::fs::symlink("tool", source.join("usr/bin/alias")).unwrap();

        materialize(
            &source,
            &target,
            &list(&["/usr/bin/tool", "/usr/bin/alias", "/usr/share"]),
        )
        .unwrap();

        let mode = fs::metadata(target.join("usr/bin/tool")).unwrap().mode() & 0o7777;
        assert_eq!(mode, 0o750);
        assert_eq!(fs::read_link(target.join("usr/bin/alias")).unwrap(), Path::new("tool"));
        // Listed directories are created, not descended into.
        assert!(target.join("usr/share").is_dir());
        assert!(!target.join("usr/share/unlisted").exists());
        assert!(target.join("proc").is_dir());
        assert!(target.join("sys").is_dir());
    }

    #[test]
    fn test_symlinked_ancestor_stays_inside_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(source.join("usr/lib")).unwrap();
        fs::write(source.join("usr/lib/libfoo.so"), "elf").unwrap();
        // Absolute link: must resolve inside the source, not on the host.
        std::os::unix::fs::symlink("/usr/lib", source.join("lib")).unwrap();

        materialize(&source, &target, &list(&["/lib/libfoo.so"])).unwrap();

        assert_eq!(fs::read_link(target.join("lib")).unwrap(), Path::new("/usr/lib"));
        assert_eq!(
            fs::read_to_string(target.join("usr/lib/libfoo.so")).unwrap(),
            "elf"
        );
    }

    #[test]
    fn test_symlink_loop_is_an_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(&source).unwrap();
        std::os::unix::fs::symlink("b", source.join("a")).unwrap();
        std::os::unix::fs::symlink("a", source.join("b")).unwrap();

        let err = materialize(&source, &target, &list(&["/a/file"])).unwrap_err();
        assert!(format!("{:#}", err).contains("too many levels"));
    }

    #[test]
    fn test_missing_source_path_fails_and_keeps_partial_tree() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(source.join("etc")).unwrap();
        fs::write(source.join("etc/present"), "").unwrap();

        let result = materialize(&source, &target, &list(&["/etc/present", "/etc/missing"]));

        assert!(result.is_err());
        assert!(target.join("etc/present").exists());
    }

    #[test]
    fn test_fifo_is_recreated() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(&source).unwrap();
        let fifo = CString::new(source.join("pipe").as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(fifo.as_ptr(), 0o644) }, 0);

        materialize(&source, &target, &list(&["/pipe"])).unwrap();

        assert!(fs::symlink_metadata(target.join("pipe"))
            .unwrap()
            .file_type()
            .is_fifo());
    }

    #[test]
    fn test_directory_times_survive_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        fs::create_dir_all(source.join("usr/share/doc")).unwrap();
        fs::write(source.join("usr/share/doc/README"), "").unwrap();

        let old = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
        for dir in ["usr", "usr/share", "usr/share/doc"] {
            fs::File::open(source.join(dir))
                .unwrap()
                .set_times(FileTimes::new().set_accessed(old).set_modified(old))
                .unwrap();
        }

        let files = list(&["/usr/share/doc", "/usr/share/doc/README"]);
        materialize(&source, &target, &files).unwrap();

        for dir in ["usr", "usr/share", "usr/share/doc"] {
            let modified = fs::metadata(target.join(dir)).unwrap().modified().unwrap();
            assert_eq!(modified, old, "mtime of {}", dir);
        }
    }

    #[test]
    fn test_non_utf8_names_are_copied() {
        use std::ffi::OsStr;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let target = temp.path().join("target");
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join(name), "latin").unwrap();

        let mut files = FileList::new();
        files.push(Path::new("/").join(name));
        materialize(&source, &target, &files).unwrap();

        assert_eq!(fs::read_to_string(target.join(name)).unwrap(), "latin");
    }
}
