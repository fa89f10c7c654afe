//! Kernel and initrd of the build image.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::config::{ScratchLayout, SourceLayout};

/// Copy the architecture's kernel and initrd (following symlinks) to the
/// uniformly named `vmkernel` / `vminitrd` in the scratch area.
pub fn copy_kernel_images(
    source: &SourceLayout,
    scratch: &ScratchLayout,
    arch: &str,
) -> Result<[PathBuf; 2]> {
    let (kernel, initrd) = source.kernel_images(arch);
    for (from, to) in [(&kernel, &scratch.kernel), (&initrd, &scratch.initrd)] {
        fs::copy(from, to).with_context(|| {
            format!("Failed to copy {} to {} ({})", from.display(), to.display(), arch)
        })?;
    }
    Ok([scratch.kernel.clone(), scratch.initrd.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_powerpc_images_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("boot")).unwrap();
        fs::write(root.join("boot/vmlinux-6.1"), "kernel").unwrap();
        std::os::unix::fs::symlink("vmlinux-6.1", root.join("boot/vmlinux")).unwrap();
        fs::write(root.join("boot/initrd.img"), "initrd").unwrap();
        let scratch = ScratchLayout::new(temp.path());

        let copied = copy_kernel_images(&SourceLayout::new(&root), &scratch, "powerpc").unwrap();

        assert_eq!(copied, [scratch.kernel.clone(), scratch.initrd.clone()]);
        assert_eq!(fs::read_to_string(&scratch.kernel).unwrap(), "kernel");
        assert!(!fs::symlink_metadata(&scratch.kernel).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&scratch.initrd).unwrap(), "initrd");
    }

    #[test]
    fn test_missing_kernel_is_an_error() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchLayout::new(temp.path());
        let source = SourceLayout::new(&temp.path().join("empty"));

        assert!(copy_kernel_images(&source, &scratch, "amd64").is_err());
    }
}
