//! Configuration management for elbe-rfs.
//!
//! Reads configuration from environment variables (`main` loads `.env`
//! first via dotenvy, so the environment wins over the file). Every
//! well-known scratch path is a named field of [`ScratchLayout`], built
//! once and passed to each stage.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::RfsError;

/// Default scratch root shared with the surrounding build tooling.
pub const DEFAULT_SCRATCH_DIR: &str = "/opt/elbe";

/// External programs the pipeline invokes.
#[derive(Debug, Clone, Serialize)]
pub struct Tools {
    /// Report generator, called as `<report> dump ...`.
    pub report: String,
    /// Package relationship query tool.
    pub depends: String,
    pub chroot: String,
    pub mount: String,
    pub umount: String,
    /// Package manager run inside the target chroot.
    pub dpkg: String,
    pub tar: String,
    pub cpio: String,
}

/// elbe-rfs configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Root of the build chroot the image is sourced from (default: /)
    pub source_root: PathBuf,
    /// Scratch root (default: /opt/elbe)
    pub scratch_dir: PathBuf,
    /// Host log shipped in debug mode
    pub syslog: PathBuf,
    pub tools: Tools,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            source_root: PathBuf::from(get("ELBE_SOURCE_ROOT", "/")),
            scratch_dir: PathBuf::from(get("ELBE_SCRATCH_DIR", DEFAULT_SCRATCH_DIR)),
            syslog: PathBuf::from(get("ELBE_SYSLOG", "/var/log/syslog")),
            tools: Tools {
                report: get("ELBE_REPORT_TOOL", "elbe"),
                depends: get("ELBE_DEPENDS_TOOL", "apt-rdepends"),
                chroot: get("ELBE_CHROOT", "/usr/sbin/chroot"),
                mount: get("ELBE_MOUNT", "mount"),
                umount: get("ELBE_UMOUNT", "umount"),
                dpkg: get("ELBE_DPKG", "dpkg"),
                tar: get("ELBE_TAR", "tar"),
                cpio: get("ELBE_CPIO", "cpio"),
            },
        }
    }

    /// Scratch file layout under `scratch_dir`.
    pub fn scratch(&self) -> ScratchLayout {
        ScratchLayout::new(&self.scratch_dir)
    }

    /// Host-side paths under `source_root`.
    pub fn source(&self) -> SourceLayout {
        SourceLayout::new(&self.source_root)
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  ELBE_SOURCE_ROOT:  {}", self.source_root.display());
        println!("  ELBE_SCRATCH_DIR:  {}", self.scratch_dir.display());
        println!("  ELBE_SYSLOG:       {}", self.syslog.display());
        println!("  ELBE_REPORT_TOOL:  {}", self.tools.report);
        println!("  ELBE_DEPENDS_TOOL: {}", self.tools.depends);
        println!("  ELBE_CHROOT:       {}", self.tools.chroot);
        println!("  ELBE_MOUNT:        {}", self.tools.mount);
        println!("  ELBE_UMOUNT:       {}", self.tools.umount);
        println!("  ELBE_DPKG:         {}", self.tools.dpkg);
        println!("  ELBE_TAR:          {}", self.tools.tar);
        println!("  ELBE_CPIO:         {}", self.tools.cpio);
    }
}

/// Well-known files under the scratch root.
#[derive(Debug, Clone, Serialize)]
pub struct ScratchLayout {
    pub root: PathBuf,
    /// Computed File List, one absolute path per line
    pub filelist: PathBuf,
    /// Seed package list (tighten/diet)
    pub pkg_list: PathBuf,
    /// Dependency closure written in diet mode
    pub allpkg_list: PathBuf,
    /// dpkg selection state applied in setsel mode
    pub pkg_selections: PathBuf,
    pub dump_log: PathBuf,
    pub report: PathBuf,
    pub license: PathBuf,
    pub validation: PathBuf,
    pub source_xml: PathBuf,
    pub finetuning: PathBuf,
    pub archive: PathBuf,
    pub part_script: PathBuf,
    pub tar: PathBuf,
    pub kernel: PathBuf,
    pub initrd: PathBuf,
    /// Artifact Manifest read by the surrounding build system
    pub files_to_extract: PathBuf,
}

impl ScratchLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            filelist: root.join("filelist"),
            pkg_list: root.join("pkg-list"),
            allpkg_list: root.join("allpkg-list"),
            pkg_selections: root.join("pkg-selections"),
            dump_log: root.join("dump.log"),
            report: root.join("elbe-report.txt"),
            license: root.join("licence.txt"),
            validation: root.join("validation.txt"),
            source_xml: root.join("source.xml"),
            finetuning: root.join("finetuning.sh"),
            archive: root.join("archive.tar.bz2"),
            part_script: root.join("part-target.sh"),
            tar: root.join("target.tar"),
            kernel: root.join("vmkernel"),
            initrd: root.join("vminitrd"),
            files_to_extract: root.join("files-to-extract"),
        }
    }

    /// Print the scratch files the pipeline reads and writes.
    pub fn print(&self) {
        println!("Scratch layout ({}):", self.root.display());
        for (label, path) in [
            ("file list", &self.filelist),
            ("package list", &self.pkg_list),
            ("closure list", &self.allpkg_list),
            ("selections", &self.pkg_selections),
            ("report", &self.report),
            ("licenses", &self.license),
            ("partition script", &self.part_script),
            ("tar archive", &self.tar),
            ("kernel", &self.kernel),
            ("initrd", &self.initrd),
            ("manifest", &self.files_to_extract),
        ] {
            println!("  {:<17} {}", format!("{}:", label), path.display());
        }
    }

    /// Output path for a cpio archive named in the project.
    pub fn cpio(&self, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/');
        if !plain {
            return Err(RfsError::InvalidCpioName(name.to_string()).into());
        }
        Ok(self.root.join(name))
    }
}

/// Paths inside the build chroot the pipeline reads from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceLayout {
    pub root: PathBuf,
    /// Per-package `.list` / `.conffiles` manifests
    pub dpkg_info: PathBuf,
    /// Per-package documentation, one directory per package
    pub doc_root: PathBuf,
    pub version_file: PathBuf,
    pub proc_dir: PathBuf,
    pub sys_dir: PathBuf,
}

impl SourceLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            dpkg_info: root.join("var/lib/dpkg/info"),
            doc_root: root.join("usr/share/doc"),
            version_file: root.join("etc/elbe_version"),
            proc_dir: root.join("proc"),
            sys_dir: root.join("sys"),
        }
    }

    /// Kernel and initrd images for the given Debian architecture.
    pub fn kernel_images(&self, arch: &str) -> (PathBuf, PathBuf) {
        let (kernel, initrd) = match arch {
            "armel" | "armhf" => ("boot/vmlinuz", "boot/initrd.img"),
            "powerpc" => ("boot/vmlinux", "boot/initrd.img"),
            _ => ("vmlinuz", "initrd.img"),
        };
        (self.root.join(kernel), self.root.join(initrd))
    }
}
