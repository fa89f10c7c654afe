//! Shared test utilities for elbe-rfs tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use elbe_rfs::config::{Config, ScratchLayout, SourceLayout};

/// Test environment: a fake build chroot, a scratch area, a target
/// directory and a bin directory for stand-in tools.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Source root (build chroot stand-in)
    pub root: PathBuf,
    /// Scratch area
    pub scratch_dir: PathBuf,
    /// Target directory (build destination)
    pub target: PathBuf,
    /// Fake tool scripts
    pub bin: PathBuf,
    vars: HashMap<String, String>,
}

impl TestEnv {
    /// Create a new test environment with the usual chroot skeleton.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let root = base.join("root");
        let scratch_dir = base.join("scratch");
        let target = base.join("target");
        let bin = base.join("bin");

        for dir in [
            root.join("var/lib/dpkg/info"),
            root.join("usr/share/doc"),
            root.join("etc"),
            root.join("proc"),
            root.join("sys"),
            scratch_dir.clone(),
            bin.clone(),
        ] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        let mut env = Self {
            _temp_dir: temp_dir,
            root,
            scratch_dir,
            target,
            bin,
            vars: HashMap::new(),
        };
        env.set("ELBE_SOURCE_ROOT", &env.root.display().to_string());
        env.set("ELBE_SCRATCH_DIR", &env.scratch_dir.display().to_string());
        env.set("ELBE_SYSLOG", &env.root.join("var/log/syslog").display().to_string());

        let report = env.fake_tool("elbe", "echo \"dump of $3\"");
        env.set("ELBE_REPORT_TOOL", &report);
        env.part_script("echo 'partitioning done'");
        env
    }

    /// Override a configuration variable.
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn config(&self) -> Config {
        Config::from_lookup(|key| self.vars.get(key).cloned())
    }

    pub fn scratch(&self) -> ScratchLayout {
        self.config().scratch()
    }

    pub fn source(&self) -> SourceLayout {
        self.config().source()
    }

    /// Write an executable `/bin/sh` script into the bin directory.
    pub fn fake_tool(&self, name: &str, body: &str) -> String {
        let path = self.bin.join(name);
        write_script(&path, body);
        path.display().to_string()
    }

    /// Write the scratch area's partition script.
    pub fn part_script(&self, body: &str) {
        write_script(&self.scratch().part_script, body);
    }

    /// Write a project file with the given `target` element body.
    pub fn project(&self, target: &str) -> PathBuf {
        self.project_xml(&format!(
            "<RootFileSystem>\
               <project><name>demo</name><version>1.0</version>\
                 <buildimage><arch>amd64</arch><kinitrd>elbe-bootstrap</kinitrd></buildimage>\
               </project>\
               <target>{}</target>\
             </RootFileSystem>",
            target
        ))
    }

    pub fn project_xml(&self, xml: &str) -> PathBuf {
        let path = self.scratch_dir.join("source.xml");
        fs::write(&path, xml).expect("Failed to write project file");
        path
    }

    /// Install a package: its `.list` manifest and the listed files.
    pub fn install(&self, package: &str, files: &[&str]) {
        let info = self.source().dpkg_info;
        let mut manifest = String::from("/.\n");
        for file in files {
            manifest.push_str(file);
            manifest.push('\n');
            create_file(&self.root.join(file.trim_start_matches('/')), package);
        }
        fs::write(info.join(format!("{}.list", package)), manifest)
            .expect("Failed to write manifest");
    }

    /// Mark files of an installed package as configuration files.
    pub fn conffiles(&self, package: &str, files: &[&str]) {
        let info = self.source().dpkg_info;
        let mut manifest = String::new();
        for file in files {
            manifest.push_str(file);
            manifest.push('\n');
            create_file(&self.root.join(file.trim_start_matches('/')), package);
        }
        fs::write(info.join(format!("{}.conffiles", package)), manifest)
            .expect("Failed to write conffiles");
    }

    pub fn pkg_list(&self, packages: &[&str]) {
        let mut content = packages.join("\n");
        content.push('\n');
        fs::write(self.scratch().pkg_list, content).expect("Failed to write pkg-list");
    }
}

pub fn write_script(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create script dir");
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("Failed to set permissions");
}

pub fn create_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to create file");
}

/// Every path below `dir`, relative and sorted.
pub fn tree(dir: &Path) -> Vec<String> {
    let mut paths: Vec<String> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .map(|e| e.expect("Failed to walk tree"))
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .expect("walk escaped its root")
                .display()
                .to_string()
        })
        .collect();
    paths.sort();
    paths
}

/// Lines of a text file.
pub fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
        .lines()
        .map(str::to_string)
        .collect()
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}
