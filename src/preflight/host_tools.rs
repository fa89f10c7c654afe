//! Host tool and scratch area checks.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::config::Config;
use crate::process;
use crate::project::ProjectDescriptor;
use crate::select::SelectionMode;

use super::types::CheckResult;

/// Which external tools a run will call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Needs {
    pub depends: bool,
    pub chroot: bool,
    pub tar: bool,
    pub cpio: bool,
}

impl Needs {
    /// Everything, for checks without a project file.
    pub const ALL: Needs = Needs {
        depends: true,
        chroot: true,
        tar: true,
        cpio: true,
    };

    pub fn for_project(project: &ProjectDescriptor) -> Self {
        Self {
            depends: project.selection == SelectionMode::Diet,
            chroot: project.setsel,
            tar: project.packaging.tar,
            cpio: project.packaging.cpio.is_some(),
        }
    }
}

/// Check that the configured tools are installed.
pub fn check_host_tools(config: &Config, needs: Needs, strict_needs: bool) -> Vec<CheckResult> {
    let tools = &config.tools;
    let checks = [
        (&tools.report, "elbe", "Writes the build report", true),
        (&tools.depends, "apt-rdepends", "Resolves diet dependencies", needs.depends),
        (&tools.chroot, "coreutils", "Runs dpkg inside the target (setsel)", needs.chroot),
        (&tools.mount, "mount", "Bind mounts /proc and /sys (setsel)", needs.chroot),
        (&tools.umount, "mount", "Releases the bind mounts (setsel)", needs.chroot),
        (&tools.tar, "tar", "Packs target.tar", needs.tar),
        (&tools.cpio, "cpio", "Packs the cpio archive", needs.cpio),
    ];

    checks
        .into_iter()
        .map(|(tool, package, purpose, needed)| {
            check_tool_exists(tool, package, purpose, needed || !strict_needs)
        })
        .collect()
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}

/// Check the scratch area and the seed files the project will read.
pub fn check_scratch(config: &Config, project: Option<&ProjectDescriptor>) -> Vec<CheckResult> {
    let scratch = config.scratch();
    let source = config.source();
    let mut results = Vec::new();

    results.push(check_exists("scratch directory", &scratch.root, true));
    results.push(check_executable("partition script", &scratch.part_script));
    results.push(check_exists("documentation root", &source.doc_root, true));

    if let Some(project) = project {
        if project.selection != SelectionMode::Default {
            results.push(check_exists("package list", &scratch.pkg_list, true));
        }
        if project.setsel {
            results.push(check_exists("package selections", &scratch.pkg_selections, true));
            // SAFETY: geteuid has no preconditions and cannot fail.
            if unsafe { libc::geteuid() } == 0 {
                results.push(CheckResult::pass("root privileges"));
            } else {
                results.push(CheckResult::warn(
                    "root privileges",
                    "setsel needs root for mount and chroot",
                ));
            }
        }
    }

    results
}

fn check_exists(name: &str, path: &Path, required: bool) -> CheckResult {
    if path.exists() {
        CheckResult::pass_with(name, &path.display().to_string())
    } else if required {
        CheckResult::fail(name, &format!("{} does not exist", path.display()))
    } else {
        CheckResult::warn(name, &format!("{} does not exist", path.display()))
    }
}

fn check_executable(name: &str, path: &Path) -> CheckResult {
    match path.metadata() {
        Ok(meta) if meta.is_file() && meta.permissions().mode() & 0o111 != 0 => {
            CheckResult::pass_with(name, &path.display().to_string())
        }
        Ok(_) => CheckResult::fail(name, &format!("{} is not executable", path.display())),
        Err(_) => CheckResult::fail(name, &format!("{} does not exist", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::types::CheckStatus;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn config(vars: &[(&str, String)]) -> Config {
        let map: HashMap<&str, String> = vars.iter().cloned().collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_unneeded_missing_tool_only_warns() {
        let config = config(&[
            ("ELBE_REPORT_TOOL", "sh".into()),
            ("ELBE_CPIO", "nonexistent_cpio_12345".into()),
        ]);
        let needs = Needs {
            cpio: false,
            ..Needs::ALL
        };

        let results = check_host_tools(&config, needs, true);
        let cpio = results
            .iter()
            .find(|r| r.name == "nonexistent_cpio_12345")
            .unwrap();
        assert_eq!(cpio.status, CheckStatus::Warn);

        let results = check_host_tools(&config, Needs::ALL, true);
        let cpio = results
            .iter()
            .find(|r| r.name == "nonexistent_cpio_12345")
            .unwrap();
        assert_eq!(cpio.status, CheckStatus::Fail);
    }

    #[test]
    fn test_scratch_checks() {
        let temp = TempDir::new().unwrap();
        let config = config(&[
            ("ELBE_SCRATCH_DIR", temp.path().display().to_string()),
            ("ELBE_SOURCE_ROOT", temp.path().join("root").display().to_string()),
        ]);
        fs::write(temp.path().join("part-target.sh"), "#!/bin/sh\n").unwrap();

        let results = check_scratch(&config, None);
        let status = |name: &str| results.iter().find(|r| r.name == name).unwrap().status;

        assert_eq!(status("scratch directory"), CheckStatus::Pass);
        assert_eq!(status("partition script"), CheckStatus::Fail);
        assert_eq!(status("documentation root"), CheckStatus::Fail);
    }
}
