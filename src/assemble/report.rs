//! Build report: report tool invocation, partition script and trailer.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::version::{remove_if_present, TOOL_VERSION};
use crate::config::ScratchLayout;
use crate::process::Cmd;
use crate::project::ProjectDescriptor;

/// Append `text` to the report, creating it if needed.
pub fn append_to_report(report: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(report)
        .with_context(|| format!("Failed to open {}", report.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("Failed to append to {}", report.display()))
}

/// Arguments for `<tool> dump`.
pub fn dump_args(
    scratch: &ScratchLayout,
    project: &ProjectDescriptor,
    target: &Path,
) -> Vec<OsString> {
    let path = |p: &Path| p.as_os_str().to_os_string();
    let mut args: Vec<OsString> = vec![
        "dump".into(),
        "--name".into(),
        project.name.clone().into(),
        "--output".into(),
        path(&scratch.report),
        "--validation".into(),
        path(&scratch.validation),
        "--target".into(),
        path(target),
        "--finetuning".into(),
        path(&scratch.finetuning),
        "--kinitrd".into(),
        project.kinitrd.clone().into(),
    ];
    if project.has_archive {
        args.push("--archive".into());
        args.push(path(&scratch.archive));
    }
    args.push(path(&scratch.source_xml));
    args
}

/// Run the report tool, collecting its combined output in `dump.log`.
///
/// Never fails the build: a non-zero exit or a tool that cannot be started
/// is noted in the log. Returns whether the tool succeeded.
pub fn run_report_tool(
    program: &str,
    scratch: &ScratchLayout,
    project: &ProjectDescriptor,
    target: &Path,
) -> Result<bool> {
    remove_if_present(&scratch.dump_log)?;

    let result = Cmd::new(program)
        .args(dump_args(scratch, project, target))
        .append_output_to(&scratch.dump_log)
        .allow_fail()
        .run();

    let note = match result {
        Ok(r) if r.success() => return Ok(true),
        Ok(r) => format!("{} dump exited with code {}\n", program, r.code()),
        Err(e) => format!("{} dump could not run: {:#}\n", program, e),
    };
    tracing::warn!("{}", note.trim_end());
    append_to_report(&scratch.dump_log, &note)?;
    Ok(false)
}

/// Run the partition/image script, appending its output to the report.
pub fn run_part_script(scratch: &ScratchLayout) -> Result<()> {
    Cmd::new(&scratch.part_script)
        .append_output_to(&scratch.report)
        .error_msg(format!("{} failed", scratch.part_script.display()))
        .run()?;
    Ok(())
}

/// Append the fixed trailer: the captured dump log and the tool version.
pub fn append_trailer(scratch: &ScratchLayout) -> Result<()> {
    let dump_log = match fs::read_to_string(&scratch.dump_log) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", scratch.dump_log.display()))
        }
    };
    let trailer = format!(
        "\n\noutput of elbe dump\n-------------------\n{}\n\nbuilt with elbe-rfs v{}\n",
        dump_log, TOOL_VERSION
    );
    append_to_report(&scratch.report, &trailer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Packaging;
    use crate::select::SelectionMode;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn project(has_archive: bool) -> ProjectDescriptor {
        ProjectDescriptor {
            name: "demo".into(),
            version: "1.0".into(),
            arch: "amd64".into(),
            kinitrd: "elbe-bootstrap".into(),
            selection: SelectionMode::Default,
            setsel: false,
            packaging: Packaging::default(),
            has_archive,
        }
    }

    #[test]
    fn test_dump_args() {
        let scratch = ScratchLayout::new(Path::new("/opt/elbe"));
        let args = dump_args(&scratch, &project(false), Path::new("/target"));
        let line: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
        assert_eq!(
            line.join(" "),
            "dump --name demo --output /opt/elbe/elbe-report.txt \
             --validation /opt/elbe/validation.txt --target /target \
             --finetuning /opt/elbe/finetuning.sh --kinitrd elbe-bootstrap \
             /opt/elbe/source.xml"
        );

        let args = dump_args(&scratch, &project(true), Path::new("/target"));
        let archive = args.iter().position(|a| a == "--archive").unwrap();
        assert_eq!(args[archive + 1], "/opt/elbe/archive.tar.bz2");
        assert_eq!(args.last().unwrap(), "/opt/elbe/source.xml");
    }

    #[test]
    #[serial]
    fn test_report_tool_failure_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchLayout::new(temp.path());
        fs::write(&scratch.dump_log, "stale log\n").unwrap();
        let tool = temp.path().join("elbe");
        fs::write(&tool, "#!/bin/sh\necho partial output\nexit 3\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let ok = run_report_tool(
            &tool.to_string_lossy(),
            &scratch,
            &project(false),
            Path::new("/target"),
        )
        .unwrap();

        assert!(!ok);
        let log = fs::read_to_string(&scratch.dump_log).unwrap();
        assert!(!log.contains("stale log"));
        assert!(log.contains("partial output"));
        assert!(log.contains("exited with code 3"));
    }

    #[test]
    fn test_missing_report_tool_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchLayout::new(temp.path());

        let ok = run_report_tool(
            "/nonexistent/elbe",
            &scratch,
            &project(false),
            Path::new("/target"),
        )
        .unwrap();

        assert!(!ok);
        assert!(fs::read_to_string(&scratch.dump_log)
            .unwrap()
            .contains("could not run"));
    }

    #[test]
    fn test_trailer() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchLayout::new(temp.path());
        fs::write(&scratch.report, "report body\n").unwrap();
        fs::write(&scratch.dump_log, "dump said hi\n").unwrap();

        append_trailer(&scratch).unwrap();

        let report = fs::read_to_string(&scratch.report).unwrap();
        assert!(report.starts_with("report body\n\n\noutput of elbe dump\n"));
        assert!(report.contains("dump said hi\n"));
        assert!(report.ends_with(&format!("built with elbe-rfs v{}\n", TOOL_VERSION)));
    }
}
