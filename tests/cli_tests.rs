//! Exit status of the elbe-rfs binary.

mod helpers;

use std::process::Command;

use helpers::TestEnv;

fn elbe_rfs(env: &TestEnv) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_elbe-rfs"));
    cmd.env("ELBE_SOURCE_ROOT", &env.root)
        .env("ELBE_SCRATCH_DIR", &env.scratch_dir)
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_missing_target_is_usage_error() {
    let env = TestEnv::new();
    let xml = env.project("");
    let status = elbe_rfs(&env)
        .arg("create-target-rfs")
        .arg(&xml)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_help_exits_zero() {
    let env = TestEnv::new();
    let status = elbe_rfs(&env).arg("--help").status().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_validation_failure_exits_twenty() {
    let env = TestEnv::new();
    let xml = env.project_xml("<RootFileSystem><project/></RootFileSystem>");
    let output = elbe_rfs(&env)
        .arg("create-target-rfs")
        .arg(&xml)
        .arg("-t")
        .arg(&env.target)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(20));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing element project/name"), "{}", stderr);
    assert!(!env.target.exists());
}

#[test]
fn test_log_file_option_writes_plain_log() {
    let env = TestEnv::new();
    let xml = env.project_xml("<RootFileSystem><project/></RootFileSystem>");
    let log = env.scratch_dir.join("rfs.log");
    let status = elbe_rfs(&env)
        .env("RUST_LOG", "info")
        .args(["create-target-rfs", "-t"])
        .arg(&env.target)
        .arg("-o")
        .arg(&log)
        .arg(&xml)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(20));
    assert!(log.is_file());
}

#[test]
fn test_show_config_json() {
    let env = TestEnv::new();
    let output = elbe_rfs(&env).args(["show", "config", "--json"]).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value["scratch"]["files_to_extract"],
        env.scratch_dir.join("files-to-extract").display().to_string()
    );
    assert_eq!(value["config"]["tools"]["chroot"], "/usr/sbin/chroot");
}
