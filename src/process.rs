//! Centralized command execution with consistent error handling.
//!
//! Every external program the pipeline touches (report tool, dependency
//! query, chroot, mount helpers, archivers) goes through [`Cmd`]. Commands
//! are always an argument vector, never a shell string, and every invocation
//! is logged as `[CMD] ...` before it runs.

use anyhow::{bail, Context, Result};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured stdout as a string (empty when stdout was redirected).
    pub stdout: String,
    /// Captured stderr as a string (empty when stderr was redirected).
    pub stderr: String,
}

impl CommandResult {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get the exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Where the child's stdin comes from.
enum Input {
    Null,
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Where the child's output goes.
enum Output {
    /// Capture stdout and stderr separately.
    Capture,
    /// Write stdout to a file (truncating), capture stderr.
    StdoutFile(PathBuf),
    /// Append stdout and stderr, interleaved, to a file.
    AppendCombined(PathBuf),
}

/// Builder for configuring command execution.
pub struct Cmd {
    program: OsString,
    /// Raw arguments; paths are passed through byte for byte.
    args: Vec<OsString>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
    input: Input,
    output: Output,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
    /// Custom error message prefix.
    error_prefix: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            input: Input::Null,
            output: Output::Capture,
            allow_fail: false,
            error_prefix: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_os_string());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.envs
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Feed the given bytes to the child's stdin.
    pub fn stdin_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.input = Input::Bytes(bytes.into());
        self
    }

    /// Connect the child's stdin to a file.
    pub fn stdin_file(mut self, path: &Path) -> Self {
        self.input = Input::File(path.to_path_buf());
        self
    }

    /// Write the child's stdout into `path`, replacing any previous content.
    pub fn stdout_file(mut self, path: &Path) -> Self {
        self.output = Output::StdoutFile(path.to_path_buf());
        self
    }

    /// Append stdout and stderr (interleaved) to `path`.
    pub fn append_output_to(mut self, path: &Path) -> Self {
        self.output = Output::AppendCombined(path.to_path_buf());
        self
    }

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// The command line as it is logged.
    pub fn display(&self) -> String {
        let mut line = self.name().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn name(&self) -> Cow<'_, str> {
        self.program.to_string_lossy()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run the command and capture output.
    pub fn run(self) -> Result<CommandResult> {
        tracing::info!("[CMD] {}", self.display());

        let mut cmd = self.command();

        let stdin_bytes = match &self.input {
            Input::Null => {
                cmd.stdin(Stdio::null());
                None
            }
            Input::Bytes(bytes) => {
                cmd.stdin(Stdio::piped());
                Some(bytes.clone())
            }
            Input::File(path) => {
                let file = File::open(path)
                    .with_context(|| {
                        format!("Failed to open stdin for '{}': {}", self.name(), path.display())
                    })?;
                cmd.stdin(Stdio::from(file));
                None
            }
        };

        match &self.output {
            Output::Capture => {
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());
            }
            Output::StdoutFile(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                cmd.stdout(Stdio::from(file));
                cmd.stderr(Stdio::piped());
            }
            Output::AppendCombined(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                let err = file.try_clone()?;
                cmd.stdout(Stdio::from(file));
                cmd.stderr(Stdio::from(err));
            }
        }

        let mut child = cmd.spawn().with_context(|| {
            format!("Failed to execute '{}'. Is it installed?", self.name())
        })?;

        // Feed stdin from a separate thread so a child filling its stdout
        // pipe cannot deadlock against us.
        let writer = match (stdin_bytes, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => {
                Some(std::thread::spawn(move || stdin.write_all(&bytes)))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for '{}'", self.name()))?;

        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| anyhow::anyhow!("stdin writer for '{}' panicked", self.name()))?
                .with_context(|| format!("Failed to write stdin of '{}'", self.name()))?;
        }

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !self.allow_fail && !result.success() {
            let prefix = self
                .error_prefix
                .clone()
                .unwrap_or_else(|| format!("'{}' failed", self.name()));

            let stderr = result.stderr_trimmed();
            if stderr.is_empty() {
                bail!("{} (exit code {})", prefix, result.code());
            } else {
                bail!("{} (exit code {}):\n{}", prefix, result.code(), stderr);
            }
        }

        Ok(result)
    }
}

// =============================================================================
// Lookup helpers
// =============================================================================

/// Check if a program exists in PATH (or is an existing path).
///
/// Returns the full path if found, None otherwise.
pub fn which(program: &str) -> Option<String> {
    which::which(program)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

/// Check if a program exists in PATH (bool version).
pub fn exists(program: &str) -> bool {
    which(program).is_some()
}
