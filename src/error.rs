//! Errors the CLI has to tell apart.
//!
//! Most failures travel as `anyhow::Error` with context attached. The
//! variants here are the ones that decide the exit status or that callers
//! (and tests) match on.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for bad arguments or a missing target directory.
pub const EXIT_USAGE: u8 = 1;
/// Exit status for a project file that fails validation.
pub const EXIT_VALIDATION: u8 = 20;

#[derive(Error, Debug)]
pub enum RfsError {
    /// The project XML did not pass validation.
    #[error("xml validation of {} failed:\n  {}", path.display(), problems.join("\n  "))]
    Validation { path: PathBuf, problems: Vec<String> },

    /// Both `target/tighten` and `target/diet` are present.
    #[error("project selects both 'tighten' and 'diet'; only one selection mode may be set")]
    ConflictingSelection,

    /// Tighten and diet need the seed package list.
    #[error("package list {} not found", path.display())]
    MissingPackageList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dpkg purge inside the target failed (mounts were already released).
    #[error("package purge inside {} failed", target.display())]
    PurgeFailed {
        target: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// `target/package/cpio/name` is not a plain file name.
    #[error("invalid cpio archive name '{0}'")]
    InvalidCpioName(String),
}

impl RfsError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RfsError::Validation { .. } | RfsError::ConflictingSelection => EXIT_VALIDATION,
            _ => 1,
        }
    }
}

/// Exit status for an arbitrary pipeline error chain.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RfsError>())
        .map(RfsError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_validation_exit_code() {
        let err = RfsError::Validation {
            path: PathBuf::from("/tmp/p.xml"),
            problems: vec!["missing project/name".into()],
        };
        assert_eq!(err.exit_code(), EXIT_VALIDATION);
        assert!(err.to_string().contains("missing project/name"));
    }

    #[test]
    fn test_exit_code_found_through_context() {
        let err: anyhow::Error = Err::<(), _>(RfsError::ConflictingSelection)
            .context("selecting files")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_VALIDATION);
    }

    #[test]
    fn test_other_errors_exit_one() {
        let err = anyhow::anyhow!("rsync exploded");
        assert_eq!(exit_code_for(&err), 1);

        let err: anyhow::Error = RfsError::InvalidCpioName("a/b".into()).into();
        assert_eq!(exit_code_for(&err), 1);
    }
}
