//! The Artifact Manifest (`files-to-extract`).
//!
//! One absolute path per line, naming what the surrounding build system
//! pulls off the build host afterwards. Earlier build stages may already
//! have written entries, so the file is only ever appended to.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct ArtifactManifest {
    path: PathBuf,
    appended: Vec<PathBuf>,
}

impl ArtifactManifest {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            appended: Vec::new(),
        }
    }

    /// Append one artifact path.
    pub fn append(&mut self, artifact: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        writeln!(file, "{}", artifact.display())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        self.appended.push(artifact.to_path_buf());
        Ok(())
    }

    /// Entries appended during this run, in order.
    pub fn appended(&self) -> &[PathBuf] {
        &self.appended
    }
}
