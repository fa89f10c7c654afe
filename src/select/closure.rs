//! Runtime dependency closure of a package list.
//!
//! The relationship query tool (apt-rdepends) prints a tree: every package
//! of the closure on an unindented line, followed by indented
//! `Depends:`/`PreDepends:` lines. Flattening the tree means keeping the
//! unindented lines.

use anyhow::Result;
use std::collections::HashSet;

use crate::process::Cmd;

/// Something that can render the dependency tree of a package set.
pub trait DependencySource {
    /// Tree-formatted closure output for `packages`.
    fn query(&self, packages: &[String]) -> Result<String>;
}

/// `apt-rdepends` on the build host.
pub struct AptRdepends {
    program: String,
}

impl AptRdepends {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DependencySource for AptRdepends {
    fn query(&self, packages: &[String]) -> Result<String> {
        let result = Cmd::new(&self.program)
            .args(packages)
            .error_msg(format!("{} failed to resolve dependencies", self.program))
            .run()?;
        Ok(result.stdout)
    }
}

/// Flatten tree output into unique package names, first occurrence first.
pub fn parse_tree(output: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    output
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .map(str::trim)
        // Package names never contain whitespace; apt progress chatter does.
        .filter(|line| !line.is_empty() && !line.contains(char::is_whitespace))
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

/// Transitive runtime dependencies of `packages`, including the packages
/// themselves. A failing tool fails the closure.
pub fn resolve_closure(source: &dyn DependencySource, packages: &[String]) -> Result<Vec<String>> {
    if packages.is_empty() {
        return Ok(Vec::new());
    }
    let output = source.query(packages)?;
    Ok(parse_tree(&output))
}
