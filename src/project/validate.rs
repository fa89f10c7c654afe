//! Structural validation of a project file.

use std::path::Path;

use super::{ProjectTree, XmlTree};

/// Check that `path` is a well-formed project file with the elements the
/// pipeline relies on. Returns every problem found.
pub fn validate_project(path: &Path) -> Result<(), Vec<String>> {
    let tree = match XmlTree::load(path) {
        Ok(tree) => tree,
        Err(e) => return Err(vec![format!("{:#}", e)]),
    };

    let mut problems = Vec::new();
    for required in ["project", "project/name", "project/version", "target"] {
        if !tree.has(required) {
            problems.push(format!("missing element {}", required));
        }
    }
    for named in ["project/name", "project/version"] {
        if tree.text(named).is_some_and(|t| t.is_empty()) {
            problems.push(format!("element {} is empty", named));
        }
    }
    if tree.has("target/package/cpio") && !tree.has("target/package/cpio/name") {
        problems.push("target/package/cpio requires a name".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}
