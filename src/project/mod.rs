//! Project descriptor access.
//!
//! The pipeline never walks XML itself. It asks a [`ProjectTree`] for
//! presence and text of paths, resolves omitted values through the
//! buildtype [`Defaults`], and works from the typed [`ProjectDescriptor`]
//! built from both.

pub mod defaults;
pub mod descriptor;
pub mod validate;
pub mod xml;

pub use defaults::{resolve_buildtype, Defaults};
pub use descriptor::{Packaging, ProjectDescriptor};
pub use validate::validate_project;
pub use xml::XmlTree;

use anyhow::{bail, Result};

/// Tree-query capability over a parsed project file.
pub trait ProjectTree {
    /// Whether an element exists at `path`.
    fn has(&self, path: &str) -> bool;

    /// Trimmed text of the element at `path`.
    fn text(&self, path: &str) -> Option<String>;
}

/// Text at `path`, or the buildtype default for `key` when the element is absent.
pub fn text_or_default(
    tree: &dyn ProjectTree,
    path: &str,
    defaults: &Defaults,
    key: &str,
) -> Result<String> {
    if let Some(text) = tree.text(path) {
        return Ok(text);
    }
    match defaults.lookup(key) {
        Some(value) => Ok(value.to_string()),
        None => bail!(
            "{} is not set and buildtype '{}' has no default for '{}'",
            path,
            defaults.buildtype(),
            key
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_or_default() {
        let tree = XmlTree::parse(
            "<root><project><buildimage><arch>amd64</arch></buildimage></project></root>",
        )
        .unwrap();
        let defs = Defaults::for_buildtype("armel");

        assert_eq!(
            text_or_default(&tree, "project/buildimage/arch", &defs, "arch").unwrap(),
            "amd64"
        );
        assert_eq!(
            text_or_default(&tree, "project/buildimage/console", &defs, "console").unwrap(),
            "ttyAMA0,115200"
        );
        assert!(text_or_default(&tree, "project/buildimage/foo", &defs, "foo").is_err());
    }
}
