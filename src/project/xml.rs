//! Minimal XML tree with path queries.
//!
//! Paths are slash separated and relative to the document root element,
//! so `project/buildimage/arch` and `/project/buildimage/arch` both address
//! `<root><project><buildimage><arch>`. Namespace prefixes are dropped.

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::path::Path;

use super::ProjectTree;

/// One XML element with its concatenated text content.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Parsed project file.
#[derive(Debug, Clone)]
pub struct XmlTree {
    root: Element,
}

impl XmlTree {
    /// Read and parse an XML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse an XML document.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().with_context(|| {
                format!("XML error at byte {}", reader.buffer_position())
            })?;
            match event {
                Event::Start(start) => {
                    stack.push(Element {
                        name: local_name(start.local_name().as_ref()),
                        ..Element::default()
                    });
                }
                Event::Empty(start) => {
                    let element = Element {
                        name: local_name(start.local_name().as_ref()),
                        ..Element::default()
                    };
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().context("unbalanced closing tag")?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            bail!("unexpected end of document inside <{}>", stack[stack.len() - 1].name);
        }
        let root = root.context("document has no root element")?;
        Ok(Self { root })
    }

    /// Look up the element at `path`.
    pub fn node(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |element, segment| element.child(segment))
    }
}

impl ProjectTree for XmlTree {
    fn has(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    fn text(&self, path: &str) -> Option<String> {
        self.node(path).map(|e| e.text.trim().to_string())
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => bail!("multiple root elements"),
    }
    Ok(())
}
