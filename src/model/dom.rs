//! The output side of the DOM interface boundary.
//!
//! The model itself never touches a real DOM. Serializers for it produce a
//! recursive description instead, which an outer layer renders: text, an
//! element with a (possibly namespaced) tag name and attributes, or the
//! "hole" that marks the unique place where a node's children belong.

use displaydoc::Display;
use thiserror::Error;

/// Errors in the structure of an output spec.
#[derive(Debug, Copy, Clone, Display, Error, PartialEq, Eq)]
pub enum DomSpecError {
    /// multiple content holes in an output spec
    MultipleHoles,
    /// content hole is not the only child of its parent
    HoleNotAlone,
}

/// A description of a DOM structure produced for a node or mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomSpec {
    /// A text node
    Text(String),
    /// The content hole: the position at which a node's children should be
    /// inserted. Only valid as the sole child of its parent, at most once
    /// per spec.
    Hole,
    /// An element
    Element {
        /// The tag name, optionally prefixed as `"<namespace> <name>"`
        name: String,
        /// Attribute name/value pairs; names may carry the same kind of
        /// namespace prefix
        attrs: Vec<(String, String)>,
        /// The element's children
        children: Vec<DomSpec>,
    },
}

impl DomSpec {
    /// Shorthand for building an element spec.
    pub fn element(
        name: impl Into<String>,
        attrs: Vec<(String, String)>,
        children: Vec<DomSpec>,
    ) -> DomSpec {
        DomSpec::Element {
            name: name.into(),
            attrs,
            children,
        }
    }

    /// Split a possibly namespace-prefixed name into its namespace and
    /// local parts.
    pub fn split_name(name: &str) -> (Option<&str>, &str) {
        match name.find(' ') {
            Some(at) => (Some(&name[..at]), &name[at + 1..]),
            None => (None, name),
        }
    }

    /// Validate the hole invariants for this spec and report whether it
    /// contains a hole: at most one hole may exist in the tree, and a hole
    /// must be the only child of its parent.
    pub fn find_hole(&self) -> Result<bool, DomSpecError> {
        match self {
            DomSpec::Text(_) => Ok(false),
            DomSpec::Hole => Ok(true),
            DomSpec::Element { children, .. } => {
                let mut found = false;
                for child in children {
                    if child.find_hole()? {
                        if found {
                            return Err(DomSpecError::MultipleHoles);
                        }
                        if matches!(child, DomSpec::Hole) && children.len() > 1 {
                            return Err(DomSpecError::HoleNotAlone);
                        }
                        found = true;
                    }
                }
                Ok(found)
            }
        }
    }
}
