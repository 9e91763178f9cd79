//! Operation data model: components, operations and their building blocks.
//!
//! Lengths are counted in items: one per character (Unicode scalar value),
//! one per element start and one per element end.

pub mod annotations;
pub mod attributes;
pub mod buffer;
pub mod cursor;
pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};

use annotations::AnnotationBoundaryMap;
use attributes::{Attributes, AttributesUpdate};
use cursor::DocOpCursor;

// ── Components ──────────────────────────────────────────────────────────

/// One primitive step of a [`DocOp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocOpComponent {
    Retain(usize),
    Characters(String),
    ElementStart {
        element_type: String,
        attributes: Attributes,
    },
    ElementEnd,
    DeleteCharacters(String),
    DeleteElementStart {
        element_type: String,
        attributes: Attributes,
    },
    DeleteElementEnd,
    ReplaceAttributes {
        old: Attributes,
        new: Attributes,
    },
    UpdateAttributes(AttributesUpdate),
    AnnotationBoundary(AnnotationBoundaryMap),
}

impl DocOpComponent {
    /// Items of the source document this component consumes.
    pub fn initial_len(&self) -> usize {
        match self {
            Self::Retain(n) => *n,
            Self::DeleteCharacters(chars) => char_len(chars),
            Self::DeleteElementStart { .. }
            | Self::DeleteElementEnd
            | Self::ReplaceAttributes { .. }
            | Self::UpdateAttributes(_) => 1,
            Self::Characters(_)
            | Self::ElementStart { .. }
            | Self::ElementEnd
            | Self::AnnotationBoundary(_) => 0,
        }
    }

    /// Items of the resulting document this component produces.
    pub fn resulting_len(&self) -> usize {
        match self {
            Self::Retain(n) => *n,
            Self::Characters(chars) => char_len(chars),
            Self::ElementStart { .. }
            | Self::ElementEnd
            | Self::ReplaceAttributes { .. }
            | Self::UpdateAttributes(_) => 1,
            Self::DeleteCharacters(_)
            | Self::DeleteElementStart { .. }
            | Self::DeleteElementEnd
            | Self::AnnotationBoundary(_) => 0,
        }
    }

    pub fn is_insertion(&self) -> bool {
        matches!(
            self,
            Self::Characters(_) | Self::ElementStart { .. } | Self::ElementEnd
        )
    }
}

impl fmt::Display for DocOpComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain(n) => write!(f, "__{n}"),
            Self::Characters(chars) => write!(f, "++{chars:?}"),
            Self::ElementStart {
                element_type,
                attributes,
            } => write_tag(f, "<", element_type, attributes),
            Self::ElementEnd => f.write_str(">"),
            Self::DeleteCharacters(chars) => write!(f, "--{chars:?}"),
            Self::DeleteElementStart {
                element_type,
                attributes,
            } => write_tag(f, "x<", element_type, attributes),
            Self::DeleteElementEnd => f.write_str("x>"),
            Self::ReplaceAttributes { old, new } => write!(f, "r@{old} -> {new}"),
            Self::UpdateAttributes(update) => write!(f, "u@{update}"),
            Self::AnnotationBoundary(map) => write!(f, "{map}"),
        }
    }
}

fn write_tag(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    element_type: &str,
    attributes: &Attributes,
) -> fmt::Result {
    write!(f, "{open}{element_type}")?;
    for (name, value) in attributes.iter() {
        write!(f, " {name}={value:?}")?;
    }
    f.write_str(">")
}

// ── Operation ───────────────────────────────────────────────────────────

/// Immutable sequence of components turning one document state into another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocOp {
    components: Vec<DocOpComponent>,
}

impl DocOp {
    pub fn new(components: Vec<DocOpComponent>) -> Self {
        Self { components }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[DocOpComponent] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocOpComponent> {
        self.components.iter()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Length of the document this operation applies to.
    pub fn initial_len(&self) -> usize {
        self.components.iter().map(DocOpComponent::initial_len).sum()
    }

    /// Length of the document this operation produces.
    pub fn resulting_len(&self) -> usize {
        self.components
            .iter()
            .map(DocOpComponent::resulting_len)
            .sum()
    }

    /// Feeds every component, in order, to `cursor`.
    pub fn apply<C: DocOpCursor + ?Sized>(&self, cursor: &mut C) {
        for component in &self.components {
            cursor.component(component);
        }
    }

    /// Feeds the component at `index` to `cursor`; out-of-range indices are
    /// ignored and reported as `false`.
    pub fn apply_component<C: DocOpCursor + ?Sized>(&self, index: usize, cursor: &mut C) -> bool {
        match self.components.get(index) {
            Some(component) => {
                cursor.component(component);
                true
            }
            None => false,
        }
    }

    pub fn into_components(self) -> Vec<DocOpComponent> {
        self.components
    }
}

impl From<Vec<DocOpComponent>> for DocOp {
    fn from(components: Vec<DocOpComponent>) -> Self {
        Self::new(components)
    }
}

impl<'a> IntoIterator for &'a DocOp {
    type Item = &'a DocOpComponent;
    type IntoIter = std::slice::Iter<'a, DocOpComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

impl fmt::Display for DocOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

// ── Character helpers ───────────────────────────────────────────────────

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits `s` after `count` characters (or at its end).
pub(crate) fn split_chars(s: &str, count: usize) -> (&str, &str) {
    let at = s
        .char_indices()
        .nth(count)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.split_at(at)
}
