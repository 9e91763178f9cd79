//! Annotation boundary events.
//!
//! An annotation boundary sits between content components and changes, for
//! every following item until the key is ended, the value of one or more
//! annotation keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::attributes::DisplayValue;

/// `key` goes from `old_value` to `new_value` from this boundary onwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// The `(old, new)` pair tracked for one annotation key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValueUpdate {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl ValueUpdate {
    pub fn new(old: Option<String>, new: Option<String>) -> Self {
        Self { old, new }
    }
}

impl From<&AnnotationChange> for ValueUpdate {
    fn from(change: &AnnotationChange) -> Self {
        Self {
            old: change.old_value.clone(),
            new: change.new_value.clone(),
        }
    }
}

/// Keys ended and keys changed at one boundary. Both lists are sorted and
/// no key appears in both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationBoundaryMap {
    ends: Vec<String>,
    changes: Vec<AnnotationChange>,
}

impl AnnotationBoundaryMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> AnnotationBoundaryMapBuilder {
        AnnotationBoundaryMapBuilder::default()
    }

    pub fn ends(&self) -> &[String] {
        &self.ends
    }

    pub fn changes(&self) -> &[AnnotationChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty() && self.changes.is_empty()
    }
}

impl fmt::Display for AnnotationBoundaryMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("|:")?;
        for change in &self.changes {
            write!(
                f,
                " {}: {} -> {};",
                change.key,
                DisplayValue(&change.old_value),
                DisplayValue(&change.new_value)
            )?;
        }
        if !self.ends.is_empty() {
            write!(f, " end {}", self.ends.join(","))?;
        }
        Ok(())
    }
}

/// Collects ends and changes in any order; a later call for a key replaces
/// an earlier one.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBoundaryMapBuilder {
    entries: BTreeMap<String, Option<ValueUpdate>>,
}

impl AnnotationBoundaryMapBuilder {
    pub fn end(mut self, key: &str) -> Self {
        self.entries.insert(key.to_owned(), None);
        self
    }

    pub fn change(mut self, key: &str, old_value: Option<&str>, new_value: Option<&str>) -> Self {
        self.entries.insert(
            key.to_owned(),
            Some(ValueUpdate::new(
                old_value.map(str::to_owned),
                new_value.map(str::to_owned),
            )),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> AnnotationBoundaryMap {
        let mut map = AnnotationBoundaryMap::default();
        for (key, entry) in self.entries {
            match entry {
                None => map.ends.push(key),
                Some(update) => map.changes.push(AnnotationChange {
                    key,
                    old_value: update.old,
                    new_value: update.new,
                }),
            }
        }
        map
    }
}
