//! Element attributes and attribute updates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sorted name → value map attached to an element start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a copy with every change of `update` applied. A change whose
    /// new value is `None` removes the attribute.
    pub fn update_with(&self, update: &AttributesUpdate) -> Attributes {
        let mut map = self.0.clone();
        for change in update.changes() {
            match &change.new_value {
                Some(value) => {
                    map.insert(change.name.clone(), value.clone());
                }
                None => {
                    map.remove(&change.name);
                }
            }
        }
        Attributes(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

/// One entry of an [`AttributesUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl AttributeChange {
    pub fn new(name: impl Into<String>, old_value: Option<&str>, new_value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            old_value: old_value.map(str::to_owned),
            new_value: new_value.map(str::to_owned),
        }
    }
}

/// Sorted, name-unique list of `(name, old, new)` attribute changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributesUpdate(Vec<AttributeChange>);

impl AttributesUpdate {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds an update from changes in any order. When a name repeats, the
    /// later change wins.
    pub fn from_changes(changes: impl IntoIterator<Item = AttributeChange>) -> Self {
        let mut by_name: BTreeMap<String, AttributeChange> = BTreeMap::new();
        for change in changes {
            by_name.insert(change.name.clone(), change);
        }
        Self(by_name.into_values().collect())
    }

    pub fn changes(&self) -> &[AttributeChange] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeChange> {
        self.0
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.0[i])
    }

    /// Sequential composition: for names present in both, the old value
    /// comes from `self` and the new value from `other`.
    pub fn compose_with(&self, other: &AttributesUpdate) -> AttributesUpdate {
        let mut by_name: BTreeMap<&str, AttributeChange> = self
            .0
            .iter()
            .map(|c| (c.name.as_str(), c.clone()))
            .collect();
        for change in &other.0 {
            match by_name.get_mut(change.name.as_str()) {
                Some(existing) => existing.new_value = change.new_value.clone(),
                None => {
                    by_name.insert(change.name.as_str(), change.clone());
                }
            }
        }
        Self(by_name.into_values().collect())
    }

    /// Drops every change whose name is in `names`.
    pub fn exclude<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> AttributesUpdate {
        let names: BTreeSet<&str> = names.into_iter().collect();
        Self(
            self.0
                .iter()
                .filter(|c| !names.contains(c.name.as_str()))
                .cloned()
                .collect(),
        )
    }

    pub fn invert(&self) -> AttributesUpdate {
        Self(
            self.0
                .iter()
                .map(|c| AttributeChange {
                    name: c.name.clone(),
                    old_value: c.new_value.clone(),
                    new_value: c.old_value.clone(),
                })
                .collect(),
        )
    }
}

impl fmt::Display for AttributesUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, change) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}: {} -> {}",
                change.name,
                DisplayValue(&change.old_value),
                DisplayValue(&change.new_value)
            )?;
        }
        f.write_str("}")
    }
}

/// Renders an optional value as `"text"` or `null`.
pub(crate) struct DisplayValue<'a>(pub &'a Option<String>);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value:?}"),
            None => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(changes: &[(&str, Option<&str>, Option<&str>)]) -> AttributesUpdate {
        AttributesUpdate::from_changes(
            changes
                .iter()
                .map(|(name, old, new)| AttributeChange::new(*name, *old, *new)),
        )
    }

    #[test]
    fn update_with_sets_and_removes() {
        let attrs: Attributes = [("href", "a"), ("title", "t")].into_iter().collect();
        let updated = attrs.update_with(&update(&[
            ("href", Some("a"), Some("b")),
            ("title", Some("t"), None),
            ("rel", None, Some("nofollow")),
        ]));
        assert_eq!(updated.get("href"), Some("b"));
        assert_eq!(updated.get("title"), None);
        assert_eq!(updated.get("rel"), Some("nofollow"));
        assert_eq!(attrs.get("title"), Some("t"));
    }

    #[test]
    fn from_changes_sorts_and_keeps_last() {
        let u = update(&[
            ("z", None, Some("1")),
            ("a", None, Some("1")),
            ("z", None, Some("2")),
        ]);
        assert_eq!(u.keys().collect::<Vec<_>>(), vec!["a", "z"]);
        assert_eq!(u.get("z").and_then(|c| c.new_value.as_deref()), Some("2"));
    }

    #[test]
    fn compose_with_takes_old_from_first_and_new_from_second() {
        let first = update(&[("a", Some("1"), Some("2")), ("b", None, Some("x"))]);
        let second = update(&[("a", Some("2"), Some("3")), ("c", Some("k"), None)]);
        let composed = first.compose_with(&second);
        assert_eq!(
            composed,
            update(&[
                ("a", Some("1"), Some("3")),
                ("b", None, Some("x")),
                ("c", Some("k"), None),
            ])
        );
    }

    #[test]
    fn exclude_and_invert() {
        let u = update(&[("a", Some("1"), Some("2")), ("b", None, Some("x"))]);
        assert_eq!(u.exclude(["a"]), update(&[("b", None, Some("x"))]));
        assert_eq!(
            u.invert(),
            update(&[("a", Some("2"), Some("1")), ("b", Some("x"), None)])
        );
        assert_eq!(u.invert().invert(), u);
    }

    #[test]
    fn display_is_compact() {
        let attrs: Attributes = [("a", "b")].into_iter().collect();
        assert_eq!(attrs.to_string(), "{a=\"b\"}");
        let u = update(&[("a", None, Some("b"))]);
        assert_eq!(u.to_string(), "{a: null -> \"b\"}");
    }
}
