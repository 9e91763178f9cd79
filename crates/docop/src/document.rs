//! A minimal in-memory document that operations can be applied to.
//!
//! The document is a flat list of items (characters, element starts and
//! element ends), each carrying its annotation map. Inserted items take the
//! annotations of the item just before the insertion point in the document
//! being edited (none at the very start), overridden by whatever the
//! operation's open annotation boundaries set. Items the same operation has
//! already written to its left do not count.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::operation::annotations::AnnotationBoundaryMap;
use crate::operation::attributes::{Attributes, AttributesUpdate};
use crate::operation::buffer::DocOpBuffer;
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::DocOp;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("operation reads past the end of the document at position {position}")]
    OutOfBounds { position: usize },
    #[error("position {position}: expected {expected}, found {found}")]
    Mismatch {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("operation covers {covered} items but the document has {len}")]
    LengthMismatch { covered: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Character(char),
    ElementStart {
        element_type: String,
        attributes: Attributes,
    },
    ElementEnd,
}

impl Item {
    fn describe(&self) -> String {
        match self {
            Item::Character(c) => format!("character {c:?}"),
            Item::ElementStart { element_type, .. } => format!("element start <{element_type}>"),
            Item::ElementEnd => "element end".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocItem {
    pub item: Item,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    items: Vec<DocItem>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document by applying an insertion-only operation to the
    /// empty document.
    pub fn from_initialization(op: &DocOp) -> Result<Self, DocumentError> {
        let mut document = Self::new();
        document.apply(op)?;
        Ok(document)
    }

    /// Applies `op`. On error the document is left unchanged.
    pub fn apply(&mut self, op: &DocOp) -> Result<(), DocumentError> {
        let mut mutator = DocumentMutator::new(self);
        op.apply(&mut mutator);
        let items = mutator.finish()?;
        self.items = items;
        Ok(())
    }

    pub fn items(&self) -> &[DocItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The characters of the document, ignoring element markup.
    pub fn text(&self) -> String {
        self.items
            .iter()
            .filter_map(|i| match i.item {
                Item::Character(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// The insertion-only operation rebuilding this document from empty.
    pub fn to_initialization(&self) -> DocOp {
        let mut buffer = DocOpBuffer::new();
        let mut active: BTreeMap<&str, Option<&str>> = BTreeMap::new();
        let mut pending_chars = String::new();

        for doc_item in &self.items {
            let mut builder = AnnotationBoundaryMap::builder();
            let keys: Vec<&str> = active
                .keys()
                .copied()
                .chain(doc_item.annotations.keys().map(String::as_str))
                .collect();
            for key in keys {
                let wanted = doc_item.annotations.get(key).map(String::as_str);
                let current = active.get(key).copied().flatten();
                if wanted != current {
                    builder = builder.change(key, None, wanted);
                    active.insert(key, wanted);
                }
            }
            if !builder.is_empty() {
                if !pending_chars.is_empty() {
                    buffer.characters(&std::mem::take(&mut pending_chars));
                }
                buffer.annotation_boundary(&builder.build());
            }
            match &doc_item.item {
                Item::Character(c) => pending_chars.push(*c),
                Item::ElementStart {
                    element_type,
                    attributes,
                } => {
                    if !pending_chars.is_empty() {
                        buffer.characters(&std::mem::take(&mut pending_chars));
                    }
                    buffer.element_start(element_type, attributes);
                }
                Item::ElementEnd => {
                    if !pending_chars.is_empty() {
                        buffer.characters(&std::mem::take(&mut pending_chars));
                    }
                    buffer.element_end();
                }
            }
        }
        if !pending_chars.is_empty() {
            buffer.characters(&pending_chars);
        }
        if !active.is_empty() {
            let mut builder = AnnotationBoundaryMap::builder();
            for key in active.keys() {
                builder = builder.end(key);
            }
            buffer.annotation_boundary(&builder.build());
        }
        buffer.finish()
    }
}

/// Consuming cursor producing the items of the mutated document.
///
/// The first failure is remembered and every later component is ignored.
pub struct DocumentMutator<'a> {
    source: &'a [DocItem],
    position: usize,
    output: Vec<DocItem>,
    /// Annotation values set by the currently open boundaries; `None`
    /// clears the key.
    annotation_updates: BTreeMap<String, Option<String>>,
    error: Option<DocumentError>,
}

impl<'a> DocumentMutator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            source: &document.items,
            position: 0,
            output: Vec::with_capacity(document.items.len()),
            annotation_updates: BTreeMap::new(),
            error: None,
        }
    }

    pub fn finish(self) -> Result<Vec<DocItem>, DocumentError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.position != self.source.len() {
            return Err(DocumentError::LengthMismatch {
                covered: self.position,
                len: self.source.len(),
            });
        }
        Ok(self.output)
    }

    fn fail(&mut self, error: DocumentError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn next_item(&mut self) -> Option<&'a DocItem> {
        if self.error.is_some() {
            return None;
        }
        match self.source.get(self.position) {
            Some(item) => {
                self.position += 1;
                Some(item)
            }
            None => {
                self.fail(DocumentError::OutOfBounds {
                    position: self.position,
                });
                None
            }
        }
    }

    /// Consumes the next item, requiring it to equal `expected`.
    fn expect_item(&mut self, expected: &Item) -> Option<&'a DocItem> {
        let found = self.next_item()?;
        if found.item == *expected {
            Some(found)
        } else {
            self.fail(DocumentError::Mismatch {
                position: self.position - 1,
                expected: expected.describe(),
                found: found.item.describe(),
            });
            None
        }
    }

    /// Consumes the next item, requiring it to be an element start.
    fn expect_element_start(&mut self) -> Option<(&'a str, &'a Attributes)> {
        let found = self.next_item()?;
        match &found.item {
            Item::ElementStart {
                element_type,
                attributes,
            } => Some((element_type.as_str(), attributes)),
            other => {
                self.fail(DocumentError::Mismatch {
                    position: self.position - 1,
                    expected: "element start".to_owned(),
                    found: other.describe(),
                });
                None
            }
        }
    }

    fn annotate(&self, annotations: &mut BTreeMap<String, String>) {
        for (key, value) in &self.annotation_updates {
            match value {
                Some(value) => {
                    annotations.insert(key.clone(), value.clone());
                }
                None => {
                    annotations.remove(key);
                }
            }
        }
    }

    fn push_retained(&mut self, mut doc_item: DocItem) {
        self.annotate(&mut doc_item.annotations);
        self.output.push(doc_item);
    }

    fn push_inserted(&mut self, item: Item) {
        if self.error.is_some() {
            return;
        }
        let mut annotations = self
            .position
            .checked_sub(1)
            .and_then(|left| self.source.get(left))
            .map(|left| left.annotations.clone())
            .unwrap_or_default();
        self.annotate(&mut annotations);
        self.output.push(DocItem { item, annotations });
    }
}

impl DocOpCursor for DocumentMutator<'_> {
    fn retain(&mut self, item_count: usize) {
        for _ in 0..item_count {
            match self.next_item() {
                Some(doc_item) => self.push_retained(doc_item.clone()),
                None => return,
            }
        }
    }

    fn characters(&mut self, chars: &str) {
        for c in chars.chars() {
            self.push_inserted(Item::Character(c));
        }
    }

    fn element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.push_inserted(Item::ElementStart {
            element_type: element_type.to_owned(),
            attributes: attributes.clone(),
        });
    }

    fn element_end(&mut self) {
        self.push_inserted(Item::ElementEnd);
    }

    fn delete_characters(&mut self, chars: &str) {
        for c in chars.chars() {
            if self.expect_item(&Item::Character(c)).is_none() {
                return;
            }
        }
    }

    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.expect_item(&Item::ElementStart {
            element_type: element_type.to_owned(),
            attributes: attributes.clone(),
        });
    }

    fn delete_element_end(&mut self) {
        self.expect_item(&Item::ElementEnd);
    }

    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes) {
        let Some((element_type, attributes)) = self.expect_element_start() else {
            return;
        };
        if attributes != old {
            self.fail(DocumentError::Mismatch {
                position: self.position - 1,
                expected: format!("attributes {old}"),
                found: format!("attributes {attributes}"),
            });
            return;
        }
        let annotations = self.source[self.position - 1].annotations.clone();
        self.push_retained(DocItem {
            item: Item::ElementStart {
                element_type: element_type.to_owned(),
                attributes: new.clone(),
            },
            annotations,
        });
    }

    fn update_attributes(&mut self, update: &AttributesUpdate) {
        let Some((element_type, attributes)) = self.expect_element_start() else {
            return;
        };
        for change in update.changes() {
            let current = attributes.get(&change.name);
            if current != change.old_value.as_deref() {
                self.fail(DocumentError::Mismatch {
                    position: self.position - 1,
                    expected: format!("attribute {}={:?}", change.name, change.old_value),
                    found: format!("attribute {}={:?}", change.name, current),
                });
                return;
            }
        }
        let annotations = self.source[self.position - 1].annotations.clone();
        self.push_retained(DocItem {
            item: Item::ElementStart {
                element_type: element_type.to_owned(),
                attributes: attributes.update_with(update),
            },
            annotations,
        });
    }

    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap) {
        for key in map.ends() {
            self.annotation_updates.remove(key);
        }
        for change in map.changes() {
            self.annotation_updates
                .insert(change.key.clone(), change.new_value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::attributes::AttributeChange;
    use crate::operation::buffer::DocOpBuilder;

    fn doc(text: &str) -> Document {
        Document::from_initialization(&DocOpBuilder::new().characters(text).build()).unwrap()
    }

    #[test]
    fn applies_insertions_and_deletions() {
        let mut d = doc("abcd");
        let op = DocOpBuilder::new()
            .retain(1)
            .delete_characters("bc")
            .characters("XY")
            .retain(1)
            .build();
        d.apply(&op).unwrap();
        assert_eq!(d.text(), "aXYd");
        assert_eq!(d.len(), 4);
    }

    #[test]
    fn rejects_wrong_deletion_without_mutating() {
        let mut d = doc("abc");
        let op = DocOpBuilder::new().delete_characters("ax").retain(1).build();
        let err = d.apply(&op).unwrap_err();
        assert!(matches!(err, DocumentError::Mismatch { position: 1, .. }));
        assert_eq!(d.text(), "abc");
    }

    #[test]
    fn rejects_short_and_long_operations() {
        let mut d = doc("abc");
        assert_eq!(
            d.apply(&DocOpBuilder::new().retain(2).build()),
            Err(DocumentError::LengthMismatch { covered: 2, len: 3 })
        );
        assert_eq!(
            d.apply(&DocOpBuilder::new().retain(4).build()),
            Err(DocumentError::OutOfBounds { position: 3 })
        );
    }

    #[test]
    fn element_attributes_are_replaced_and_updated() {
        let mut d = Document::from_initialization(
            &DocOpBuilder::new()
                .element_start("p", [("k", "1")].into_iter().collect())
                .element_end()
                .build(),
        )
        .unwrap();
        let update = AttributesUpdate::from_changes([AttributeChange::new("k", Some("1"), Some("2"))]);
        d.apply(&DocOpBuilder::new().update_attributes(update).retain(1).build())
            .unwrap();
        let replaced: Attributes = [("z", "9")].into_iter().collect();
        d.apply(
            &DocOpBuilder::new()
                .replace_attributes([("k", "2")].into_iter().collect(), replaced.clone())
                .retain(1)
                .build(),
        )
        .unwrap();
        assert_eq!(
            d.items()[0].item,
            Item::ElementStart {
                element_type: "p".into(),
                attributes: replaced,
            }
        );
    }

    #[test]
    fn inserted_items_inherit_left_annotations() {
        let mut d = doc("ab");
        d.apply(
            &DocOpBuilder::new()
                .annotation_boundary(AnnotationBoundaryMap::builder().change("b", None, Some("1")).build())
                .retain(2)
                .annotation_boundary(AnnotationBoundaryMap::builder().end("b").build())
                .build(),
        )
        .unwrap();
        d.apply(&DocOpBuilder::new().retain(2).characters("c").build())
            .unwrap();
        assert_eq!(d.items()[2].annotations.get("b").map(String::as_str), Some("1"));
        d.apply(&DocOpBuilder::new().characters("z").retain(3).build())
            .unwrap();
        assert!(d.items()[0].annotations.is_empty());
    }

    #[test]
    fn insertions_inherit_from_the_edited_document_not_the_output() {
        let mut d = doc("ab");
        d.apply(
            &DocOpBuilder::new()
                .retain(1)
                .annotation_boundary(AnnotationBoundaryMap::builder().change("k", None, Some("1")).build())
                .retain(1)
                .annotation_boundary(AnnotationBoundaryMap::builder().end("k").build())
                .build(),
        )
        .unwrap();
        // Deleting "b" and inserting after it: the inserted item sits where
        // "b" was and inherits its annotation even though "a" precedes it in
        // the result.
        d.apply(
            &DocOpBuilder::new()
                .retain(1)
                .delete_characters("b")
                .characters("X")
                .build(),
        )
        .unwrap();
        assert_eq!(d.text(), "aX");
        assert_eq!(d.items()[1].annotations.get("k").map(String::as_str), Some("1"));

        // Clearing the annotation on "X" and inserting right after it in the
        // same operation: the insertion still inherits the value "X" had
        // before the operation.
        d.apply(
            &DocOpBuilder::new()
                .retain(1)
                .annotation_boundary(AnnotationBoundaryMap::builder().change("k", Some("1"), None).build())
                .retain(1)
                .annotation_boundary(AnnotationBoundaryMap::builder().end("k").build())
                .characters("Y")
                .build(),
        )
        .unwrap();
        assert_eq!(d.text(), "aXY");
        assert!(d.items()[1].annotations.is_empty());
        assert_eq!(d.items()[2].annotations.get("k").map(String::as_str), Some("1"));
    }

    #[test]
    fn initialization_round_trips_annotated_content() {
        let mut d = doc("abcd");
        d.apply(
            &DocOpBuilder::new()
                .retain(1)
                .annotation_boundary(AnnotationBoundaryMap::builder().change("s", None, Some("x")).build())
                .retain(2)
                .annotation_boundary(AnnotationBoundaryMap::builder().end("s").build())
                .retain(1)
                .build(),
        )
        .unwrap();
        let init = d.to_initialization();
        assert_eq!(crate::operation::validate::validate(&init), Ok(()));
        assert_eq!(Document::from_initialization(&init).unwrap(), d);
    }
}
