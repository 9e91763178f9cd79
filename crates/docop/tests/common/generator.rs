//! Seeded random documents and operations.
//!
//! Annotated operations follow the rules a well-formed edit obeys: every
//! change states the value it replaces (the item's own value when retaining
//! or deleting, the inherited value when inserting), and deleted items are
//! left looking like the item they would be reinserted after.

use std::collections::BTreeMap;

use docop::document::{DocItem, Item};
use docop::operation::annotations::AnnotationBoundaryMapBuilder;
use docop::{
    normalize, AnnotationBoundaryMap, AttributeChange, Attributes, AttributesUpdate, DocOp,
    DocOpBuilder, Document,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

const ALPHABET: &[char] = &['a', 'b', 'c', 'x', 'y', 'é', '字'];
const ANNOTATION_KEYS: &[&str] = &["a", "b"];

type Annotations = BTreeMap<String, String>;

/// Open keys of an operation under construction, with the old and new value
/// of the last change to each.
#[derive(Default)]
struct AnnotationState {
    open: BTreeMap<&'static str, (Option<String>, Option<String>)>,
    /// Item the last retained or inserted position inherits from.
    deletion_base: Option<usize>,
}

impl AnnotationState {
    /// Changes needed before deleting an item annotated with `deleted`.
    /// Open keys keep their new value; keys that are not open are opened
    /// only where the item differs from `deletion_base` after the open
    /// changes.
    fn deletion_boundary(&mut self, items: &[DocItem], deleted: &Annotations) -> AnnotationBoundaryMapBuilder {
        let base = self.deletion_base.map(|index| &items[index].annotations);
        let mut boundary = AnnotationBoundaryMap::builder();
        for &key in ANNOTATION_KEYS {
            let current = deleted.get(key).cloned();
            match self.open.get(key).cloned() {
                Some((old, new)) => {
                    if old != current {
                        boundary = boundary.change(key, current.as_deref(), new.as_deref());
                        self.open.insert(key, (current, new));
                    }
                }
                None => {
                    let target = base.and_then(|annotations| annotations.get(key)).cloned();
                    if target != current {
                        boundary = boundary.change(key, current.as_deref(), target.as_deref());
                        self.open.insert(key, (current, target));
                    }
                }
            }
        }
        boundary
    }

    fn close(self) -> AnnotationBoundaryMapBuilder {
        self.open
            .keys()
            .fold(AnnotationBoundaryMap::builder(), |boundary, key| boundary.end(key))
    }
}

fn with_boundary(builder: DocOpBuilder, boundary: AnnotationBoundaryMapBuilder) -> DocOpBuilder {
    if boundary.is_empty() {
        builder
    } else {
        builder.annotation_boundary(boundary.build())
    }
}

pub struct OpGenerator {
    rng: Xoshiro256StarStar,
}

impl OpGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    fn text(&mut self, max_len: usize) -> String {
        let len = self.rng.gen_range(1..=max_len);
        (0..len)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())])
            .collect()
    }

    fn value(&mut self) -> String {
        format!("v{}", self.rng.gen_range(0..3))
    }

    fn attributes(&mut self) -> Attributes {
        if self.rng.gen_bool(0.5) {
            Attributes::new()
        } else {
            [("k", self.value())].into_iter().collect()
        }
    }

    /// A flat document of text runs and paragraphs.
    pub fn document(&mut self) -> Document {
        let mut builder = DocOpBuilder::new();
        for _ in 0..self.rng.gen_range(0..5) {
            if self.rng.gen_bool(0.5) {
                let text = self.text(4);
                builder = builder.characters(&text);
            } else {
                let attributes = self.attributes();
                builder = builder.element_start("p", attributes);
                if self.rng.gen_bool(0.7) {
                    let text = self.text(3);
                    builder = builder.characters(&text);
                }
                builder = builder.element_end();
            }
        }
        Document::from_initialization(&normalize(&builder.build()))
            .expect("generated initialization applies")
    }

    fn annotation_value(&mut self) -> Option<String> {
        match self.rng.gen_range(0..3) {
            0 => None,
            n => Some(format!("v{}", n - 1)),
        }
    }

    /// Random changes and ends before an item that stays in the document,
    /// plus whatever restatements make open changes match `current`.
    fn kept_boundary(&mut self, state: &mut AnnotationState, current: &Annotations) -> AnnotationBoundaryMapBuilder {
        let mut boundary = AnnotationBoundaryMap::builder();
        for &key in ANNOTATION_KEYS {
            let value = current.get(key).cloned();
            let roll = self.rng.gen_range(0..8);
            match state.open.get(key).cloned() {
                Some(_) if roll == 0 => {
                    boundary = boundary.end(key);
                    state.open.remove(key);
                }
                _ if roll <= 1 => {
                    let new = self.annotation_value();
                    boundary = boundary.change(key, value.as_deref(), new.as_deref());
                    state.open.insert(key, (value, new));
                }
                Some((old, new)) if old != value => {
                    boundary = boundary.change(key, value.as_deref(), new.as_deref());
                    state.open.insert(key, (value, new));
                }
                _ => {}
            }
        }
        boundary
    }

    /// Emits the boundary for keeping `items[index]`; the caller appends
    /// the retain or attribute change.
    fn keep(
        &mut self,
        builder: DocOpBuilder,
        items: &[DocItem],
        index: usize,
        state: Option<&mut AnnotationState>,
    ) -> DocOpBuilder {
        let Some(state) = state else {
            return builder;
        };
        let boundary = self.kept_boundary(state, &items[index].annotations);
        state.deletion_base = Some(index);
        with_boundary(builder, boundary)
    }

    fn maybe_insert(
        &mut self,
        mut builder: DocOpBuilder,
        items: &[DocItem],
        position: usize,
        state: Option<&mut AnnotationState>,
    ) -> DocOpBuilder {
        if !self.rng.gen_bool(0.25) {
            return builder;
        }
        if let Some(state) = state {
            let inherited = position
                .checked_sub(1)
                .map(|left| items[left].annotations.clone())
                .unwrap_or_default();
            let boundary = self.kept_boundary(state, &inherited);
            state.deletion_base = position.checked_sub(1);
            builder = with_boundary(builder, boundary);
        }
        if self.rng.gen_bool(0.7) {
            let text = self.text(3);
            builder.characters(&text)
        } else {
            let attributes = self.attributes();
            let mut builder = builder.element_start("li", attributes);
            if self.rng.gen_bool(0.5) {
                let text = self.text(2);
                builder = builder.characters(&text);
            }
            builder.element_end()
        }
    }

    /// A document whose content carries annotations.
    pub fn annotated_document(&mut self) -> Document {
        let mut document = self.document();
        let op = self.annotated_operation(&document);
        document
            .apply(&op)
            .unwrap_or_else(|e| panic!("annotating with [{op}] failed: {e}"));
        document
    }

    /// A random well-formed operation over `document`.
    pub fn operation(&mut self, document: &Document) -> DocOp {
        self.generate(document, None)
    }

    /// Like [`Self::operation`], also setting, clearing and ending
    /// annotations along the way.
    pub fn annotated_operation(&mut self, document: &Document) -> DocOp {
        self.generate(document, Some(AnnotationState::default()))
    }

    fn generate(&mut self, document: &Document, mut state: Option<AnnotationState>) -> DocOp {
        let items = document.items();
        let mut builder = DocOpBuilder::new();
        let mut index = 0;
        while index < items.len() {
            builder = self.maybe_insert(builder, items, index, state.as_mut());
            match &items[index].item {
                Item::Character(_) => {
                    builder = if self.rng.gen_bool(0.3) {
                        delete_item(builder, items, index, state.as_mut())
                    } else {
                        self.keep(builder, items, index, state.as_mut()).retain(1)
                    };
                    index += 1;
                }
                Item::ElementStart { attributes, .. } => {
                    match self.rng.gen_range(0..10) {
                        0 | 1 => {
                            let end = matching_end(items, index);
                            for deleted in index..=end {
                                builder = delete_item(builder, items, deleted, state.as_mut());
                            }
                            index = end;
                        }
                        2 => {
                            let replacement = self.attributes();
                            builder = self
                                .keep(builder, items, index, state.as_mut())
                                .replace_attributes(attributes.clone(), replacement);
                        }
                        3 => {
                            let change = AttributeChange {
                                name: "k".into(),
                                old_value: attributes.get("k").map(str::to_owned),
                                new_value: Some(self.value()),
                            };
                            builder = self
                                .keep(builder, items, index, state.as_mut())
                                .update_attributes(AttributesUpdate::from_changes([change]));
                        }
                        _ => builder = self.keep(builder, items, index, state.as_mut()).retain(1),
                    }
                    index += 1;
                }
                Item::ElementEnd => {
                    builder = self.keep(builder, items, index, state.as_mut()).retain(1);
                    index += 1;
                }
            }
        }
        builder = self.maybe_insert(builder, items, items.len(), state.as_mut());
        if let Some(state) = state {
            builder = with_boundary(builder, state.close());
        }
        normalize(&builder.build())
    }
}

fn matching_end(items: &[DocItem], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, doc_item) in items[start..].iter().enumerate() {
        match doc_item.item {
            Item::ElementStart { .. } => depth += 1,
            Item::ElementEnd => {
                depth -= 1;
                if depth == 0 {
                    return start + offset;
                }
            }
            Item::Character(_) => {}
        }
    }
    panic!("unbalanced generated document");
}

fn delete_item(
    mut builder: DocOpBuilder,
    items: &[DocItem],
    index: usize,
    state: Option<&mut AnnotationState>,
) -> DocOpBuilder {
    let doc_item = &items[index];
    if let Some(state) = state {
        let boundary = state.deletion_boundary(items, &doc_item.annotations);
        builder = with_boundary(builder, boundary);
    }
    match &doc_item.item {
        Item::Character(c) => builder.delete_characters(&c.to_string()),
        Item::ElementStart {
            element_type,
            attributes,
        } => builder.delete_element_start(element_type, attributes.clone()),
        Item::ElementEnd => builder.delete_element_end(),
    }
}
