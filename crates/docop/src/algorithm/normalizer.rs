//! Normalizing cursor proxies.
//!
//! [`RangeNormalizer`] merges adjacent ranges of the same kind and drops
//! empty ones. [`AnnotationsNormalizer`] defers annotation boundaries until
//! the next content component and emits only the changes that actually
//! differ from what downstream has already seen.

use std::collections::BTreeMap;
use std::mem;

use crate::operation::annotations::{AnnotationBoundaryMap, ValueUpdate};
use crate::operation::attributes::{Attributes, AttributesUpdate};
use crate::operation::buffer::DocOpBuffer;
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::DocOp;

/// The normalizer every algorithm writes its output through.
pub type OperationNormalizer = AnnotationsNormalizer<RangeNormalizer<DocOpBuffer>>;

pub fn operation_normalizer() -> OperationNormalizer {
    AnnotationsNormalizer::new(RangeNormalizer::new(DocOpBuffer::new()))
}

/// Re-emits `op` in canonical form.
pub fn normalize(op: &DocOp) -> DocOp {
    let mut normalizer = operation_normalizer();
    op.apply(&mut normalizer);
    normalizer.finish()
}

// ── Range normalization ─────────────────────────────────────────────────

#[derive(Debug, Default)]
enum PendingRange {
    #[default]
    Nothing,
    Retain(usize),
    Characters(String),
    DeleteCharacters(String),
}

#[derive(Debug)]
pub struct RangeNormalizer<C> {
    target: C,
    pending: PendingRange,
}

impl<C: DocOpCursor> RangeNormalizer<C> {
    pub fn new(target: C) -> Self {
        Self {
            target,
            pending: PendingRange::Nothing,
        }
    }

    fn flush(&mut self) {
        match mem::take(&mut self.pending) {
            PendingRange::Nothing => {}
            PendingRange::Retain(n) => self.target.retain(n),
            PendingRange::Characters(chars) => self.target.characters(&chars),
            PendingRange::DeleteCharacters(chars) => self.target.delete_characters(&chars),
        }
    }
}

impl<C: DocOpCursor> DocOpCursor for RangeNormalizer<C> {
    fn retain(&mut self, item_count: usize) {
        if item_count == 0 {
            return;
        }
        if let PendingRange::Retain(pending) = &mut self.pending {
            *pending += item_count;
        } else {
            self.flush();
            self.pending = PendingRange::Retain(item_count);
        }
    }

    fn characters(&mut self, chars: &str) {
        if chars.is_empty() {
            return;
        }
        if let PendingRange::Characters(pending) = &mut self.pending {
            pending.push_str(chars);
        } else {
            self.flush();
            self.pending = PendingRange::Characters(chars.to_owned());
        }
    }

    fn element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.flush();
        self.target.element_start(element_type, attributes);
    }

    fn element_end(&mut self) {
        self.flush();
        self.target.element_end();
    }

    fn delete_characters(&mut self, chars: &str) {
        if chars.is_empty() {
            return;
        }
        if let PendingRange::DeleteCharacters(pending) = &mut self.pending {
            pending.push_str(chars);
        } else {
            self.flush();
            self.pending = PendingRange::DeleteCharacters(chars.to_owned());
        }
    }

    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.flush();
        self.target.delete_element_start(element_type, attributes);
    }

    fn delete_element_end(&mut self) {
        self.flush();
        self.target.delete_element_end();
    }

    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes) {
        self.flush();
        self.target.replace_attributes(old, new);
    }

    fn update_attributes(&mut self, update: &AttributesUpdate) {
        self.flush();
        self.target.update_attributes(update);
    }

    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap) {
        self.flush();
        self.target.annotation_boundary(map);
    }
}

impl<C: EvaluatingDocOpCursor> EvaluatingDocOpCursor for RangeNormalizer<C> {
    type Output = C::Output;

    fn finish(mut self) -> C::Output {
        self.flush();
        self.target.finish()
    }
}

// ── Annotation normalization ────────────────────────────────────────────

#[derive(Debug)]
pub struct AnnotationsNormalizer<C> {
    target: C,
    /// Value last emitted downstream per open key.
    tracker: BTreeMap<String, ValueUpdate>,
    /// Boundary state received since the last content component; `None`
    /// marks an end.
    pending: BTreeMap<String, Option<ValueUpdate>>,
}

impl<C: DocOpCursor> AnnotationsNormalizer<C> {
    pub fn new(target: C) -> Self {
        Self {
            target,
            tracker: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut builder = AnnotationBoundaryMap::builder();
        for (key, entry) in mem::take(&mut self.pending) {
            match entry {
                None => {
                    if self.tracker.remove(&key).is_some() {
                        builder = builder.end(&key);
                    }
                }
                Some(update) => {
                    if self.tracker.get(&key) != Some(&update) {
                        builder = builder.change(&key, update.old.as_deref(), update.new.as_deref());
                        self.tracker.insert(key, update);
                    }
                }
            }
        }
        if !builder.is_empty() {
            self.target.annotation_boundary(&builder.build());
        }
    }
}

impl<C: DocOpCursor> DocOpCursor for AnnotationsNormalizer<C> {
    fn retain(&mut self, item_count: usize) {
        if item_count > 0 {
            self.flush();
            self.target.retain(item_count);
        }
    }

    fn characters(&mut self, chars: &str) {
        if !chars.is_empty() {
            self.flush();
            self.target.characters(chars);
        }
    }

    fn element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.flush();
        self.target.element_start(element_type, attributes);
    }

    fn element_end(&mut self) {
        self.flush();
        self.target.element_end();
    }

    fn delete_characters(&mut self, chars: &str) {
        if !chars.is_empty() {
            self.flush();
            self.target.delete_characters(chars);
        }
    }

    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.flush();
        self.target.delete_element_start(element_type, attributes);
    }

    fn delete_element_end(&mut self) {
        self.flush();
        self.target.delete_element_end();
    }

    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes) {
        self.flush();
        self.target.replace_attributes(old, new);
    }

    fn update_attributes(&mut self, update: &AttributesUpdate) {
        self.flush();
        self.target.update_attributes(update);
    }

    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap) {
        for key in map.ends() {
            self.pending.insert(key.clone(), None);
        }
        for change in map.changes() {
            self.pending
                .insert(change.key.clone(), Some(ValueUpdate::from(change)));
        }
    }
}

impl<C: EvaluatingDocOpCursor> EvaluatingDocOpCursor for AnnotationsNormalizer<C> {
    type Output = C::Output;

    fn finish(mut self) -> C::Output {
        self.flush();
        self.target.finish()
    }
}
