//! Structural inverse of an operation.

use crate::operation::annotations::AnnotationBoundaryMap;
use crate::operation::attributes::{Attributes, AttributesUpdate};
use crate::operation::buffer::DocOpBuffer;
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::DocOp;

/// Returns the operation undoing `op`: insertions become deletions and vice
/// versa, attribute changes swap old and new values.
///
/// Annotation changes swap their values too, but ended keys stay ended, so
/// the inverse of an operation that ends a key still ends it.
pub fn invert(op: &DocOp) -> DocOp {
    let mut inverter = DocOpInverter::new(DocOpBuffer::new());
    op.apply(&mut inverter);
    inverter.finish()
}

/// Cursor proxy forwarding the inverse of every component to `target`.
#[derive(Debug)]
pub struct DocOpInverter<C> {
    target: C,
}

impl<C: DocOpCursor> DocOpInverter<C> {
    pub fn new(target: C) -> Self {
        Self { target }
    }
}

impl<C: DocOpCursor> DocOpCursor for DocOpInverter<C> {
    fn retain(&mut self, item_count: usize) {
        self.target.retain(item_count);
    }

    fn characters(&mut self, chars: &str) {
        self.target.delete_characters(chars);
    }

    fn element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.target.delete_element_start(element_type, attributes);
    }

    fn element_end(&mut self) {
        self.target.delete_element_end();
    }

    fn delete_characters(&mut self, chars: &str) {
        self.target.characters(chars);
    }

    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.target.element_start(element_type, attributes);
    }

    fn delete_element_end(&mut self) {
        self.target.element_end();
    }

    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes) {
        self.target.replace_attributes(new, old);
    }

    fn update_attributes(&mut self, update: &AttributesUpdate) {
        self.target.update_attributes(&update.invert());
    }

    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap) {
        let mut builder = AnnotationBoundaryMap::builder();
        for key in map.ends() {
            builder = builder.end(key);
        }
        for change in map.changes() {
            builder = builder.change(
                &change.key,
                change.new_value.as_deref(),
                change.old_value.as_deref(),
            );
        }
        self.target.annotation_boundary(&builder.build());
    }
}

impl<C: EvaluatingDocOpCursor> EvaluatingDocOpCursor for DocOpInverter<C> {
    type Output = C::Output;

    fn finish(self) -> C::Output {
        self.target.finish()
    }
}
