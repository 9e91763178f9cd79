//! Splits an operation into an insertion part and a non-insertion part.

use crate::operation::annotations::AnnotationBoundaryMap;
use crate::operation::attributes::{Attributes, AttributesUpdate};
use crate::operation::buffer::DocOpBuffer;
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::{char_len, DocOp};

use super::normalizer::{operation_normalizer, OperationNormalizer, RangeNormalizer};

/// Returns `(insertion, noninsertion)` such that applying `insertion` and
/// then `noninsertion` has the effect of `op`.
///
/// The insertion part keeps only characters and element insertions; the
/// non-insertion part retains over them and carries every deletion,
/// attribute change and annotation boundary.
pub fn decompose(op: &DocOp) -> (DocOp, DocOp) {
    let mut decomposer = Decomposer {
        insertion: RangeNormalizer::new(DocOpBuffer::new()),
        noninsertion: operation_normalizer(),
    };
    op.apply(&mut decomposer);
    (
        decomposer.insertion.finish(),
        decomposer.noninsertion.finish(),
    )
}

struct Decomposer {
    insertion: RangeNormalizer<DocOpBuffer>,
    noninsertion: OperationNormalizer,
}

impl DocOpCursor for Decomposer {
    fn retain(&mut self, item_count: usize) {
        self.insertion.retain(item_count);
        self.noninsertion.retain(item_count);
    }

    fn characters(&mut self, chars: &str) {
        self.insertion.characters(chars);
        self.noninsertion.retain(char_len(chars));
    }

    fn element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.insertion.element_start(element_type, attributes);
        self.noninsertion.retain(1);
    }

    fn element_end(&mut self) {
        self.insertion.element_end();
        self.noninsertion.retain(1);
    }

    fn delete_characters(&mut self, chars: &str) {
        self.insertion.retain(char_len(chars));
        self.noninsertion.delete_characters(chars);
    }

    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.insertion.retain(1);
        self.noninsertion
            .delete_element_start(element_type, attributes);
    }

    fn delete_element_end(&mut self) {
        self.insertion.retain(1);
        self.noninsertion.delete_element_end();
    }

    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes) {
        self.insertion.retain(1);
        self.noninsertion.replace_attributes(old, new);
    }

    fn update_attributes(&mut self, update: &AttributesUpdate) {
        self.insertion.retain(1);
        self.noninsertion.update_attributes(update);
    }

    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap) {
        self.noninsertion.annotation_boundary(map);
    }
}
