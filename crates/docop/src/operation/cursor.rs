//! Visitor interface over operation components.

use super::annotations::AnnotationBoundaryMap;
use super::attributes::{Attributes, AttributesUpdate};
use super::DocOpComponent;

/// Receives the components of an operation one at a time.
///
/// Consuming cursors apply the components to some state (see
/// [`crate::document::DocumentMutator`]); evaluating cursors additionally
/// produce a value once the stream is over.
pub trait DocOpCursor {
    fn retain(&mut self, item_count: usize);
    fn characters(&mut self, chars: &str);
    fn element_start(&mut self, element_type: &str, attributes: &Attributes);
    fn element_end(&mut self);
    fn delete_characters(&mut self, chars: &str);
    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes);
    fn delete_element_end(&mut self);
    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes);
    fn update_attributes(&mut self, update: &AttributesUpdate);
    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap);

    /// Dispatches one component to the matching method.
    fn component(&mut self, component: &DocOpComponent) {
        match component {
            DocOpComponent::Retain(n) => self.retain(*n),
            DocOpComponent::Characters(chars) => self.characters(chars),
            DocOpComponent::ElementStart {
                element_type,
                attributes,
            } => self.element_start(element_type, attributes),
            DocOpComponent::ElementEnd => self.element_end(),
            DocOpComponent::DeleteCharacters(chars) => self.delete_characters(chars),
            DocOpComponent::DeleteElementStart {
                element_type,
                attributes,
            } => self.delete_element_start(element_type, attributes),
            DocOpComponent::DeleteElementEnd => self.delete_element_end(),
            DocOpComponent::ReplaceAttributes { old, new } => self.replace_attributes(old, new),
            DocOpComponent::UpdateAttributes(update) => self.update_attributes(update),
            DocOpComponent::AnnotationBoundary(map) => self.annotation_boundary(map),
        }
    }
}

/// A cursor that yields a value after the last component.
pub trait EvaluatingDocOpCursor: DocOpCursor {
    type Output;

    fn finish(self) -> Self::Output;
}
