//! Collecting cursor and fluent builder.

use super::annotations::AnnotationBoundaryMap;
use super::attributes::{Attributes, AttributesUpdate};
use super::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use super::{DocOp, DocOpComponent};

/// Records components verbatim and turns them into a [`DocOp`].
#[derive(Debug, Clone, Default)]
pub struct DocOpBuffer {
    components: Vec<DocOpComponent>,
}

impl DocOpBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocOpCursor for DocOpBuffer {
    fn retain(&mut self, item_count: usize) {
        self.components.push(DocOpComponent::Retain(item_count));
    }

    fn characters(&mut self, chars: &str) {
        self.components
            .push(DocOpComponent::Characters(chars.to_owned()));
    }

    fn element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.components.push(DocOpComponent::ElementStart {
            element_type: element_type.to_owned(),
            attributes: attributes.clone(),
        });
    }

    fn element_end(&mut self) {
        self.components.push(DocOpComponent::ElementEnd);
    }

    fn delete_characters(&mut self, chars: &str) {
        self.components
            .push(DocOpComponent::DeleteCharacters(chars.to_owned()));
    }

    fn delete_element_start(&mut self, element_type: &str, attributes: &Attributes) {
        self.components.push(DocOpComponent::DeleteElementStart {
            element_type: element_type.to_owned(),
            attributes: attributes.clone(),
        });
    }

    fn delete_element_end(&mut self) {
        self.components.push(DocOpComponent::DeleteElementEnd);
    }

    fn replace_attributes(&mut self, old: &Attributes, new: &Attributes) {
        self.components.push(DocOpComponent::ReplaceAttributes {
            old: old.clone(),
            new: new.clone(),
        });
    }

    fn update_attributes(&mut self, update: &AttributesUpdate) {
        self.components
            .push(DocOpComponent::UpdateAttributes(update.clone()));
    }

    fn annotation_boundary(&mut self, map: &AnnotationBoundaryMap) {
        self.components
            .push(DocOpComponent::AnnotationBoundary(map.clone()));
    }
}

impl EvaluatingDocOpCursor for DocOpBuffer {
    type Output = DocOp;

    fn finish(self) -> DocOp {
        DocOp::new(self.components)
    }
}

/// Fluent construction of operations, e.g.
/// `DocOpBuilder::new().retain(2).characters("x").retain(3).build()`.
///
/// Components are recorded exactly as given; run the result through
/// [`crate::normalize`] to merge or drop degenerate ranges.
#[derive(Debug, Clone, Default)]
pub struct DocOpBuilder {
    buffer: DocOpBuffer,
}

impl DocOpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(mut self, item_count: usize) -> Self {
        self.buffer.retain(item_count);
        self
    }

    pub fn characters(mut self, chars: &str) -> Self {
        self.buffer.characters(chars);
        self
    }

    pub fn element_start(mut self, element_type: &str, attributes: Attributes) -> Self {
        self.buffer.element_start(element_type, &attributes);
        self
    }

    pub fn element_end(mut self) -> Self {
        self.buffer.element_end();
        self
    }

    pub fn delete_characters(mut self, chars: &str) -> Self {
        self.buffer.delete_characters(chars);
        self
    }

    pub fn delete_element_start(mut self, element_type: &str, attributes: Attributes) -> Self {
        self.buffer.delete_element_start(element_type, &attributes);
        self
    }

    pub fn delete_element_end(mut self) -> Self {
        self.buffer.delete_element_end();
        self
    }

    pub fn replace_attributes(mut self, old: Attributes, new: Attributes) -> Self {
        self.buffer.replace_attributes(&old, &new);
        self
    }

    pub fn update_attributes(mut self, update: AttributesUpdate) -> Self {
        self.buffer.update_attributes(&update);
        self
    }

    pub fn annotation_boundary(mut self, map: AnnotationBoundaryMap) -> Self {
        self.buffer.annotation_boundary(&map);
        self
    }

    pub fn build(self) -> DocOp {
        self.buffer.finish()
    }
}
