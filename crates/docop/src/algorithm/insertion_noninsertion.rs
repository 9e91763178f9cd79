//! Transformation of an insertion-only operation against a non-insertion one.
//!
//! The insertion side plays the client role in the position tracker.
//! Insertions that land inside an element the other side deletes are deleted
//! as well.

use std::mem;

use crate::error::TransformError;
use crate::operation::attributes::{Attributes, AttributesUpdate};
use crate::operation::buffer::DocOpBuffer;
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::{char_len, split_chars, DocOp, DocOpComponent};

use super::normalizer::{operation_normalizer, OperationNormalizer, RangeNormalizer};
use super::position::{interleave, PairTransformer, PositionTracker, Side};

const INSERTION: Side = Side::Client;
const NONINSERTION: Side = Side::Server;

/// Returns `(insertion′, noninsertion′)`.
pub fn transform(
    insertion: &DocOp,
    noninsertion: &DocOp,
) -> Result<(DocOp, DocOp), TransformError> {
    let mut transformer = InsertionNoninsertionTransformer {
        insertion_out: RangeNormalizer::new(DocOpBuffer::new()),
        noninsertion_out: operation_normalizer(),
        positions: PositionTracker::default(),
        range_cache: RangeCache::Retain,
        deletion_depth: 0,
    };
    interleave(&mut transformer, insertion, noninsertion)?;
    Ok((
        transformer.insertion_out.finish(),
        transformer.noninsertion_out.finish(),
    ))
}

/// The part of the last non-insertion component the insertion side has not
/// caught up with yet.
#[derive(Debug)]
enum RangeCache {
    Retain,
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
}

struct InsertionNoninsertionTransformer {
    insertion_out: RangeNormalizer<DocOpBuffer>,
    noninsertion_out: OperationNormalizer,
    positions: PositionTracker,
    range_cache: RangeCache,
    /// Element deletions of the non-insertion side currently open.
    deletion_depth: usize,
}

impl InsertionNoninsertionTransformer {
    fn resolve(&mut self, cache: &mut RangeCache, item_count: usize) {
        match cache {
            RangeCache::Retain => {
                self.noninsertion_out.retain(item_count);
                self.insertion_out.retain(item_count);
            }
            RangeCache::DeleteCharacters(chars) => {
                let (head, tail) = split_chars(chars, item_count);
                self.noninsertion_out.delete_characters(head);
                let rest = tail.to_owned();
                *chars = rest;
            }
            RangeCache::DeleteElementStart {
                element_type,
                attributes,
            } => {
                self.noninsertion_out
                    .delete_element_start(element_type, attributes);
                self.deletion_depth += 1;
            }
            RangeCache::DeleteElementEnd => {
                self.noninsertion_out.delete_element_end();
                self.deletion_depth = self.deletion_depth.saturating_sub(1);
            }
            RangeCache::ReplaceAttributes { old, new } => {
                self.noninsertion_out.replace_attributes(old, new);
                self.insertion_out.retain(1);
            }
            RangeCache::UpdateAttributes(update) => {
                self.noninsertion_out.update_attributes(update);
                self.insertion_out.retain(1);
            }
        }
    }

    fn resolve_cached(&mut self, item_count: usize) {
        let mut cache = mem::replace(&mut self.range_cache, RangeCache::Retain);
        self.resolve(&mut cache, item_count);
        self.range_cache = cache;
    }

    /// Advances the non-insertion side by `size`, resolving whatever part of
    /// `cache` the insertion side has already passed. Returns how much was
    /// resolved when the component sticks out ahead of the insertion side.
    fn resolve_range(&mut self, size: usize, cache: &mut RangeCache) -> Option<usize> {
        let before = self.positions.get(NONINSERTION);
        self.positions.increase(NONINSERTION, size);
        if self.positions.get(NONINSERTION) > 0 {
            if before < 0 {
                self.resolve(cache, before.unsigned_abs());
            }
            (before <= 0).then(|| before.unsigned_abs())
        } else {
            self.resolve(cache, size);
            None
        }
    }

    fn insertion_component(&mut self, component: &DocOpComponent) -> Result<(), TransformError> {
        match component {
            DocOpComponent::Retain(n) => {
                let before = self.positions.get(INSERTION);
                self.positions.increase(INSERTION, *n);
                if self.positions.get(INSERTION) < 0 {
                    self.resolve_cached(*n);
                } else if before < 0 {
                    self.resolve_cached(before.unsigned_abs());
                }
            }
            DocOpComponent::Characters(chars) => {
                if self.deletion_depth > 0 {
                    self.noninsertion_out.delete_characters(chars);
                } else {
                    self.insertion_out.characters(chars);
                    self.noninsertion_out.retain(char_len(chars));
                }
            }
            DocOpComponent::ElementStart {
                element_type,
                attributes,
            } => {
                if self.deletion_depth > 0 {
                    self.noninsertion_out
                        .delete_element_start(element_type, attributes);
                } else {
                    self.insertion_out.element_start(element_type, attributes);
                    self.noninsertion_out.retain(1);
                }
            }
            DocOpComponent::ElementEnd => {
                if self.deletion_depth > 0 {
                    self.noninsertion_out.delete_element_end();
                } else {
                    self.insertion_out.element_end();
                    self.noninsertion_out.retain(1);
                }
            }
            unexpected => {
                return Err(TransformError::Incompatible(format!(
                    "{unexpected} in an insertion-only operation"
                )))
            }
        }
        Ok(())
    }

    fn noninsertion_component(
        &mut self,
        component: &DocOpComponent,
    ) -> Result<(), TransformError> {
        match component {
            DocOpComponent::Retain(n) => {
                let mut cache = RangeCache::Retain;
                self.resolve_range(*n, &mut cache);
                self.range_cache = cache;
            }
            DocOpComponent::DeleteCharacters(chars) => {
                let mut cache = RangeCache::DeleteCharacters(chars.clone());
                if self.resolve_range(char_len(chars), &mut cache).is_some() {
                    self.range_cache = cache;
                }
            }
            DocOpComponent::DeleteElementStart {
                element_type,
                attributes,
            } => {
                let mut cache = RangeCache::DeleteElementStart {
                    element_type: element_type.clone(),
                    attributes: attributes.clone(),
                };
                self.cache_if_unresolved(&mut cache);
            }
            DocOpComponent::DeleteElementEnd => {
                self.cache_if_unresolved(&mut RangeCache::DeleteElementEnd);
            }
            DocOpComponent::ReplaceAttributes { old, new } => {
                self.cache_if_unresolved(&mut RangeCache::ReplaceAttributes {
                    old: old.clone(),
                    new: new.clone(),
                });
            }
            DocOpComponent::UpdateAttributes(update) => {
                self.cache_if_unresolved(&mut RangeCache::UpdateAttributes(update.clone()));
            }
            DocOpComponent::AnnotationBoundary(map) => {
                self.noninsertion_out.annotation_boundary(map);
            }
            unexpected => {
                return Err(TransformError::Incompatible(format!(
                    "{unexpected} in a non-insertion operation"
                )))
            }
        }
        Ok(())
    }

    /// Single-item components are kept for later only when none of them
    /// could be resolved yet.
    fn cache_if_unresolved(&mut self, cache: &mut RangeCache) {
        if self.resolve_range(1, cache) == Some(0) {
            self.range_cache = mem::replace(cache, RangeCache::Retain);
        }
    }
}

impl PairTransformer for InsertionNoninsertionTransformer {
    fn process(&mut self, side: Side, component: &DocOpComponent) -> Result<(), TransformError> {
        match side {
            Side::Client => self.insertion_component(component),
            Side::Server => self.noninsertion_component(component),
        }
    }

    fn positions(&self) -> &PositionTracker {
        &self.positions
    }
}
