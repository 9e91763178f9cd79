//! Sequential composition of two operations.
//!
//! The composer walks both operands at once. Components of the first
//! operand ("pre") describe what the intermediate document looks like; each
//! one moves the state machine into a `*Post` target that then consumes
//! components of the second operand ("post") until the pre component is
//! used up. Partially consumed ranges are carried in the target itself.
//!
//! Annotation boundaries of either operand are queued and only flushed,
//! reconciled against the other operand's open annotations, right before
//! the next component that touches content.

use std::collections::BTreeMap;
use std::mem;

use tracing::debug;

use crate::error::OperationError;
use crate::operation::annotations::{AnnotationBoundaryMap, ValueUpdate};
use crate::operation::attributes::{Attributes, AttributesUpdate};
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::{char_len, split_chars, DocOp, DocOpComponent};

use super::normalizer::{operation_normalizer, OperationNormalizer};

/// Composes `op1` followed by `op2` into a single operation.
///
/// `op1.resulting_len()` must equal `op2.initial_len()`.
pub fn compose(op1: &DocOp, op2: &DocOp) -> Result<DocOp, OperationError> {
    let op1_resulting = op1.resulting_len();
    let op2_initial = op2.initial_len();
    if op1_resulting != op2_initial {
        debug!(%op1, %op2, op1_resulting, op2_initial, "rejecting composition of mismatched lengths");
        return Err(OperationError::SizeMismatch {
            op1_resulting,
            op2_initial,
        });
    }
    Composer::new().compose(op1, op2).map_err(|error| {
        debug!(%op1, %op2, %error, "composition failed");
        error
    })
}

// ── State ───────────────────────────────────────────────────────────────

/// Where the composer is in the pairing of the two operands.
///
/// `*Pre` targets wait for the next component of the first operand,
/// `*Post` targets wait for the next component of the second one.
#[derive(Debug)]
enum Target {
    DefaultPre,
    /// Second operand retains this many items not yet matched.
    RetainPre(usize),
    /// Second operand deletes these characters not yet matched.
    DeleteCharactersPre(String),
    /// First operand retains this many items not yet matched.
    RetainPost(usize),
    /// First operand inserted these characters not yet matched.
    CharactersPost(String),
    ElementStartPost {
        element_type: String,
        attributes: Attributes,
    },
    ElementEndPost,
    ReplaceAttributesPost {
        old: Attributes,
        new: Attributes,
    },
    UpdateAttributesPost(AttributesUpdate),
    /// First operand is exhausted; only insertions may follow.
    FinisherPost,
}

impl Target {
    fn is_post(&self) -> bool {
        !matches!(
            self,
            Target::DefaultPre | Target::RetainPre(_) | Target::DeleteCharactersPre(_)
        )
    }
}

fn after_retain_pre(count: usize, consumed: usize) -> Target {
    if consumed < count {
        Target::RetainPre(count - consumed)
    } else {
        Target::DefaultPre
    }
}

fn after_retain_post(count: usize, consumed: usize) -> Target {
    if consumed < count {
        Target::RetainPost(count - consumed)
    } else {
        Target::DefaultPre
    }
}

fn structural(message: impl Into<String>) -> OperationError {
    OperationError::Structural(message.into())
}

/// Boundary events held back until the next content component.
#[derive(Debug, Default)]
struct AnnotationQueue {
    events: Vec<AnnotationBoundaryMap>,
}

impl AnnotationQueue {
    fn queue(&mut self, map: &AnnotationBoundaryMap) {
        self.events.push(map.clone());
    }

    fn drain(&mut self) -> Vec<AnnotationBoundaryMap> {
        mem::take(&mut self.events)
    }
}

struct Composer {
    normalizer: OperationNormalizer,
    target: Target,
    /// Annotations the first operand has open.
    pre_annotations: BTreeMap<String, ValueUpdate>,
    /// Annotations the second operand has open.
    post_annotations: BTreeMap<String, ValueUpdate>,
    pre_queue: AnnotationQueue,
    post_queue: AnnotationQueue,
}

impl Composer {
    fn new() -> Self {
        Self {
            normalizer: operation_normalizer(),
            target: Target::DefaultPre,
            pre_annotations: BTreeMap::new(),
            post_annotations: BTreeMap::new(),
            pre_queue: AnnotationQueue::default(),
            post_queue: AnnotationQueue::default(),
        }
    }

    fn compose(mut self, op1: &DocOp, op2: &DocOp) -> Result<DocOp, OperationError> {
        let mismatch = || OperationError::SizeMismatch {
            op1_resulting: op1.resulting_len(),
            op2_initial: op2.initial_len(),
        };
        let mut post_components = op2.iter();
        for component in op1 {
            self.pre(component)?;
            while self.target.is_post() {
                let next = post_components.next().ok_or_else(mismatch)?;
                self.post(next)?;
            }
        }
        if !matches!(self.target, Target::DefaultPre) {
            return Err(mismatch());
        }
        self.target = Target::FinisherPost;
        for component in post_components {
            self.post(component)?;
        }
        self.flush_annotations();
        Ok(self.normalizer.finish())
    }

    // ── Annotation reconciliation ───────────────────────────────────────

    fn flush_pre_annotations(&mut self) {
        for map in self.pre_queue.drain() {
            let mut builder = AnnotationBoundaryMap::builder();
            for key in map.ends() {
                builder = match self.post_annotations.get(key) {
                    Some(post) => builder.change(key, post.old.as_deref(), post.new.as_deref()),
                    None => builder.end(key),
                };
                self.pre_annotations.remove(key);
            }
            for change in map.changes() {
                let new_value = match self.post_annotations.get(&change.key) {
                    Some(post) => post.new.as_deref(),
                    None => change.new_value.as_deref(),
                };
                builder = builder.change(&change.key, change.old_value.as_deref(), new_value);
                self.pre_annotations
                    .insert(change.key.clone(), ValueUpdate::from(change));
            }
            self.normalizer.annotation_boundary(&builder.build());
        }
    }

    fn flush_post_annotations(&mut self) {
        for map in self.post_queue.drain() {
            let mut builder = AnnotationBoundaryMap::builder();
            for key in map.ends() {
                builder = match self.pre_annotations.get(key) {
                    Some(pre) => builder.change(key, pre.old.as_deref(), pre.new.as_deref()),
                    None => builder.end(key),
                };
                self.post_annotations.remove(key);
            }
            for change in map.changes() {
                let old_value = match self.pre_annotations.get(&change.key) {
                    Some(pre) => pre.old.as_deref(),
                    None => change.old_value.as_deref(),
                };
                builder = builder.change(&change.key, old_value, change.new_value.as_deref());
                self.post_annotations
                    .insert(change.key.clone(), ValueUpdate::from(change));
            }
            self.normalizer.annotation_boundary(&builder.build());
        }
    }

    fn flush_annotations(&mut self) {
        self.flush_pre_annotations();
        self.flush_post_annotations();
    }

    // ── First operand ───────────────────────────────────────────────────

    fn pre(&mut self, component: &DocOpComponent) -> Result<(), OperationError> {
        match component {
            DocOpComponent::AnnotationBoundary(map) => {
                self.pre_queue.queue(map);
                return Ok(());
            }
            DocOpComponent::DeleteCharacters(chars) => {
                self.flush_pre_annotations();
                self.normalizer.delete_characters(chars);
                return Ok(());
            }
            DocOpComponent::DeleteElementStart {
                element_type,
                attributes,
            } => {
                self.flush_pre_annotations();
                self.normalizer
                    .delete_element_start(element_type, attributes);
                return Ok(());
            }
            DocOpComponent::DeleteElementEnd => {
                self.flush_pre_annotations();
                self.normalizer.delete_element_end();
                return Ok(());
            }
            _ => {}
        }
        let target = mem::replace(&mut self.target, Target::DefaultPre);
        self.target = self.pre_transition(target, component)?;
        Ok(())
    }

    fn pre_transition(
        &mut self,
        target: Target,
        component: &DocOpComponent,
    ) -> Result<Target, OperationError> {
        match target {
            Target::DefaultPre => match component {
                DocOpComponent::Retain(n) => Ok(Target::RetainPost(*n)),
                DocOpComponent::Characters(chars) => Ok(Target::CharactersPost(chars.clone())),
                DocOpComponent::ElementStart {
                    element_type,
                    attributes,
                } => Ok(Target::ElementStartPost {
                    element_type: element_type.clone(),
                    attributes: attributes.clone(),
                }),
                DocOpComponent::ElementEnd => Ok(Target::ElementEndPost),
                DocOpComponent::ReplaceAttributes { old, new } => {
                    Ok(Target::ReplaceAttributesPost {
                        old: old.clone(),
                        new: new.clone(),
                    })
                }
                DocOpComponent::UpdateAttributes(update) => {
                    Ok(Target::UpdateAttributesPost(update.clone()))
                }
                other => Err(structural(format!("unexpected first-operand component {other}"))),
            },
            Target::RetainPre(count) => {
                self.flush_annotations();
                match component {
                    DocOpComponent::Retain(n) if *n <= count => {
                        self.normalizer.retain(*n);
                        Ok(after_retain_pre(count, *n))
                    }
                    DocOpComponent::Retain(n) => {
                        self.normalizer.retain(count);
                        Ok(Target::RetainPost(n - count))
                    }
                    DocOpComponent::Characters(chars) => {
                        let len = char_len(chars);
                        if len <= count {
                            self.normalizer.characters(chars);
                            Ok(after_retain_pre(count, len))
                        } else {
                            let (head, tail) = split_chars(chars, count);
                            self.normalizer.characters(head);
                            Ok(Target::CharactersPost(tail.to_owned()))
                        }
                    }
                    DocOpComponent::ElementStart {
                        element_type,
                        attributes,
                    } => {
                        self.normalizer.element_start(element_type, attributes);
                        Ok(after_retain_pre(count, 1))
                    }
                    DocOpComponent::ElementEnd => {
                        self.normalizer.element_end();
                        Ok(after_retain_pre(count, 1))
                    }
                    DocOpComponent::ReplaceAttributes { old, new } => {
                        self.normalizer.replace_attributes(old, new);
                        Ok(after_retain_pre(count, 1))
                    }
                    DocOpComponent::UpdateAttributes(update) => {
                        self.normalizer.update_attributes(update);
                        Ok(after_retain_pre(count, 1))
                    }
                    other => Err(structural(format!("unexpected first-operand component {other}"))),
                }
            }
            Target::DeleteCharactersPre(deleted) => {
                self.flush_annotations();
                let deleted_len = char_len(&deleted);
                match component {
                    DocOpComponent::Retain(n) if *n <= deleted_len => {
                        let (head, tail) = split_chars(&deleted, *n);
                        self.normalizer.delete_characters(head);
                        Ok(if tail.is_empty() {
                            Target::DefaultPre
                        } else {
                            Target::DeleteCharactersPre(tail.to_owned())
                        })
                    }
                    DocOpComponent::Retain(n) => {
                        self.normalizer.delete_characters(&deleted);
                        Ok(Target::RetainPost(n - deleted_len))
                    }
                    DocOpComponent::Characters(chars) => {
                        check_deleted_characters(chars, &deleted)?;
                        let len = char_len(chars);
                        if len <= deleted_len {
                            let (_, tail) = split_chars(&deleted, len);
                            Ok(if tail.is_empty() {
                                Target::DefaultPre
                            } else {
                                Target::DeleteCharactersPre(tail.to_owned())
                            })
                        } else {
                            let (_, tail) = split_chars(chars, deleted_len);
                            Ok(Target::CharactersPost(tail.to_owned()))
                        }
                    }
                    other => Err(structural(format!("cannot delete characters across {other}"))),
                }
            }
            post => Err(structural(format!(
                "first-operand component {component} arrived while waiting in {post:?}"
            ))),
        }
    }

    // ── Second operand ──────────────────────────────────────────────────

    fn post(&mut self, component: &DocOpComponent) -> Result<(), OperationError> {
        match component {
            DocOpComponent::AnnotationBoundary(map) => {
                self.post_queue.queue(map);
                return Ok(());
            }
            DocOpComponent::Characters(chars) => {
                self.flush_post_annotations();
                self.normalizer.characters(chars);
                return Ok(());
            }
            DocOpComponent::ElementStart {
                element_type,
                attributes,
            } => {
                self.flush_post_annotations();
                self.normalizer.element_start(element_type, attributes);
                return Ok(());
            }
            DocOpComponent::ElementEnd => {
                self.flush_post_annotations();
                self.normalizer.element_end();
                return Ok(());
            }
            _ => {}
        }
        let target = mem::replace(&mut self.target, Target::DefaultPre);
        self.target = self.post_transition(target, component)?;
        Ok(())
    }

    fn post_transition(
        &mut self,
        target: Target,
        component: &DocOpComponent,
    ) -> Result<Target, OperationError> {
        self.flush_annotations();
        match target {
            Target::RetainPost(count) => match component {
                DocOpComponent::Retain(n) if *n <= count => {
                    self.normalizer.retain(*n);
                    Ok(after_retain_post(count, *n))
                }
                DocOpComponent::Retain(n) => {
                    self.normalizer.retain(count);
                    Ok(Target::RetainPre(n - count))
                }
                DocOpComponent::DeleteCharacters(chars) => {
                    let len = char_len(chars);
                    if len <= count {
                        self.normalizer.delete_characters(chars);
                        Ok(after_retain_post(count, len))
                    } else {
                        let (head, tail) = split_chars(chars, count);
                        self.normalizer.delete_characters(head);
                        Ok(Target::DeleteCharactersPre(tail.to_owned()))
                    }
                }
                DocOpComponent::DeleteElementStart {
                    element_type,
                    attributes,
                } => {
                    self.normalizer
                        .delete_element_start(element_type, attributes);
                    Ok(after_retain_post(count, 1))
                }
                DocOpComponent::DeleteElementEnd => {
                    self.normalizer.delete_element_end();
                    Ok(after_retain_post(count, 1))
                }
                DocOpComponent::ReplaceAttributes { old, new } => {
                    self.normalizer.replace_attributes(old, new);
                    Ok(after_retain_post(count, 1))
                }
                DocOpComponent::UpdateAttributes(update) => {
                    self.normalizer.update_attributes(update);
                    Ok(after_retain_post(count, 1))
                }
                other => Err(structural(format!("unexpected second-operand component {other}"))),
            },
            Target::CharactersPost(inserted) => {
                let inserted_len = char_len(&inserted);
                match component {
                    DocOpComponent::Retain(n) if *n <= inserted_len => {
                        let (head, tail) = split_chars(&inserted, *n);
                        self.normalizer.characters(head);
                        Ok(if tail.is_empty() {
                            Target::DefaultPre
                        } else {
                            Target::CharactersPost(tail.to_owned())
                        })
                    }
                    DocOpComponent::Retain(n) => {
                        self.normalizer.characters(&inserted);
                        Ok(Target::RetainPre(n - inserted_len))
                    }
                    DocOpComponent::DeleteCharacters(chars) => {
                        check_deleted_characters(&inserted, chars)?;
                        let len = char_len(chars);
                        if len <= inserted_len {
                            let (_, tail) = split_chars(&inserted, len);
                            Ok(if tail.is_empty() {
                                Target::DefaultPre
                            } else {
                                Target::CharactersPost(tail.to_owned())
                            })
                        } else {
                            let (_, tail) = split_chars(chars, inserted_len);
                            Ok(Target::DeleteCharactersPre(tail.to_owned()))
                        }
                    }
                    other => Err(structural(format!("cannot apply {other} to inserted characters"))),
                }
            }
            Target::ElementStartPost {
                element_type,
                attributes,
            } => match component {
                DocOpComponent::Retain(n) => {
                    self.normalizer.element_start(&element_type, &attributes);
                    Ok(after_retain_pre(*n, 1))
                }
                DocOpComponent::DeleteElementStart {
                    element_type: deleted_type,
                    ..
                } => {
                    if *deleted_type != element_type {
                        return Err(structural(format!(
                            "deleting element {deleted_type} where {element_type} was inserted"
                        )));
                    }
                    Ok(Target::DefaultPre)
                }
                DocOpComponent::ReplaceAttributes { new, .. } => {
                    self.normalizer.element_start(&element_type, new);
                    Ok(Target::DefaultPre)
                }
                DocOpComponent::UpdateAttributes(update) => {
                    self.normalizer
                        .element_start(&element_type, &attributes.update_with(update));
                    Ok(Target::DefaultPre)
                }
                other => Err(structural(format!("cannot apply {other} to an inserted element start"))),
            },
            Target::ElementEndPost => match component {
                DocOpComponent::Retain(n) => {
                    self.normalizer.element_end();
                    Ok(after_retain_pre(*n, 1))
                }
                DocOpComponent::DeleteElementEnd => Ok(Target::DefaultPre),
                other => Err(structural(format!("cannot apply {other} to an inserted element end"))),
            },
            Target::ReplaceAttributesPost { old, new } => match component {
                DocOpComponent::Retain(n) => {
                    self.normalizer.replace_attributes(&old, &new);
                    Ok(after_retain_pre(*n, 1))
                }
                DocOpComponent::DeleteElementStart { element_type, .. } => {
                    self.normalizer.delete_element_start(element_type, &old);
                    Ok(Target::DefaultPre)
                }
                DocOpComponent::ReplaceAttributes { new: replaced, .. } => {
                    self.normalizer.replace_attributes(&old, replaced);
                    Ok(Target::DefaultPre)
                }
                DocOpComponent::UpdateAttributes(update) => {
                    self.normalizer
                        .replace_attributes(&old, &new.update_with(update));
                    Ok(Target::DefaultPre)
                }
                other => Err(structural(format!("cannot apply {other} to replaced attributes"))),
            },
            Target::UpdateAttributesPost(update) => match component {
                DocOpComponent::Retain(n) => {
                    self.normalizer.update_attributes(&update);
                    Ok(after_retain_pre(*n, 1))
                }
                DocOpComponent::DeleteElementStart {
                    element_type,
                    attributes,
                } => {
                    self.normalizer
                        .delete_element_start(element_type, &attributes.update_with(&update.invert()));
                    Ok(Target::DefaultPre)
                }
                DocOpComponent::ReplaceAttributes { old, new } => {
                    self.normalizer
                        .replace_attributes(&old.update_with(&update.invert()), new);
                    Ok(Target::DefaultPre)
                }
                DocOpComponent::UpdateAttributes(next) => {
                    self.normalizer
                        .update_attributes(&update.compose_with(next));
                    Ok(Target::DefaultPre)
                }
                other => Err(structural(format!("cannot apply {other} to updated attributes"))),
            },
            Target::FinisherPost => Err(structural(format!(
                "second operand continues with {component} past the end of the first"
            ))),
            pre => Err(structural(format!(
                "second-operand component {component} arrived while waiting in {pre:?}"
            ))),
        }
    }
}

/// An insertion and a deletion meeting in the middle must agree on the text.
fn check_deleted_characters(inserted: &str, deleted: &str) -> Result<(), OperationError> {
    if inserted.starts_with(deleted) || deleted.starts_with(inserted) {
        Ok(())
    } else {
        Err(structural(format!(
            "deleting {deleted:?} where {inserted:?} was inserted"
        )))
    }
}
