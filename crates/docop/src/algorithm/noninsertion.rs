//! Transformation of two operations that only retain, delete, change
//! attributes and set annotations.
//!
//! Besides interleaving the ranges, each side keeps track of the annotation
//! state of both operands. Concurrent annotation changes to the same key
//! resolve in favour of the client, and deletions on one side do not leak
//! the other side's annotation changes across the deleted range.
//!
//! Concurrent attribute changes to one element follow a different rule: a
//! replacement beats an update whichever side made it, and between two
//! changes of the same kind the side whose component reached the element
//! first wins. The client component is always the one that is cached, so in
//! practice that is the client, except that a server replacement overrides
//! a client update.

use std::collections::BTreeMap;
use std::mem;

use crate::error::TransformError;
use crate::operation::annotations::{AnnotationBoundaryMap, AnnotationBoundaryMapBuilder, ValueUpdate};
use crate::operation::attributes::{AttributeChange, Attributes, AttributesUpdate};
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::{char_len, split_chars, DocOp, DocOpComponent};

use super::normalizer::{operation_normalizer, OperationNormalizer};
use super::position::{interleave, pair_mut, PairTransformer, PositionTracker, Side};

/// Returns `(client′, server′)`.
pub fn transform(client: &DocOp, server: &DocOp) -> Result<(DocOp, DocOp), TransformError> {
    let mut transformer = NoninsertionTransformer {
        parties: [Party::new(), Party::new()],
        positions: PositionTracker::default(),
    };
    interleave(&mut transformer, client, server)?;
    let [client_party, server_party] = transformer.parties;
    Ok((client_party.output.finish(), server_party.output.finish()))
}

// ── Per-side state ──────────────────────────────────────────────────────

/// What one side still owes from its last component.
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

/// The component of the side that is catching up, trimmed to the overlap.
#[derive(Debug, Clone, Copy)]
enum Resolver<'a> {
    Retain,
    DeleteCharacters(&'a str),
    DeleteElementStart {
        element_type: &'a str,
        attributes: &'a Attributes,
    },
    DeleteElementEnd,
    ReplaceAttributes {
        old: &'a Attributes,
        new: &'a Attributes,
    },
    UpdateAttributes(&'a AttributesUpdate),
}

#[derive(Debug, Default)]
struct AnnotationTracker {
    /// Annotation state of this side's input operation.
    tracked: BTreeMap<String, ValueUpdate>,
    /// Annotation state of this side's output operation.
    active: BTreeMap<String, ValueUpdate>,
    /// Output state saved while a deletion temporarily overrides it.
    temporary: BTreeMap<String, Option<ValueUpdate>>,
    /// Output changes since the two sides last moved over the same range,
    /// with the value each key had before (`None` if it was not active).
    propagating: BTreeMap<String, Option<ValueUpdate>>,
}

struct Party {
    output: OperationNormalizer,
    range_cache: RangeCache,
    annotations: AnnotationTracker,
}

impl Party {
    fn new() -> Self {
        Self {
            output: operation_normalizer(),
            range_cache: RangeCache::Retain,
            annotations: AnnotationTracker::default(),
        }
    }

    /// Records the annotation state of this side's input.
    fn register(&mut self, map: &AnnotationBoundaryMap) {
        for key in map.ends() {
            self.annotations.tracked.remove(key);
        }
        for change in map.changes() {
            self.annotations
                .tracked
                .insert(change.key.clone(), ValueUpdate::from(change));
        }
    }

    /// Emits `map` on this side's output and updates the output state.
    fn commit(&mut self, map: &AnnotationBoundaryMap) {
        let tracker = &mut self.annotations;
        for key in map.ends() {
            if !tracker.propagating.contains_key(key) {
                let previous = tracker.active.get(key).cloned();
                tracker.propagating.insert(key.clone(), previous);
            }
            tracker.active.remove(key);
        }
        for change in map.changes() {
            let update = ValueUpdate::from(change);
            let previous = tracker.active.get(&change.key).cloned();
            if previous.as_ref() != Some(&update) {
                if !tracker.propagating.contains_key(&change.key) {
                    tracker.propagating.insert(change.key.clone(), previous);
                }
                tracker.active.insert(change.key.clone(), update);
            }
        }
        self.output.annotation_boundary(map);
    }

    /// Before deleting, switches this side's output annotations to whatever
    /// the other side has changed since they last moved together, so the
    /// deletion matches the document the other side has produced.
    fn commence_deletion(&mut self, other: &Party) {
        let mut builder = AnnotationBoundaryMap::builder();
        for (key, update) in &other.annotations.propagating {
            let own = self.annotations.active.get(key).cloned();
            let other_active = other.annotations.active.get(key);
            match update {
                Some(update) => {
                    let old = match (&own, other_active) {
                        (Some(own), _) => own.old.as_deref(),
                        (None, Some(active)) => active.new.as_deref(),
                        (None, None) => update.old.as_deref(),
                    };
                    builder = builder.change(key, old, update.new.as_deref());
                }
                None => {
                    if let Some(active) = other_active {
                        let new = match &own {
                            Some(own) => own.new.as_deref(),
                            None => active.old.as_deref(),
                        };
                        builder = builder.change(key, active.new.as_deref(), new);
                    }
                }
            }
            self.annotations.temporary.insert(key.clone(), own);
        }
        self.commit(&builder.build());
    }

    /// Restores the output annotations saved by [`Self::commence_deletion`].
    fn conclude_deletion(&mut self) {
        let mut builder = AnnotationBoundaryMap::builder();
        for (key, saved) in mem::take(&mut self.annotations.temporary) {
            builder = match saved {
                Some(update) => builder.change(&key, update.old.as_deref(), update.new.as_deref()),
                None => builder.end(&key),
            };
        }
        self.annotations.propagating.clear();
        self.commit(&builder.build());
    }

    fn delete_characters(&mut self, other: &Party, chars: &str) {
        self.commence_deletion(other);
        self.output.delete_characters(chars);
        self.conclude_deletion();
    }

    fn delete_element_start(&mut self, other: &Party, element_type: &str, attributes: &Attributes) {
        self.commence_deletion(other);
        self.output.delete_element_start(element_type, attributes);
        self.conclude_deletion();
    }

    fn delete_element_end(&mut self, other: &Party) {
        self.commence_deletion(other);
        self.output.delete_element_end();
        self.conclude_deletion();
    }
}

/// Both sides move over the same item: annotation changes no longer need
/// to be propagated into deletions.
fn sync(this: &mut Party, other: &mut Party) {
    this.annotations.propagating.clear();
    other.annotations.propagating.clear();
}

// ── Transformer ─────────────────────────────────────────────────────────

struct NoninsertionTransformer {
    /// Client and server, in that order.
    parties: [Party; 2],
    positions: PositionTracker,
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Client => 0,
        Side::Server => 1,
    }
}

fn incompatible(resolver: Resolver<'_>) -> TransformError {
    TransformError::Incompatible(format!(
        "{resolver:?} cannot meet the other side's pending range"
    ))
}

impl NoninsertionTransformer {
    /// Advances `side` by `size`. When the component overlaps what the
    /// other side has already cached, resolves the overlap. Returns how much
    /// was resolved when the component sticks out ahead of the other side.
    fn resolve_range(
        &mut self,
        side: Side,
        size: usize,
        resolver: Resolver<'_>,
    ) -> Result<Option<usize>, TransformError> {
        let before = self.positions.get(side);
        self.positions.increase(side, size);
        if self.positions.get(side) > 0 {
            if before < 0 {
                self.resolve(side, resolver, before.unsigned_abs())?;
            }
            Ok((before <= 0).then(|| before.unsigned_abs()))
        } else {
            self.resolve(side, resolver, size)?;
            Ok(None)
        }
    }

    /// Resolves `size` items of `caller`'s component against the range the
    /// other side has cached.
    fn resolve(
        &mut self,
        caller: Side,
        resolver: Resolver<'_>,
        size: usize,
    ) -> Result<(), TransformError> {
        let owner = caller.other();
        let index = side_index(owner);
        let mut cache = mem::replace(&mut self.parties[index].range_cache, RangeCache::Retain);
        let result = self.resolve_against(owner, &mut cache, resolver, size);
        self.parties[index].range_cache = cache;
        result
    }

    fn resolve_against(
        &mut self,
        owner: Side,
        cache: &mut RangeCache,
        resolver: Resolver<'_>,
        size: usize,
    ) -> Result<(), TransformError> {
        // `o` owns the cache, `s` is the side catching up.
        let (o, s) = pair_mut(&mut self.parties, owner);
        match (&mut *cache, resolver) {
            (RangeCache::Retain, Resolver::Retain) => {
                sync(o, s);
                o.output.retain(size);
                s.output.retain(size);
            }
            (RangeCache::Retain, Resolver::DeleteCharacters(chars)) => {
                s.delete_characters(o, split_chars(chars, size).0);
            }
            (
                RangeCache::Retain,
                Resolver::DeleteElementStart {
                    element_type,
                    attributes,
                },
            ) => s.delete_element_start(o, element_type, attributes),
            (RangeCache::Retain, Resolver::DeleteElementEnd) => s.delete_element_end(o),
            (RangeCache::Retain, Resolver::ReplaceAttributes { old, new }) => {
                sync(o, s);
                o.output.retain(1);
                s.output.replace_attributes(old, new);
            }
            (RangeCache::Retain, Resolver::UpdateAttributes(update)) => {
                sync(o, s);
                o.output.retain(1);
                s.output.update_attributes(update);
            }

            (RangeCache::DeleteCharacters(chars), Resolver::Retain) => {
                let (head, tail) = split_chars(chars, size);
                o.delete_characters(s, head);
                let rest = tail.to_owned();
                *chars = rest;
            }
            (RangeCache::DeleteCharacters(chars), Resolver::DeleteCharacters(_)) => {
                let rest = split_chars(chars, size).1.to_owned();
                *chars = rest;
            }

            (
                RangeCache::DeleteElementStart {
                    element_type,
                    attributes,
                },
                resolver,
            ) => match resolver {
                Resolver::Retain => o.delete_element_start(s, element_type, attributes),
                Resolver::DeleteElementStart { .. } => {}
                Resolver::ReplaceAttributes { new, .. } => {
                    o.delete_element_start(s, element_type, new)
                }
                Resolver::UpdateAttributes(update) => {
                    o.delete_element_start(s, element_type, &attributes.update_with(update))
                }
                other => return Err(incompatible(other)),
            },

            (RangeCache::DeleteElementEnd, Resolver::Retain) => o.delete_element_end(s),
            (RangeCache::DeleteElementEnd, Resolver::DeleteElementEnd) => {}

            (RangeCache::ReplaceAttributes { old, new }, resolver) => match resolver {
                Resolver::Retain => {
                    sync(o, s);
                    o.output.replace_attributes(old, new);
                    s.output.retain(1);
                }
                Resolver::DeleteElementStart { element_type, .. } => {
                    s.delete_element_start(o, element_type, new)
                }
                Resolver::ReplaceAttributes { new: theirs, .. } => {
                    sync(o, s);
                    o.output.replace_attributes(theirs, new);
                    s.output.retain(1);
                }
                Resolver::UpdateAttributes(update) => {
                    sync(o, s);
                    o.output.replace_attributes(&old.update_with(update), new);
                    s.output.retain(1);
                }
                other => return Err(incompatible(other)),
            },

            (RangeCache::UpdateAttributes(mine), resolver) => match resolver {
                Resolver::Retain => {
                    sync(o, s);
                    o.output.update_attributes(mine);
                    s.output.retain(1);
                }
                Resolver::DeleteElementStart {
                    element_type,
                    attributes,
                } => s.delete_element_start(o, element_type, &attributes.update_with(mine)),
                Resolver::ReplaceAttributes { old, new } => {
                    sync(o, s);
                    o.output.retain(1);
                    s.output.replace_attributes(&old.update_with(mine), new);
                }
                Resolver::UpdateAttributes(theirs) => {
                    sync(o, s);
                    let rebased = AttributesUpdate::from_changes(mine.changes().iter().map(|c| {
                        AttributeChange {
                            name: c.name.clone(),
                            old_value: theirs
                                .get(&c.name)
                                .map(|t| t.new_value.clone())
                                .unwrap_or_else(|| c.old_value.clone()),
                            new_value: c.new_value.clone(),
                        }
                    }));
                    o.output.update_attributes(&rebased);
                    s.output.update_attributes(&theirs.exclude(mine.keys()));
                }
                other => return Err(incompatible(other)),
            },

            (_, other) => return Err(incompatible(other)),
        }
        Ok(())
    }

    fn annotation_boundary(&mut self, side: Side, map: &AnnotationBoundaryMap) {
        let (this, other) = pair_mut(&mut self.parties, side);
        this.register(map);
        let (own, opposing) = match side {
            Side::Client => client_boundaries(map, &other.annotations.tracked),
            Side::Server => server_boundaries(map, &other.annotations.tracked),
        };
        this.commit(&own.build());
        other.commit(&opposing.build());
    }
}

/// Splits a client boundary into the client′ and server′ boundaries. A
/// client change overrides whatever the server sets for the same key.
fn client_boundaries(
    map: &AnnotationBoundaryMap,
    server_tracked: &BTreeMap<String, ValueUpdate>,
) -> (AnnotationBoundaryMapBuilder, AnnotationBoundaryMapBuilder) {
    let mut client = AnnotationBoundaryMap::builder();
    let mut server = AnnotationBoundaryMap::builder();
    for key in map.ends() {
        client = client.end(key);
        if let Some(theirs) = server_tracked.get(key) {
            server = server.change(key, theirs.old.as_deref(), theirs.new.as_deref());
        }
    }
    for change in map.changes() {
        match server_tracked.get(&change.key) {
            Some(theirs) => {
                client = client.change(&change.key, theirs.new.as_deref(), change.new_value.as_deref());
                server = server.end(&change.key);
            }
            None => {
                client = client.change(
                    &change.key,
                    change.old_value.as_deref(),
                    change.new_value.as_deref(),
                );
            }
        }
    }
    (client, server)
}

/// Splits a server boundary into the server′ and client′ boundaries. The
/// server change is suppressed where the client is changing the same key.
fn server_boundaries(
    map: &AnnotationBoundaryMap,
    client_tracked: &BTreeMap<String, ValueUpdate>,
) -> (AnnotationBoundaryMapBuilder, AnnotationBoundaryMapBuilder) {
    let mut server = AnnotationBoundaryMap::builder();
    let mut client = AnnotationBoundaryMap::builder();
    for key in map.ends() {
        match client_tracked.get(key) {
            Some(theirs) => {
                client = client.change(key, theirs.old.as_deref(), theirs.new.as_deref());
            }
            None => server = server.end(key),
        }
    }
    for change in map.changes() {
        match client_tracked.get(&change.key) {
            Some(theirs) => {
                client = client.change(&change.key, change.new_value.as_deref(), theirs.new.as_deref());
            }
            None => {
                server = server.change(
                    &change.key,
                    change.old_value.as_deref(),
                    change.new_value.as_deref(),
                );
            }
        }
    }
    (server, client)
}

impl PairTransformer for NoninsertionTransformer {
    fn process(&mut self, side: Side, component: &DocOpComponent) -> Result<(), TransformError> {
        let index = side_index(side);
        match component {
            DocOpComponent::Retain(n) => {
                self.resolve_range(side, *n, Resolver::Retain)?;
                self.parties[index].range_cache = RangeCache::Retain;
            }
            DocOpComponent::DeleteCharacters(chars) => {
                let resolver = Resolver::DeleteCharacters(chars);
                if let Some(resolved) = self.resolve_range(side, char_len(chars), resolver)? {
                    let rest = split_chars(chars, resolved).1.to_owned();
                    self.parties[index].range_cache = RangeCache::DeleteCharacters(rest);
                }
            }
            DocOpComponent::DeleteElementStart {
                element_type,
                attributes,
            } => {
                let resolver = Resolver::DeleteElementStart {
                    element_type,
                    attributes,
                };
                if self.resolve_range(side, 1, resolver)? == Some(0) {
                    self.parties[index].range_cache = RangeCache::DeleteElementStart {
                        element_type: element_type.clone(),
                        attributes: attributes.clone(),
                    };
                }
            }
            DocOpComponent::DeleteElementEnd => {
                if self.resolve_range(side, 1, Resolver::DeleteElementEnd)? == Some(0) {
                    self.parties[index].range_cache = RangeCache::DeleteElementEnd;
                }
            }
            DocOpComponent::ReplaceAttributes { old, new } => {
                if self.resolve_range(side, 1, Resolver::ReplaceAttributes { old, new })? == Some(0)
                {
                    self.parties[index].range_cache = RangeCache::ReplaceAttributes {
                        old: old.clone(),
                        new: new.clone(),
                    };
                }
            }
            DocOpComponent::UpdateAttributes(update) => {
                if self.resolve_range(side, 1, Resolver::UpdateAttributes(update))? == Some(0) {
                    self.parties[index].range_cache = RangeCache::UpdateAttributes(update.clone());
                }
            }
            DocOpComponent::AnnotationBoundary(map) => self.annotation_boundary(side, map),
            unexpected => {
                return Err(TransformError::Incompatible(format!(
                    "{unexpected} in a non-insertion operation"
                )))
            }
        }
        Ok(())
    }

    fn positions(&self) -> &PositionTracker {
        &self.positions
    }
}
