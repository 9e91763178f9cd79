//! Well-formedness checks for operations.

use std::collections::BTreeSet;

use thiserror::Error;

use super::{DocOp, DocOpComponent};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("component {index}: zero-length retain")]
    ZeroRetain { index: usize },
    #[error("component {index}: empty characters")]
    EmptyCharacters { index: usize },
    #[error("component {index}: empty deleteCharacters")]
    EmptyDeleteCharacters { index: usize },
    #[error("component {index}: annotation keys are not sorted and unique")]
    UnsortedAnnotationKeys { index: usize },
    #[error("component {index}: annotation key {key:?} is both ended and changed")]
    EndedAndChanged { index: usize, key: String },
    #[error("component {index}: annotation key {key:?} ended without being open")]
    EndWithoutChange { index: usize, key: String },
    #[error("component {index}: annotation boundary follows another boundary")]
    AdjacentBoundaries { index: usize },
    #[error("annotation keys left open at the end of the operation: {keys:?}")]
    UnclosedAnnotations { keys: Vec<String> },
    #[error("component {index}: element end without a matching element start")]
    UnbalancedElementEnd { index: usize },
    #[error("component {index}: deleted element end without a matching deleted start")]
    UnbalancedDeleteElementEnd { index: usize },
    #[error("component {index}: {component} inside an inserted element")]
    NonInsertionInsideInsertion { index: usize, component: String },
    #[error("component {index}: {component} inside a deleted element")]
    NonDeletionInsideDeletion { index: usize, component: String },
    #[error("operation ends inside an inserted or deleted element")]
    UnclosedElements,
}

/// Checks that `op` is well formed: no degenerate ranges, balanced element
/// insertions and deletions, and annotation keys that are sorted, never both
/// ended and changed in one boundary, and all ended by the end of the op.
pub fn validate(op: &DocOp) -> Result<(), ValidationError> {
    let mut open_keys: BTreeSet<&str> = BTreeSet::new();
    let mut insertion_depth = 0usize;
    let mut deletion_depth = 0usize;
    let mut previous_was_boundary = false;

    for (index, component) in op.components().iter().enumerate() {
        if let DocOpComponent::AnnotationBoundary(map) = component {
            if previous_was_boundary {
                return Err(ValidationError::AdjacentBoundaries { index });
            }
            previous_was_boundary = true;
            if !strictly_sorted(map.ends().iter().map(String::as_str))
                || !strictly_sorted(map.changes().iter().map(|c| c.key.as_str()))
            {
                return Err(ValidationError::UnsortedAnnotationKeys { index });
            }
            for change in map.changes() {
                if map.ends().iter().any(|k| *k == change.key) {
                    return Err(ValidationError::EndedAndChanged {
                        index,
                        key: change.key.clone(),
                    });
                }
            }
            for key in map.ends() {
                if !open_keys.remove(key.as_str()) {
                    return Err(ValidationError::EndWithoutChange {
                        index,
                        key: key.clone(),
                    });
                }
            }
            for change in map.changes() {
                open_keys.insert(change.key.as_str());
            }
            continue;
        }
        previous_was_boundary = false;

        match component {
            DocOpComponent::Retain(0) => return Err(ValidationError::ZeroRetain { index }),
            DocOpComponent::Characters(chars) if chars.is_empty() => {
                return Err(ValidationError::EmptyCharacters { index })
            }
            DocOpComponent::DeleteCharacters(chars) if chars.is_empty() => {
                return Err(ValidationError::EmptyDeleteCharacters { index })
            }
            _ => {}
        }

        if insertion_depth > 0 && !component.is_insertion() {
            return Err(ValidationError::NonInsertionInsideInsertion {
                index,
                component: component.to_string(),
            });
        }
        let is_deletion = matches!(
            component,
            DocOpComponent::DeleteCharacters(_)
                | DocOpComponent::DeleteElementStart { .. }
                | DocOpComponent::DeleteElementEnd
        );
        if deletion_depth > 0 && !is_deletion {
            return Err(ValidationError::NonDeletionInsideDeletion {
                index,
                component: component.to_string(),
            });
        }

        match component {
            DocOpComponent::ElementStart { .. } => insertion_depth += 1,
            DocOpComponent::ElementEnd => {
                insertion_depth = insertion_depth
                    .checked_sub(1)
                    .ok_or(ValidationError::UnbalancedElementEnd { index })?;
            }
            DocOpComponent::DeleteElementStart { .. } => deletion_depth += 1,
            DocOpComponent::DeleteElementEnd => {
                deletion_depth = deletion_depth
                    .checked_sub(1)
                    .ok_or(ValidationError::UnbalancedDeleteElementEnd { index })?;
            }
            _ => {}
        }
    }

    if insertion_depth > 0 || deletion_depth > 0 {
        return Err(ValidationError::UnclosedElements);
    }
    if !open_keys.is_empty() {
        return Err(ValidationError::UnclosedAnnotations {
            keys: open_keys.into_iter().map(str::to_owned).collect(),
        });
    }
    Ok(())
}

fn strictly_sorted<'a>(keys: impl Iterator<Item = &'a str>) -> bool {
    let keys: Vec<&str> = keys.collect();
    keys.windows(2).all(|pair| pair[0] < pair[1])
}
