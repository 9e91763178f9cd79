//! Batched composition of long operation sequences.
//!
//! Composing `n` operations left to right costs `O(n^2)` in the size of the
//! running result. The collector keeps a binary counter of partial results
//! instead: slot `i` holds either nothing or the composition of `2^i`
//! consecutive operations, and adding an operation carries upward like
//! incrementing a binary number.

use tracing::trace;

use crate::error::OperationError;
use crate::operation::DocOp;

use super::composer::compose;

#[derive(Debug, Clone, Default)]
pub struct DocOpCollector {
    /// Slot `i` covers `2^i` operations; older operations sit in higher slots.
    slots: Vec<Option<DocOp>>,
    len: usize,
}

impl DocOpCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations added so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `op` after every operation added so far.
    ///
    /// On failure the collector is left exactly as it was before the call.
    pub fn add(&mut self, op: DocOp) -> Result<(), OperationError> {
        let mut carry = op;
        let mut index = 0;
        while let Some(Some(older)) = self.slots.get(index) {
            carry = compose(older, &carry)?;
            trace!(slot = index, "collector carry");
            index += 1;
        }
        for slot in &mut self.slots[..index] {
            *slot = None;
        }
        match self.slots.get_mut(index) {
            Some(slot) => *slot = Some(carry),
            None => self.slots.push(Some(carry)),
        }
        self.len += 1;
        Ok(())
    }

    /// Composes everything added, oldest first. Returns `None` when nothing
    /// was added.
    pub fn compose_all(self) -> Result<Option<DocOp>, OperationError> {
        let mut result: Option<DocOp> = None;
        for slot in self.slots.into_iter().flatten() {
            result = Some(match result {
                None => slot,
                Some(newer) => compose(&slot, &newer)?,
            });
        }
        Ok(result)
    }
}

/// Composes a sequence of operations in order through a [`DocOpCollector`].
pub fn compose_all<I>(ops: I) -> Result<Option<DocOp>, OperationError>
where
    I: IntoIterator<Item = DocOp>,
{
    let mut collector = DocOpCollector::new();
    for op in ops {
        collector.add(op)?;
    }
    collector.compose_all()
}
