//! One direction of undo history.
//!
//! The stack is a list of entries delimited by checkpoints. Each entry holds
//! the composed undoable operation of one undo level together with the
//! non-undoable operations that were applied after it:
//!
//! ```text
//! state = … ; entry.op ; entry.nonundoables[0] ; entry.nonundoables[1] ; …
//! ```
//!
//! Undoable operations arriving after non-undoable ones in the same entry
//! are rebased in front of them, so the entry always has that shape.

use tracing::debug;

use crate::algebra::UndoAlgebra;
use crate::error::UndoError;

#[derive(Debug, Clone)]
struct Entry<T> {
    op: T,
    nonundoables: Vec<T>,
}

/// The result of popping an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popped<T> {
    /// Inverse of the entry, applicable to the current state.
    pub op: T,
    /// The entry's non-undoable operations rebased past the inverse, when
    /// there were any.
    pub rebased: Option<T>,
}

#[derive(Debug, Clone)]
pub struct UndoStack<T> {
    entries: Vec<Entry<T>>,
    checkpoint_pending: bool,
    /// `0` keeps everything.
    max_levels: usize,
}

impl<T: UndoAlgebra> UndoStack<T> {
    pub fn new(max_levels: usize) -> Self {
        Self {
            entries: Vec::new(),
            checkpoint_pending: true,
            max_levels,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.checkpoint_pending = true;
    }

    /// The next pushed operation starts a new entry.
    pub fn checkpoint(&mut self) {
        self.checkpoint_pending = true;
    }

    pub fn push(&mut self, op: T) -> Result<(), UndoError> {
        if self.checkpoint_pending || self.entries.is_empty() {
            self.push_entry(op);
            return Ok(());
        }

        let top = self.entries.len() - 1;
        let entry = &mut self.entries[top];
        if entry.nonundoables.is_empty() {
            entry.op = T::compose(&[entry.op.clone(), op])?;
            return Ok(());
        }

        let nonundoable = T::compose(&entry.nonundoables)?;
        let (rebased, nonundoable_inverse) = T::transform(&op, &nonundoable.invert())?;
        let composed = T::compose(&[entry.op.clone(), rebased])?;
        debug!(
            nonundoables = entry.nonundoables.len(),
            "rebased undoable operation before non-undoable operations"
        );
        entry.op = composed;
        entry.nonundoables = vec![nonundoable_inverse.invert()];
        Ok(())
    }

    /// Pushes `op` as a level of its own.
    pub(crate) fn push_level(&mut self, op: T) {
        self.push_entry(op);
        self.checkpoint_pending = true;
    }

    fn push_entry(&mut self, op: T) {
        self.entries.push(Entry {
            op,
            nonundoables: Vec::new(),
        });
        self.checkpoint_pending = false;
        if self.max_levels > 0 && self.entries.len() > self.max_levels {
            self.entries.remove(0);
        }
    }

    /// Records an operation that must survive undo. Dropped when the stack is
    /// empty since there is nothing it would have to be rebased over.
    pub fn push_nonundoable(&mut self, op: T) {
        if let Some(entry) = self.entries.last_mut() {
            entry.nonundoables.push(op);
        }
    }

    /// Removes the top entry and returns its inverse.
    ///
    /// The entry's non-undoable operations, rebased past the inverse, move to
    /// the entry below. On failure the stack is unchanged.
    pub fn pop(&mut self) -> Result<Option<Popped<T>>, UndoError> {
        let Some(entry) = self.entries.last() else {
            return Ok(None);
        };
        let inverse = entry.op.invert();
        let popped = if entry.nonundoables.is_empty() {
            Popped {
                op: inverse,
                rebased: None,
            }
        } else {
            let nonundoable = T::compose(&entry.nonundoables)?;
            let (op, rebased) = T::transform(&inverse, &nonundoable)?;
            Popped {
                op,
                rebased: Some(rebased),
            }
        };

        self.entries.pop();
        if let (Some(rebased), Some(below)) = (&popped.rebased, self.entries.last_mut()) {
            below.nonundoables.push(rebased.clone());
        }
        self.checkpoint_pending = true;
        Ok(Some(popped))
    }
}
