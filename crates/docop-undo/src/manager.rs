//! Multi-level undo and redo over operations shared with other participants.

use tracing::debug;

use crate::algebra::UndoAlgebra;
use crate::config::UndoConfig;
use crate::error::UndoError;
use crate::stack::{Popped, UndoStack};

/// Undo/redo history of the local participant.
///
/// Local edits go through [`undoable_op`](Self::undoable_op) and are grouped
/// into levels by [`checkpoint`](Self::checkpoint). Edits that must not be
/// undone locally, typically ones received from other participants, go
/// through [`nonundoable_op`](Self::nonundoable_op); later undos and redos
/// are transformed so they still apply on top of them.
#[derive(Debug, Clone)]
pub struct UndoManager<T> {
    undo_stack: UndoStack<T>,
    redo_stack: UndoStack<T>,
}

impl<T: UndoAlgebra> UndoManager<T> {
    pub fn new() -> Self {
        Self::with_config(UndoConfig::default())
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            undo_stack: UndoStack::new(config.max_levels),
            redo_stack: UndoStack::new(config.max_levels),
        }
    }

    /// Closes the current undo level.
    pub fn checkpoint(&mut self) {
        self.undo_stack.checkpoint();
    }

    /// Records a local edit. Invalidates everything that could be redone.
    pub fn undoable_op(&mut self, op: T) -> Result<(), UndoError> {
        self.undo_stack.push(op)?;
        self.redo_stack.clear();
        Ok(())
    }

    /// Records an edit that undo and redo must preserve.
    pub fn nonundoable_op(&mut self, op: T) {
        self.undo_stack.push_nonundoable(op.clone());
        self.redo_stack.push_nonundoable(op);
    }

    /// Returns the operation undoing the last level, or `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Result<Option<T>, UndoError> {
        Ok(self.undo_plus()?.map(|popped| popped.op))
    }

    /// Like [`undo`](Self::undo), also returning the non-undoable operations
    /// of the undone level as they read after the undo.
    pub fn undo_plus(&mut self) -> Result<Option<Popped<T>>, UndoError> {
        let Some(popped) = self.undo_stack.pop()? else {
            return Ok(None);
        };
        self.redo_stack.push_level(popped.op.clone());
        debug!(
            undo_levels = self.undo_stack.len(),
            redo_levels = self.redo_stack.len(),
            rebased = popped.rebased.is_some(),
            "undo"
        );
        Ok(Some(popped))
    }

    pub fn redo(&mut self) -> Result<Option<T>, UndoError> {
        Ok(self.redo_plus()?.map(|popped| popped.op))
    }

    pub fn redo_plus(&mut self) -> Result<Option<Popped<T>>, UndoError> {
        let Some(popped) = self.redo_stack.pop()? else {
            return Ok(None);
        };
        self.undo_stack.push_level(popped.op.clone());
        debug!(
            undo_levels = self.undo_stack.len(),
            redo_levels = self.redo_stack.len(),
            rebased = popped.rebased.is_some(),
            "redo"
        );
        Ok(Some(popped))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl<T: UndoAlgebra> Default for UndoManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docop::{DocOp, DocOpBuilder};

    fn append(len: usize, text: &str) -> DocOp {
        let builder = DocOpBuilder::new();
        let builder = if len > 0 { builder.retain(len) } else { builder };
        builder.characters(text).build()
    }

    #[test]
    fn starts_empty() {
        let mut manager = UndoManager::<DocOp>::new();
        assert!(!manager.can_undo());
        assert!(!manager.can_redo());
        assert_eq!(manager.undo().unwrap(), None);
        assert_eq!(manager.redo().unwrap(), None);
    }

    #[test]
    fn undo_moves_levels_to_redo() {
        let mut manager = UndoManager::new();
        manager.undoable_op(append(0, "a")).unwrap();
        manager.checkpoint();
        manager.undoable_op(append(1, "b")).unwrap();
        assert_eq!(manager.undo_levels(), 2);

        manager.undo().unwrap();
        assert_eq!(manager.undo_levels(), 1);
        assert_eq!(manager.redo_levels(), 1);
        assert!(manager.can_redo());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut manager = UndoManager::new();
        manager.undoable_op(append(0, "a")).unwrap();
        manager.undo().unwrap();
        assert_eq!(manager.redo_levels(), 1);

        manager.undoable_op(append(0, "b")).unwrap();
        assert_eq!(manager.redo_levels(), 0);
    }

    #[test]
    fn configured_level_limit() {
        let mut manager = UndoManager::with_config(UndoConfig { max_levels: 2 });
        for len in 0..3 {
            manager.checkpoint();
            manager.undoable_op(append(len, "x")).unwrap();
        }
        assert_eq!(manager.undo_levels(), 2);
        manager.clear();
        assert_eq!(manager.undo_levels(), 0);
    }
}
