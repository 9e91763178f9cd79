//! The operations an undo stack needs from the values it stores.

use docop::DocOp;

use crate::error::UndoError;

pub trait UndoAlgebra: Clone {
    fn invert(&self) -> Self;

    /// Composes `ops` in order. Fails with [`UndoError::EmptyComposition`]
    /// on an empty slice.
    fn compose(ops: &[Self]) -> Result<Self, UndoError>;

    /// Returns `(client′, server′)`.
    fn transform(client: &Self, server: &Self) -> Result<(Self, Self), UndoError>;
}

impl UndoAlgebra for DocOp {
    fn invert(&self) -> Self {
        docop::invert(self)
    }

    fn compose(ops: &[Self]) -> Result<Self, UndoError> {
        docop::compose_all(ops.iter().cloned())?.ok_or(UndoError::EmptyComposition)
    }

    fn transform(client: &Self, server: &Self) -> Result<(Self, Self), UndoError> {
        Ok(docop::transform(client, server)?)
    }
}
