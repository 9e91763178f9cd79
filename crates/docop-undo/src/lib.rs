//! Aggregate operations and undo history on top of the [`docop`] algebra.
//!
//! - [`UndoAlgebra`] is what the undo machinery needs from an operation type:
//!   inversion, composition and transformation. It is implemented for
//!   [`docop::DocOp`], [`AggregateOperation`] and [`AuthoredOperation`].
//! - [`AggregateOperation`] bundles edits to several documents.
//! - [`AuthoredOperation`] tags aggregates with their creator.
//! - [`UndoManager`] keeps undo/redo levels delimited by checkpoints and
//!   rebases them over edits that must not be undone.

pub mod aggregate;
pub mod algebra;
pub mod authored;
pub mod config;
pub mod error;
pub mod manager;
pub mod stack;

pub use aggregate::AggregateOperation;
pub use algebra::UndoAlgebra;
pub use authored::{AuthoredOperation, AuthoredPart, ParticipantId};
pub use config::UndoConfig;
pub use error::{ConfigError, UndoError};
pub use manager::UndoManager;
pub use stack::{Popped, UndoStack};
