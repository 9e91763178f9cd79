use docop::{OperationError, TransformError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UndoError {
    #[error(transparent)]
    Compose(#[from] OperationError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("cannot compose an empty sequence of operations")]
    EmptyComposition,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid undo configuration: {0}")]
    Json(#[from] serde_json::Error),
}
