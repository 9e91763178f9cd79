//! Failure taxonomy shared by the composition and transformation algorithms.
//!
//! Every failure aborts the whole call: no partial result is returned and no
//! caller-visible state is mutated. Callers should treat any of these as
//! "reject and resynchronize".

use thiserror::Error;

/// Two operations could not be chained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    /// Component boundaries of the two operands are incompatible, e.g. a
    /// deletion meeting an element start of a different type.
    #[error("illegal composition: {0}")]
    Structural(String),
    /// The first operation's resulting length differs from the second
    /// operation's initial length.
    #[error(
        "document size mismatch: op1 resulting length={op1_resulting}, op2 initial length={op2_initial}"
    )]
    SizeMismatch {
        op1_resulting: usize,
        op2_initial: usize,
    },
}

/// Two operations could not be transformed against each other.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("operations apply to documents of different lengths: client={client}, server={server}")]
    LengthMismatch { client: usize, server: usize },
    #[error("incompatible operations in transformation: {0}")]
    Incompatible(String),
    /// Recomposition of the transformed quadrants failed.
    #[error("recomposition failed: {0}")]
    Compose(#[from] OperationError),
}
