//! Relative positions of the two cursors of a pairwise transformation.

use crate::error::TransformError;
use crate::operation::{DocOp, DocOpComponent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}

/// A single signed offset: how far the client cursor is ahead of the
/// server cursor in the shared base document. Each side reads it with its
/// own sign, so a side is ahead when its value is positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionTracker {
    offset: isize,
}

impl PositionTracker {
    pub fn get(&self, side: Side) -> isize {
        match side {
            Side::Client => self.offset,
            Side::Server => -self.offset,
        }
    }

    pub fn increase(&mut self, side: Side, amount: usize) {
        let amount = amount as isize;
        match side {
            Side::Client => self.offset += amount,
            Side::Server => self.offset -= amount,
        }
    }
}

/// Splits a client/server pair into `(this, other)` for `side`.
pub(crate) fn pair_mut<T>(pair: &mut [T; 2], side: Side) -> (&mut T, &mut T) {
    let [client, server] = pair;
    match side {
        Side::Client => (client, server),
        Side::Server => (server, client),
    }
}

/// One of the pairwise transformers, fed component by component.
pub(crate) trait PairTransformer {
    fn process(&mut self, side: Side, component: &DocOpComponent) -> Result<(), TransformError>;

    fn positions(&self) -> &PositionTracker;
}

/// Interleaves the components of both operands: after each client
/// component, server components are fed until the server catches up.
pub(crate) fn interleave<T: PairTransformer>(
    transformer: &mut T,
    client: &DocOp,
    server: &DocOp,
) -> Result<(), TransformError> {
    let mut server_components = server.iter();
    for component in client {
        transformer.process(Side::Client, component)?;
        while transformer.positions().get(Side::Client) > 0 {
            let next = server_components.next().ok_or_else(|| {
                TransformError::Incompatible(format!(
                    "server operation ends before client position {}",
                    transformer.positions().get(Side::Client)
                ))
            })?;
            transformer.process(Side::Server, next)?;
        }
    }
    for component in server_components {
        transformer.process(Side::Server, component)?;
    }
    Ok(())
}
