//! Transformation of two insertion-only operations.
//!
//! When both sides insert at the same position, the client insertion ends
//! up first.

use crate::error::TransformError;
use crate::operation::buffer::DocOpBuffer;
use crate::operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
use crate::operation::{char_len, DocOp, DocOpComponent};

use super::normalizer::RangeNormalizer;
use super::position::{interleave, pair_mut, PairTransformer, PositionTracker, Side};

pub fn transform(client: &DocOp, server: &DocOp) -> Result<(DocOp, DocOp), TransformError> {
    let mut transformer = InsertionTransformer {
        outputs: [
            RangeNormalizer::new(DocOpBuffer::new()),
            RangeNormalizer::new(DocOpBuffer::new()),
        ],
        positions: PositionTracker::default(),
    };
    interleave(&mut transformer, client, server)?;
    let [client_out, server_out] = transformer.outputs;
    Ok((client_out.finish(), server_out.finish()))
}

struct InsertionTransformer {
    /// Transformed client and server operations, in that order.
    outputs: [RangeNormalizer<DocOpBuffer>; 2],
    positions: PositionTracker,
}

impl PairTransformer for InsertionTransformer {
    fn process(&mut self, side: Side, component: &DocOpComponent) -> Result<(), TransformError> {
        let (this, other) = pair_mut(&mut self.outputs, side);
        match component {
            DocOpComponent::Retain(n) => {
                let before = self.positions.get(side);
                self.positions.increase(side, *n);
                if self.positions.get(side) < 0 {
                    this.retain(*n);
                    other.retain(*n);
                } else if before < 0 {
                    let overlap = before.unsigned_abs();
                    this.retain(overlap);
                    other.retain(overlap);
                }
            }
            DocOpComponent::Characters(chars) => {
                this.characters(chars);
                other.retain(char_len(chars));
            }
            DocOpComponent::ElementStart {
                element_type,
                attributes,
            } => {
                this.element_start(element_type, attributes);
                other.retain(1);
            }
            DocOpComponent::ElementEnd => {
                this.element_end();
                other.retain(1);
            }
            unexpected => {
                return Err(TransformError::Incompatible(format!(
                    "{unexpected} in an insertion-only operation"
                )))
            }
        }
        Ok(())
    }

    fn positions(&self) -> &PositionTracker {
        &self.positions
    }
}
