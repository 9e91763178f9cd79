//! Aggregate operations tagged with the participant who made them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateOperation;
use crate::algebra::UndoAlgebra;
use crate::error::UndoError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredPart {
    pub creator: ParticipantId,
    pub op: AggregateOperation,
}

/// A sequence of aggregate operations, each attributed to its creator.
///
/// Consecutive parts by the same creator are merged on composition; parts by
/// different creators stay separate since only one author's sequential edits
/// share a base state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthoredOperation {
    parts: Vec<AuthoredPart>,
}

impl AuthoredOperation {
    pub fn new(creator: ParticipantId, op: AggregateOperation) -> Self {
        Self {
            parts: vec![AuthoredPart { creator, op }],
        }
    }

    pub fn parts(&self) -> &[AuthoredPart] {
        &self.parts
    }

    fn transform_part(
        client: &AuthoredPart,
        server: &AuthoredPart,
    ) -> Result<(AuthoredPart, AuthoredPart), UndoError> {
        let (client_op, server_op) = AggregateOperation::transform(&client.op, &server.op)?;
        Ok((
            AuthoredPart {
                creator: client.creator.clone(),
                op: client_op,
            },
            AuthoredPart {
                creator: server.creator.clone(),
                op: server_op,
            },
        ))
    }
}

impl UndoAlgebra for AuthoredOperation {
    fn invert(&self) -> Self {
        let parts = self
            .parts
            .iter()
            .rev()
            .map(|part| AuthoredPart {
                creator: part.creator.clone(),
                op: part.op.invert(),
            })
            .collect();
        Self { parts }
    }

    fn compose(ops: &[Self]) -> Result<Self, UndoError> {
        if ops.is_empty() {
            return Err(UndoError::EmptyComposition);
        }
        let mut parts = Vec::new();
        let mut run: Vec<AggregateOperation> = Vec::new();
        let mut run_creator: Option<&ParticipantId> = None;
        for part in ops.iter().flat_map(|op| &op.parts) {
            if run_creator != Some(&part.creator) {
                if let Some(creator) = run_creator {
                    parts.push(AuthoredPart {
                        creator: creator.clone(),
                        op: AggregateOperation::compose(&run)?,
                    });
                }
                run.clear();
                run_creator = Some(&part.creator);
            }
            run.push(part.op.clone());
        }
        if let Some(creator) = run_creator {
            parts.push(AuthoredPart {
                creator: creator.clone(),
                op: AggregateOperation::compose(&run)?,
            });
        }
        Ok(Self { parts })
    }

    /// Each server part is carried through the whole client stream, which is
    /// rewritten along the way.
    fn transform(client: &Self, server: &Self) -> Result<(Self, Self), UndoError> {
        let mut client_parts = client.parts.clone();
        let mut server_parts = Vec::with_capacity(server.parts.len());
        for server_part in &server.parts {
            let mut carried = server_part.clone();
            for client_part in &mut client_parts {
                let (client_t, server_t) = Self::transform_part(client_part, &carried)?;
                *client_part = client_t;
                carried = server_t;
            }
            server_parts.push(carried);
        }
        Ok((
            Self {
                parts: client_parts,
            },
            Self {
                parts: server_parts,
            },
        ))
    }
}
