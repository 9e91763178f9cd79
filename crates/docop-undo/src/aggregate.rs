//! Operations spanning several documents.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use docop::{compose_all, DocOp, OperationError};
use serde::{Deserialize, Serialize};

use crate::algebra::UndoAlgebra;
use crate::error::UndoError;

/// Operations grouped by document id.
///
/// Each document keeps the list of operations applied to it in order; the
/// list is only composed when a single operation is needed (transform and
/// invert), so aggregating many small edits stays cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateOperation {
    documents: BTreeMap<String, Vec<DocOp>>,
}

impl AggregateOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_document(id: impl Into<String>, op: DocOp) -> Self {
        Self {
            documents: BTreeMap::from([(id.into(), vec![op])]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// The composition of everything applied to document `id`.
    pub fn document_op(&self, id: &str) -> Result<Option<DocOp>, OperationError> {
        match self.documents.get(id) {
            Some(ops) => compose_all(ops.iter().cloned()),
            None => Ok(None),
        }
    }

    fn composed(ops: &[DocOp]) -> Result<DocOp, UndoError> {
        compose_all(ops.iter().cloned())?.ok_or(UndoError::EmptyComposition)
    }
}

impl UndoAlgebra for AggregateOperation {
    fn invert(&self) -> Self {
        let documents = self
            .documents
            .iter()
            .map(|(id, ops)| {
                let inverted = ops.iter().rev().map(docop::invert).collect();
                (id.clone(), inverted)
            })
            .collect();
        Self { documents }
    }

    fn compose(ops: &[Self]) -> Result<Self, UndoError> {
        let (first, rest) = ops.split_first().ok_or(UndoError::EmptyComposition)?;
        let mut documents = first.documents.clone();
        for op in rest {
            for (id, list) in &op.documents {
                match documents.entry(id.clone()) {
                    Entry::Occupied(mut entry) => entry.get_mut().extend(list.iter().cloned()),
                    Entry::Vacant(entry) => {
                        entry.insert(list.clone());
                    }
                }
            }
        }
        Ok(Self { documents })
    }

    fn transform(client: &Self, server: &Self) -> Result<(Self, Self), UndoError> {
        let mut client_out = BTreeMap::new();
        let mut server_out = BTreeMap::new();
        for (id, client_ops) in &client.documents {
            let Some(server_ops) = server.documents.get(id) else {
                client_out.insert(id.clone(), client_ops.clone());
                continue;
            };
            let (client_t, server_t) = docop::transform(
                &Self::composed(client_ops)?,
                &Self::composed(server_ops)?,
            )?;
            client_out.insert(id.clone(), vec![client_t]);
            server_out.insert(id.clone(), vec![server_t]);
        }
        for (id, server_ops) in &server.documents {
            if !client.documents.contains_key(id) {
                server_out.insert(id.clone(), server_ops.clone());
            }
        }
        Ok((
            Self {
                documents: client_out,
            },
            Self {
                documents: server_out,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docop::{DocOpBuilder, Document};

    fn insert(at: usize, len: usize, text: &str) -> DocOp {
        let mut builder = DocOpBuilder::new();
        if at > 0 {
            builder = builder.retain(at);
        }
        builder = builder.characters(text);
        if len > at {
            builder = builder.retain(len - at);
        }
        builder.build()
    }

    #[test]
    fn compose_concatenates_per_document() {
        let a = AggregateOperation::for_document("b+1", insert(0, 0, "x"));
        let b = AggregateOperation::for_document("b+2", insert(0, 0, "y"));
        let c = AggregateOperation::for_document("b+1", insert(1, 1, "z"));
        let composed = AggregateOperation::compose(&[a, b, c]).unwrap();
        assert_eq!(composed.document_ids().collect::<Vec<_>>(), ["b+1", "b+2"]);
        assert_eq!(
            composed.document_op("b+1").unwrap(),
            Some(insert(0, 0, "xz"))
        );
        assert_eq!(composed.document_op("missing").unwrap(), None);
    }

    #[test]
    fn invert_undoes_every_document() {
        let op = AggregateOperation::compose(&[
            AggregateOperation::for_document("main", insert(0, 2, "x")),
            AggregateOperation::for_document("main", insert(3, 3, "y")),
        ])
        .unwrap();
        let mut doc = Document::from_initialization(&insert(0, 0, "ab")).unwrap();
        doc.apply(&op.document_op("main").unwrap().unwrap()).unwrap();
        assert_eq!(doc.text(), "xaby");
        doc.apply(&op.invert().document_op("main").unwrap().unwrap())
            .unwrap();
        assert_eq!(doc.text(), "ab");
    }

    #[test]
    fn transform_pairs_documents_by_id() {
        let client = AggregateOperation::compose(&[
            AggregateOperation::for_document("shared", insert(1, 2, "c")),
            AggregateOperation::for_document("client-only", insert(0, 0, "q")),
        ])
        .unwrap();
        let server = AggregateOperation::compose(&[
            AggregateOperation::for_document("shared", insert(1, 2, "s")),
            AggregateOperation::for_document("server-only", insert(0, 0, "r")),
        ])
        .unwrap();

        let (client_t, server_t) = AggregateOperation::transform(&client, &server).unwrap();
        assert_eq!(
            client_t.document_ids().collect::<Vec<_>>(),
            ["client-only", "shared"]
        );
        assert_eq!(
            server_t.document_ids().collect::<Vec<_>>(),
            ["server-only", "shared"]
        );
        assert_eq!(
            client_t.document_op("client-only").unwrap(),
            Some(insert(0, 0, "q"))
        );
        assert_eq!(
            client_t.document_op("shared").unwrap(),
            Some(insert(1, 3, "c"))
        );
        assert_eq!(
            server_t.document_op("shared").unwrap(),
            Some(insert(2, 3, "s"))
        );
    }
}
