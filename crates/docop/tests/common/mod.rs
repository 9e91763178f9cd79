#![allow(dead_code)]

pub mod generator;

use docop::{DocOp, DocOpBuilder, Document};

pub fn text_document(text: &str) -> Document {
    Document::from_initialization(&DocOpBuilder::new().characters(text).build())
        .expect("plain text initializes")
}

/// Applies `ops` in order to a copy of `document`.
pub fn apply_all(document: &Document, ops: &[&DocOp]) -> Document {
    let mut document = document.clone();
    for op in ops {
        document
            .apply(op)
            .unwrap_or_else(|e| panic!("applying [{op}] failed: {e}"));
    }
    document
}

/// The operation that leaves a document of `len` items unchanged.
pub fn identity(len: usize) -> DocOp {
    if len == 0 {
        DocOp::empty()
    } else {
        DocOpBuilder::new().retain(len).build()
    }
}
