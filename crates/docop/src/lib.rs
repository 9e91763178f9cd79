//! docop: the document-operation algebra of a collaborative rich-text editor.
//!
//! A [`DocOp`] is an immutable sequence of [`DocOpComponent`]s describing how
//! one document state becomes another. This crate provides the four
//! primitives that keep concurrent editors convergent:
//!
//! | Entry point | Module | Contents |
//! |-------------|--------|----------|
//! | [`compose`], [`compose_all`] | [`algorithm::composer`], [`algorithm::collector`] | sequential composition |
//! | [`transform`] | [`algorithm::transformer`] | concurrent-edit transformation |
//! | [`invert`] | [`algorithm::inverter`] | structural inverse |
//! | [`normalize`] | [`algorithm::normalizer`] | canonical component form |
//!
//! Everything is expressed against the visitor-style [`DocOpCursor`] trait,
//! so the algorithms never touch a concrete document. [`document::Document`]
//! is a small consuming cursor used to apply operations to content.

pub mod algorithm;
pub mod document;
pub mod error;
pub mod operation;

pub use algorithm::{compose, compose_all, invert, normalize, transform, DocOpCollector};
pub use document::{Document, DocumentError};
pub use error::{OperationError, TransformError};
pub use operation::annotations::{AnnotationBoundaryMap, AnnotationChange, ValueUpdate};
pub use operation::attributes::{AttributeChange, Attributes, AttributesUpdate};
pub use operation::buffer::{DocOpBuffer, DocOpBuilder};
pub use operation::cursor::{DocOpCursor, EvaluatingDocOpCursor};
pub use operation::validate::{validate, ValidationError};
pub use operation::{DocOp, DocOpComponent};
