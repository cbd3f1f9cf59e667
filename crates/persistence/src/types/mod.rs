//! Core types for the data layer.
//!
//! - [`StoredDocument`] - A JSON document with persistence metadata
//! - [`Query`], [`Filter`], [`SortKey`] - Lookup requests
//! - [`FindResult`] - A page of documents with the total match count

mod document;
mod query;

pub use document::{StoredDocument, generate_etag, generate_id};
pub use query::{
    Condition, ContentFields, DocumentField, FieldMapping, Filter, FindResult, Operator, Query,
    SortDirection, SortKey, compare_scalars,
};
