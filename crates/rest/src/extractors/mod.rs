//! Axum extractors for Vesper requests.
//!
//! - [`ListQuery`] - Raw listing parameters of collection GETs
//! - [`ListParams`] - Validated listing parameters
//! - [`DocumentBody`] - JSON or form-encoded write payloads

mod document_body;
mod list_params;

pub use document_body::DocumentBody;
pub use list_params::{ListParams, ListQuery, ResourceFields};
