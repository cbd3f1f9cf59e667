//! Response formatting for the Vesper REST API.
//!
//! - [`document`] - The response envelope, item rendering, write results
//! - [`headers`] - Caching headers (Cache-Control, Expires, Last-Modified, ETag)

pub mod document;
pub mod headers;

pub use document::{envelope, render_document, write_err, write_ok};
pub use headers::{ResponseHeaders, http_date};
