//! HTTP middleware for the Vesper REST API.
//!
//! - [`conditional`] - Conditional request headers (If-Match, etc.)

pub mod conditional;

pub use conditional::ConditionalHeaders;
