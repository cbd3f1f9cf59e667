//! Core storage traits.
//!
//! - [`DataLayer`] - Document collection operations used by the REST layer

mod storage;

pub use storage::DataLayer;
