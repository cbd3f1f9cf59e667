//! Data layer backends.
//!
//! - [`memory`] - In-memory collections

pub mod memory;
