//! In-memory backend.
//!
//! Collections live in a `parking_lot` guarded map and are kept in identifier
//! order, which for generated identifiers is insertion order. Suitable for
//! tests, demos and single-process deployments.

mod backend;

pub use backend::MemoryBackend;
