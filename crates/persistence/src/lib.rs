//! Vesper data layer.
//!
//! This crate stores the JSON documents served by the Vesper REST framework.
//! It defines the [`DataLayer`](core::DataLayer) trait the REST layer talks
//! to, the query model used for listing collections, and an in-memory backend.
//!
//! # Architecture
//!
//! - [`types`] - Stored documents and the query model
//! - [`error`] - Error types for all operations
//! - [`core`] - The storage trait
//! - [`backends`] - Backend implementations
//!
//! # Quick Start
//!
//! ```
//! use vesper_persistence::backends::memory::MemoryBackend;
//! use vesper_persistence::core::DataLayer;
//! use vesper_persistence::types::{ContentFields, Filter, Query};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let backend = MemoryBackend::new();
//! let doc = json!({"ref": "1234567890123456789012345", "prog": 7});
//! backend.insert("contacts", doc.as_object().unwrap().clone()).await.unwrap();
//!
//! let filter = Filter::from_json(&json!({"prog": {"$gt": 5}}), &ContentFields).unwrap();
//! let page = backend.find("contacts", &Query::all().with_filter(filter)).await.unwrap();
//! assert_eq!(page.total, 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod types;

pub use error::{StorageError, StorageResult};
