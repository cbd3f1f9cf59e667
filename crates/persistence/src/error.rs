//! Error types for the data layer.
//!
//! Errors are grouped by category so that the REST layer can map each one to
//! an HTTP status without inspecting messages.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all data layer operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Document state errors
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Concurrency control errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Query construction errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to document state.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The requested document was not found.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// The document content is not a JSON object.
    #[error("document in {collection} must be a JSON object")]
    NotAnObject { collection: String },
}

/// Errors related to concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The client-supplied etag does not match the stored one.
    #[error("etag mismatch for {collection}/{id}: expected {expected}, found {actual}")]
    EtagMismatch {
        collection: String,
        id: String,
        expected: String,
        actual: String,
    },
}

/// Errors raised while building or evaluating a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The filter document is malformed.
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// An operator is not supported.
    #[error("unsupported operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// The sort specification is malformed.
    #[error("invalid sort: {message}")]
    InvalidSort { message: String },
}

/// Backend-specific errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is not available.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
    },
}

/// Result type alias for data layer operations.
pub type StorageResult<T> = Result<T, StorageError>;
