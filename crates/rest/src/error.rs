//! Error types for the REST API.
//!
//! This module defines the errors a request can end with. Each one maps to an
//! HTTP status and renders as a JSON body:
//!
//! ```json
//! {"error": {"code": 404, "message": "Item not found: contacts/4f46445fc88e201858000000"}}
//! ```
//!
//! # Error Mapping
//!
//! Data layer errors are mapped as follows:
//!
//! | Storage Error | HTTP Status |
//! |--------------|-------------|
//! | NotFound | 404 |
//! | NotAnObject | 400 |
//! | EtagMismatch | 412 |
//! | Query errors | 400 |
//! | Backend errors | 500 |
//!
//! Document validation problems are not errors: they are reported in a 200
//! response under the document key.

use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;
use vesper_persistence::error::{
    BackendError, ConcurrencyError, DocumentError, QueryError, StorageError,
};

/// The primary error type for REST API operations.
#[derive(Debug)]
pub enum RestError {
    /// Unknown resource, item or route (HTTP 404).
    NotFound {
        /// What was looked up.
        message: String,
    },

    /// Malformed request (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// A required precondition header is missing (HTTP 403).
    Forbidden {
        /// Error message.
        message: String,
    },

    /// The method is not enabled for the endpoint (HTTP 405).
    MethodNotAllowed {
        /// The method that was attempted.
        method: Method,
        /// The methods the endpoint accepts.
        allowed: Vec<Method>,
    },

    /// If-Match did not match the current etag (HTTP 412).
    PreconditionFailed {
        /// Message describing why the precondition failed.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Returns the HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RestError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RestError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Creates a 404 for an unknown item.
    pub fn item_not_found(resource: &str, lookup: &str) -> Self {
        RestError::NotFound {
            message: format!("Item not found: {}/{}", resource, lookup),
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::NotFound { message } => write!(f, "{}", message),
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::Forbidden { message } => write!(f, "Forbidden: {}", message),
            RestError::MethodNotAllowed { method, .. } => {
                write!(f, "Method {} not allowed", method)
            }
            RestError::PreconditionFailed { message } => {
                write!(f, "Precondition failed: {}", message)
            }
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });

        let mut response = (status, Json(body)).into_response();
        if let RestError::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

// Implement conversions from storage errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Document(e) => e.into(),
            StorageError::Concurrency(e) => e.into(),
            StorageError::Query(e) => e.into(),
            StorageError::Backend(e) => e.into(),
        }
    }
}

impl From<DocumentError> for RestError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound { collection, id } => {
                RestError::item_not_found(&collection, &id)
            }
            DocumentError::NotAnObject { .. } => RestError::BadRequest {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConcurrencyError> for RestError {
    fn from(err: ConcurrencyError) -> Self {
        match err {
            ConcurrencyError::EtagMismatch {
                collection,
                id,
                expected,
                ..
            } => RestError::PreconditionFailed {
                message: format!(
                    "Item {}/{} was modified (expected ETag: {})",
                    collection, id, expected
                ),
            },
        }
    }
}

impl From<QueryError> for RestError {
    fn from(err: QueryError) -> Self {
        RestError::BadRequest {
            message: err.to_string(),
        }
    }
}

impl From<BackendError> for RestError {
    fn from(err: BackendError) -> Self {
        RestError::InternalError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::BadRequest {
            message: format!("Invalid JSON: {}", err),
        }
    }
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_not_found_display() {
        let err = RestError::item_not_found("contacts", "abc");
        assert_eq!(err.to_string(), "Item not found: contacts/abc");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: RestError = StorageError::from(ConcurrencyError::EtagMismatch {
            collection: "contacts".to_string(),
            id: "abc".to_string(),
            expected: "1".to_string(),
            actual: "2".to_string(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);

        let err: RestError = StorageError::from(QueryError::InvalidSort {
            message: "bad".to_string(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: RestError = StorageError::from(BackendError::Internal {
            backend_name: "memory".to_string(),
            message: "boom".to_string(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = RestError::MethodNotAllowed {
            method: Method::PATCH,
            allowed: vec![Method::GET, Method::DELETE],
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, DELETE");
    }
}
