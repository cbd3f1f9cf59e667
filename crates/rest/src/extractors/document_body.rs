//! Write payload extractor.
//!
//! POST and PATCH bodies map client keys to documents:
//! `{"key1": {...}, "key2": {...}}`. The body is either a JSON object or a
//! form-encoded body whose values are JSON documents
//! (`key1={"ref":"..."}`). Key order is preserved.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::RestError;

/// Axum extractor for keyed write payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBody(pub Map<String, Value>);

impl DocumentBody {
    /// Returns the first key and its document.
    pub fn first(&self) -> Option<(&String, &Value)> {
        self.0.iter().next()
    }

    /// Consumes the extractor and returns the payload.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Parses a body according to its content type.
    pub fn parse(content_type: &str, bytes: &[u8]) -> Result<Self, RestError> {
        if content_type.starts_with("application/x-www-form-urlencoded") {
            let mut payload = Map::new();
            for (key, value) in form_urlencoded::parse(bytes) {
                let document: Value =
                    serde_json::from_str(&value).map_err(|e| RestError::BadRequest {
                        message: format!("Value of '{}' is not valid JSON: {}", key, e),
                    })?;
                payload.insert(key.into_owned(), document);
            }
            return Ok(DocumentBody(payload));
        }

        match serde_json::from_slice(bytes)? {
            Value::Object(payload) => Ok(DocumentBody(payload)),
            _ => Err(RestError::BadRequest {
                message: "Request body must be a JSON object".to_string(),
            }),
        }
    }
}

impl<S> FromRequest<S> for DocumentBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Must own the string before moving req
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| RestError::BadRequest {
                message: format!("Failed to read body: {}", e),
            })?;

        DocumentBody::parse(&content_type, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body_keeps_key_order() {
        let body = DocumentBody::parse(
            "application/json",
            br#"{"zeta": {"a": 1}, "alpha": {"b": 2}}"#,
        )
        .unwrap();
        let (key, value) = body.first().unwrap();
        assert_eq!(key, "zeta");
        assert_eq!(value, &json!({"a": 1}));
    }

    #[test]
    fn test_form_body() {
        let body = DocumentBody::parse(
            "application/x-www-form-urlencoded",
            b"key1=%7B%22prog%22%3A+7%7D",
        )
        .unwrap();
        assert_eq!(body.into_inner()["key1"], json!({"prog": 7}));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(DocumentBody::parse("application/json", b"[1, 2]").is_err());
        assert!(DocumentBody::parse("application/json", b"not json").is_err());
        assert!(DocumentBody::parse("application/x-www-form-urlencoded", b"key1=nope").is_err());
    }
}
