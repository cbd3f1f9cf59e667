//! Conditional request header handling.
//!
//! Handles HTTP conditional headers:
//! - If-Match: Required etag for item writes
//! - If-None-Match: Conditional read by etag
//! - If-Modified-Since: Conditional read by date

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use vesper_persistence::types::StoredDocument;

/// Extracted conditional headers from a request.
#[derive(Debug, Default)]
pub struct ConditionalHeaders {
    /// If-Match header value.
    if_match: Option<String>,

    /// If-None-Match header value.
    if_none_match: Option<String>,

    /// If-Modified-Since header value.
    if_modified_since: Option<DateTime<Utc>>,
}

impl ConditionalHeaders {
    /// Creates a new ConditionalHeaders from a HeaderMap.
    ///
    /// An If-Modified-Since value that is not an HTTP date is ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_match = headers
            .get(header::IF_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let if_none_match = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let if_modified_since = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            if_match,
            if_none_match,
            if_modified_since,
        }
    }

    /// Returns the If-Match header value.
    pub fn if_match(&self) -> Option<&str> {
        self.if_match.as_deref()
    }

    /// Returns the If-None-Match header value.
    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }

    /// Returns the If-Modified-Since header value.
    pub fn if_modified_since(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since
    }

    /// Returns `true` when a GET of `document` can be answered with 304.
    ///
    /// The etag check wins when If-None-Match is present.
    pub fn is_not_modified(&self, document: &StoredDocument) -> bool {
        if let Some(etag) = self.if_none_match() {
            return etag.split(',').any(|tag| document.matches_etag(tag.trim()));
        }
        self.if_modified_since
            .is_some_and(|since| document.updated() <= since)
    }
}

/// Axum extractor for conditional headers.
impl<S> FromRequestParts<S> for ConditionalHeaders
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConditionalHeaders::from_headers(&parts.headers))
    }
}
