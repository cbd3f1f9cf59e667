//! Response header generation.
//!
//! Provides the caching headers of GET responses:
//! - Cache-Control (resource policy)
//! - Expires (response time plus the resource's `cache_expires`)
//! - Last-Modified
//! - ETag

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Duration, Utc};

use crate::settings::Resource;

/// Formats a timestamp as an HTTP date.
pub fn http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builder for response headers.
#[derive(Debug, Default)]
pub struct ResponseHeaders {
    /// Cache-Control policy.
    cache_control: Option<String>,
    /// Expires timestamp.
    expires: Option<String>,
    /// Last-Modified timestamp.
    last_modified: Option<String>,
    /// ETag value (strong validator).
    etag: Option<String>,
}

impl ResponseHeaders {
    /// Creates the caching headers of a resource's GET responses.
    ///
    /// An empty policy sends no Cache-Control header.
    pub fn cached(resource: &Resource, now: DateTime<Utc>) -> Self {
        let expires_in = i64::try_from(resource.cache_expires).unwrap_or(i64::MAX);
        let expires = now
            .checked_add_signed(Duration::seconds(expires_in))
            .unwrap_or(now);
        Self {
            cache_control: Some(resource.cache_control.clone()).filter(|c| !c.is_empty()),
            expires: Some(http_date(expires)),
            ..Default::default()
        }
    }

    /// Sets the Last-Modified timestamp.
    pub fn with_last_modified(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.last_modified = timestamp.map(http_date);
        self
    }

    /// Sets the ETag from a document etag.
    pub fn with_etag(mut self, etag: &str) -> Self {
        self.etag = Some(format!("\"{}\"", etag));
        self
    }

    /// Converts to an Axum HeaderMap.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in [
            (header::CACHE_CONTROL, &self.cache_control),
            (header::EXPIRES, &self.expires),
            (header::LAST_MODIFIED, &self.last_modified),
            (header::ETAG, &self.etag),
        ] {
            if let Some(value) = value
                && let Ok(value) = HeaderValue::from_str(value)
            {
                headers.insert(name, value);
            }
        }

        headers
    }
}
