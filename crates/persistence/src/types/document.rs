//! Stored document types.
//!
//! This module defines [`StoredDocument`], which wraps a JSON document with the
//! metadata the data layer maintains for it: identifier, creation and update
//! timestamps, and an etag.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A JSON document with persistence metadata.
///
/// Timestamps are kept at whole-second precision so that they survive a
/// round trip through HTTP dates (`Last-Modified` / `If-Modified-Since`).
///
/// # Examples
///
/// ```
/// use vesper_persistence::types::StoredDocument;
/// use serde_json::json;
///
/// let content = json!({"ref": "1234567890123456789012345"});
/// let doc = StoredDocument::new(content.as_object().unwrap().clone());
///
/// assert_eq!(doc.id().len(), 24);
/// assert_eq!(doc.created(), doc.updated());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    /// The document identifier (24 lowercase hex characters).
    id: String,

    /// The document content without metadata.
    content: Map<String, Value>,

    /// When the document was created.
    created: DateTime<Utc>,

    /// When the document was last written.
    updated: DateTime<Utc>,

    /// Opaque version tag, renewed on every write.
    etag: String,
}

impl StoredDocument {
    /// Creates a new document with a generated identifier.
    pub fn new(content: Map<String, Value>) -> Self {
        Self::with_id(generate_id(), content)
    }

    /// Creates a new document with the given identifier.
    pub fn with_id(id: impl Into<String>, content: Map<String, Value>) -> Self {
        let now = now();
        Self {
            id: id.into(),
            content,
            created: now,
            updated: now,
            etag: generate_etag(),
        }
    }

    /// Creates a document from previously persisted parts.
    pub fn from_parts(
        id: impl Into<String>,
        content: Map<String, Value>,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        etag: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content,
            created: created.trunc_subsecs(0),
            updated: updated.trunc_subsecs(0),
            etag: etag.into(),
        }
    }

    /// Returns the document identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the document content.
    pub fn content(&self) -> &Map<String, Value> {
        &self.content
    }

    /// Returns when the document was created.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns when the document was last written.
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Returns the etag.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Checks a client-supplied etag against this document's etag.
    ///
    /// Surrounding quotes and a weak `W/` prefix are ignored.
    pub fn matches_etag(&self, etag: &str) -> bool {
        let normalized = etag.trim().trim_start_matches("W/").trim_matches('"');
        normalized == self.etag
    }

    /// Returns the value at a dotted content path (`location.city`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.content.get(first)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Merges `changes` into the content and starts a new version.
    ///
    /// Top-level keys in `changes` replace the stored values.
    pub fn apply_changes(mut self, changes: Map<String, Value>) -> Self {
        for (key, value) in changes {
            self.content.insert(key, value);
        }
        self.updated = now();
        self.etag = generate_etag();
        self
    }
}

/// Current time at whole-second precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Generates a time-ordered 24 character hex identifier.
///
/// Layout: 4 bytes of seconds since the epoch, 5 bytes fixed per process,
/// 3 bytes of a per-process counter.
pub fn generate_id() -> String {
    static PROCESS: OnceLock<u64> = OnceLock::new();
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let process = *PROCESS.get_or_init(|| {
        let bytes = Uuid::new_v4().into_bytes();
        bytes[..5]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
    });
    let seconds = Utc::now().timestamp() as u32;
    let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

    format!("{:08x}{:010x}{:06x}", seconds, process, count)
}

/// Generates a fresh etag value.
pub fn generate_etag() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_generated_ids_are_hex_and_ordered() {
        let first = generate_id();
        let second = generate_id();

        assert_eq!(first.len(), 24);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(first < second);
    }

    #[test]
    fn test_timestamps_have_no_subseconds() {
        let doc = StoredDocument::new(content(json!({"a": 1})));
        assert_eq!(doc.updated().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_matches_etag_ignores_quotes() {
        let doc = StoredDocument::new(content(json!({})));
        let quoted = format!("\"{}\"", doc.etag());
        let weak = format!("W/\"{}\"", doc.etag());

        assert!(doc.matches_etag(doc.etag()));
        assert!(doc.matches_etag(&quoted));
        assert!(doc.matches_etag(&weak));
        assert!(!doc.matches_etag("other"));
    }

    #[test]
    fn test_apply_changes_renews_etag() {
        let doc = StoredDocument::new(content(json!({"a": 1, "b": 2})));
        let old_etag = doc.etag().to_string();
        let created = doc.created();

        let changed = doc.apply_changes(content(json!({"b": 3})));

        assert_eq!(changed.content()["a"], 1);
        assert_eq!(changed.content()["b"], 3);
        assert_ne!(changed.etag(), old_etag);
        assert_eq!(changed.created(), created);
    }

    #[test]
    fn test_get_path() {
        let doc = StoredDocument::new(content(json!({
            "location": {"city": "Ravenna"},
            "rows": [{"sku": "a"}]
        })));

        assert_eq!(doc.get_path("location.city"), Some(&json!("Ravenna")));
        assert_eq!(doc.get_path("rows.0.sku"), Some(&json!("a")));
        assert_eq!(doc.get_path("missing"), None);
    }
}
