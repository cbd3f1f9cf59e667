//! In-memory backend implementation.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::core::DataLayer;
use crate::error::{ConcurrencyError, DocumentError, StorageResult};
use crate::types::{Filter, FindResult, Query, StoredDocument};

type Collection = BTreeMap<String, StoredDocument>;

/// In-memory document storage.
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
}

impl Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collections = self.collections.read();
        let sizes: BTreeMap<&str, usize> = collections
            .iter()
            .map(|(name, docs)| (name.as_str(), docs.len()))
            .collect();
        f.debug_struct("MemoryBackend")
            .field("collections", &sizes)
            .finish()
    }
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fully-formed document, replacing any document with the same id.
    ///
    /// Used to load fixtures with fixed identifiers or timestamps.
    pub fn put(&self, collection: &str, document: StoredDocument) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(document.id().to_string(), document);
    }

    fn check_etag(
        collection: &str,
        current: &StoredDocument,
        expected_etag: Option<&str>,
    ) -> StorageResult<()> {
        match expected_etag {
            Some(expected) if !current.matches_etag(expected) => {
                Err(ConcurrencyError::EtagMismatch {
                    collection: collection.to_string(),
                    id: current.id().to_string(),
                    expected: expected.to_string(),
                    actual: current.etag().to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    fn not_found(collection: &str, id: &str) -> DocumentError {
        DocumentError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl DataLayer for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, collection: &str, query: &Query) -> StorageResult<FindResult> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(FindResult::default());
        };

        let mut matching: Vec<&StoredDocument> =
            docs.values().filter(|d| query.matches(d)).collect();
        if !query.sort.is_empty() {
            // Stable sort keeps insertion order between equal keys.
            matching.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|key| key.compare(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let total = matching.len();
        let documents: Vec<StoredDocument> = matching
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        trace!(
            collection = %collection,
            total = total,
            returned = documents.len(),
            "Executed find"
        );

        Ok(FindResult { documents, total })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StorageResult<Option<StoredDocument>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.values().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> StorageResult<Option<StoredDocument>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn insert(
        &self,
        collection: &str,
        content: Map<String, Value>,
    ) -> StorageResult<StoredDocument> {
        let document = StoredDocument::new(content);
        self.put(collection, document.clone());
        debug!(collection = %collection, id = %document.id(), "Inserted document");
        Ok(document)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        expected_etag: Option<&str>,
        changes: Map<String, Value>,
    ) -> StorageResult<StoredDocument> {
        let mut collections = self.collections.write();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection, id))?;
        let current = docs.remove(id).ok_or_else(|| Self::not_found(collection, id))?;

        if let Err(e) = Self::check_etag(collection, &current, expected_etag) {
            docs.insert(id.to_string(), current);
            return Err(e);
        }

        let updated = current.apply_changes(changes);
        docs.insert(id.to_string(), updated.clone());
        debug!(collection = %collection, id = %id, etag = %updated.etag(), "Updated document");
        Ok(updated)
    }

    async fn remove(
        &self,
        collection: &str,
        id: &str,
        expected_etag: Option<&str>,
    ) -> StorageResult<()> {
        let mut collections = self.collections.write();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection, id))?;
        let current = docs.get(id).ok_or_else(|| Self::not_found(collection, id))?;
        Self::check_etag(collection, current, expected_etag)?;

        docs.remove(id);
        debug!(collection = %collection, id = %id, "Removed document");
        Ok(())
    }

    async fn remove_all(&self, collection: &str) -> StorageResult<usize> {
        let removed = self
            .collections
            .write()
            .remove(collection)
            .map(|docs| docs.len())
            .unwrap_or(0);
        debug!(collection = %collection, removed = removed, "Removed all documents");
        Ok(removed)
    }

    async fn count(&self, collection: &str) -> StorageResult<usize> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use serde_json::json;

    fn content(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let backend = MemoryBackend::new();
        let stored = backend.insert("contacts", content(json!({"a": 1}))).await.unwrap();

        let found = backend.find_by_id("contacts", stored.id()).await.unwrap();
        assert_eq!(found, Some(stored));
        assert!(backend.find_by_id("invoices", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_checks_etag_atomically() {
        let backend = MemoryBackend::new();
        let stored = backend.insert("contacts", content(json!({"a": 1}))).await.unwrap();

        let err = backend
            .update("contacts", stored.id(), Some("stale"), content(json!({"a": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Concurrency(_)));

        // The failed write left the document untouched.
        let current = backend.find_by_id("contacts", stored.id()).await.unwrap().unwrap();
        assert_eq!(current.content()["a"], 1);

        let updated = backend
            .update("contacts", stored.id(), Some(stored.etag()), content(json!({"a": 2})))
            .await
            .unwrap();
        assert_eq!(updated.content()["a"], 2);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.remove("contacts", "nope", None).await.unwrap_err();
        assert!(matches!(err, StorageError::Document(DocumentError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_debug_lists_collection_sizes() {
        let backend = MemoryBackend::new();
        backend.insert("contacts", content(json!({}))).await.unwrap();
        assert!(format!("{:?}", backend).contains("contacts"));
    }
}
