//! Core document storage trait.
//!
//! This module defines the [`DataLayer`] trait, which provides the operations
//! the REST layer performs on document collections. Collections are addressed
//! by the resource name they back.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageResult;
use crate::types::{Condition, DocumentField, Filter, FindResult, Query, StoredDocument};

/// Core storage trait for document collections.
///
/// # Versioning
///
/// Every write renews the document's etag and `updated` timestamp. Writes that
/// carry an expected etag are checked and applied atomically, so a concurrent
/// writer cannot slip in between the check and the write.
///
/// # Example
///
/// ```ignore
/// use vesper_persistence::core::DataLayer;
/// use vesper_persistence::types::Query;
///
/// async fn example<S: DataLayer>(storage: &S) -> vesper_persistence::StorageResult<()> {
///     let doc = serde_json::json!({"ref": "1234567890123456789012345"});
///     let stored = storage.insert("contacts", doc.as_object().unwrap().clone()).await?;
///
///     let page = storage.find("contacts", &Query::all().with_page(1, 25)).await?;
///     assert_eq!(page.total, 1);
///
///     storage.remove("contacts", stored.id(), Some(stored.etag())).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait DataLayer: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Returns a page of documents matching the query, plus the match count.
    async fn find(&self, collection: &str, query: &Query) -> StorageResult<FindResult>;

    /// Returns the first document matching the filter, in insertion order.
    async fn find_one(&self, collection: &str, filter: &Filter)
    -> StorageResult<Option<StoredDocument>>;

    /// Inserts a new document and returns it with its metadata.
    async fn insert(
        &self,
        collection: &str,
        content: Map<String, Value>,
    ) -> StorageResult<StoredDocument>;

    /// Merges `changes` into an existing document.
    ///
    /// When `expected_etag` is given, the write only happens if it matches the
    /// stored etag.
    ///
    /// # Errors
    ///
    /// * `StorageError::Document(NotFound)` - If the document doesn't exist
    /// * `StorageError::Concurrency(EtagMismatch)` - If the etag check fails
    async fn update(
        &self,
        collection: &str,
        id: &str,
        expected_etag: Option<&str>,
        changes: Map<String, Value>,
    ) -> StorageResult<StoredDocument>;

    /// Removes a document.
    ///
    /// # Errors
    ///
    /// * `StorageError::Document(NotFound)` - If the document doesn't exist
    /// * `StorageError::Concurrency(EtagMismatch)` - If the etag check fails
    async fn remove(
        &self,
        collection: &str,
        id: &str,
        expected_etag: Option<&str>,
    ) -> StorageResult<()>;

    /// Removes every document of a collection and returns how many were removed.
    async fn remove_all(&self, collection: &str) -> StorageResult<usize>;

    /// Counts the documents of a collection.
    async fn count(&self, collection: &str) -> StorageResult<usize>;

    /// Reads a document by identifier.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> StorageResult<Option<StoredDocument>> {
        let filter = Filter::new().and(Condition::eq(DocumentField::Id, id));
        self.find_one(collection, &filter).await
    }

    /// Inserts several documents in order.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Map<String, Value>>,
    ) -> StorageResult<Vec<StoredDocument>> {
        let mut stored = Vec::with_capacity(documents.len());
        for content in documents {
            stored.push(self.insert(collection, content).await?);
        }
        Ok(stored)
    }
}
