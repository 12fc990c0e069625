//! Process-local document store for paper runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use short_straddle_core::{Document, DocumentFilter, DocumentId, DocumentStore, Result, StrategyError};

#[derive(Debug, Default)]
struct Inner {
    next_id: DocumentId,
    collections: HashMap<String, Vec<Document>>,
}

/// Document store kept entirely in memory. Contents die with the process.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of a collection, in insertion order.
    #[must_use]
    pub fn documents(&self, name: &str) -> Vec<Document> {
        self.inner
            .read()
            .collections
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

fn matches(doc: &Document, filter: &DocumentFilter) -> bool {
    match filter {
        DocumentFilter::ById(id) => doc.id == *id,
        DocumentFilter::ByKey(key) => doc.key == *key,
    }
}

fn missing_collection(name: &str) -> StrategyError {
    StrategyError::persistence(format!("collection {name} does not exist"))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_collection(&self, name: &str) -> Result<()> {
        self.inner
            .write()
            .collections
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn read(&self, filter: &DocumentFilter, name: &str) -> Result<Option<Document>> {
        let inner = self.inner.read();
        let docs = inner.collections.get(name).ok_or_else(|| missing_collection(name))?;
        Ok(docs.iter().find(|doc| matches(doc, filter)).cloned())
    }

    async fn insert(&self, key: &str, body: &serde_json::Value, name: &str) -> Result<DocumentId> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        let docs = inner
            .collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))?;
        if docs.iter().any(|doc| doc.key == key) {
            return Err(StrategyError::persistence(format!(
                "document {key} already exists in {name}"
            )));
        }
        docs.push(Document {
            id,
            key: key.to_string(),
            body: body.clone(),
        });
        Ok(id)
    }

    async fn update(&self, filter: &DocumentFilter, body: &serde_json::Value, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let docs = inner
            .collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))?;
        let doc = docs
            .iter_mut()
            .find(|doc| matches(doc, filter))
            .ok_or_else(|| StrategyError::persistence(format!("no document in {name} matches {filter:?}")))?;
        doc.body = body.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_requires_collection() {
        let store = InMemoryDocumentStore::new();
        let err = store.insert("k", &json!({}), "missing").await.unwrap_err();
        assert!(matches!(err, StrategyError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_body() {
        let store = InMemoryDocumentStore::new();
        store.ensure_collection("twelve_thirty").await.unwrap();
        let id = store.insert("2026-10-19", &json!({"a": 1}), "twelve_thirty").await.unwrap();
        store
            .update(&DocumentFilter::ById(id), &json!({"a": 2}), "twelve_thirty")
            .await
            .unwrap();

        let docs = store.documents("twelve_thirty");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body, json!({"a": 2}));

        let found = store
            .read(&DocumentFilter::ByKey("2026-10-19".to_string()), "twelve_thirty")
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.id), Some(id));
    }

    #[tokio::test]
    async fn test_update_without_match_fails() {
        let store = InMemoryDocumentStore::new();
        store.ensure_collection("twelve_thirty").await.unwrap();
        let err = store
            .update(&DocumentFilter::ById(7), &json!({}), "twelve_thirty")
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::Persistence(_)));
    }
}
