//! In-memory collection backend.

use crate::model::document::{document_id, Document, DocumentId};
use crate::store::embedded::{CollectionBackend, EmbeddedStore};
use crate::store::{StoreError, StoreResult};
use std::collections::HashMap;

/// Process-local collections keyed by name, each in insertion order.
#[derive(Debug, Default)]
pub struct MemoryCollections {
    collections: HashMap<String, Vec<Document>>,
    snapshot: Option<HashMap<String, Vec<Document>>>,
}

/// Document store kept entirely in memory.
pub type MemoryDocumentStore = EmbeddedStore<MemoryCollections>;

impl EmbeddedStore<MemoryCollections> {
    pub fn new() -> Self {
        Self::with_backend(MemoryCollections::default())
    }
}

impl Default for EmbeddedStore<MemoryCollections> {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCollections {
    fn position(&self, collection: &str, id: DocumentId) -> Option<usize> {
        self.collections
            .get(collection)?
            .iter()
            .position(|document| document_id(document) == Some(id))
    }
}

impl CollectionBackend for MemoryCollections {
    fn begin(&mut self) -> StoreResult<()> {
        self.snapshot = Some(self.collections.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.collections = snapshot;
        }
        Ok(())
    }

    fn scan(&mut self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    fn get(&mut self, collection: &str, id: DocumentId) -> StoreResult<Option<Document>> {
        Ok(self
            .position(collection, id)
            .and_then(|index| self.collections.get(collection)?.get(index).cloned()))
    }

    fn insert(&mut self, collection: &str, id: DocumentId, document: &Document) -> StoreResult<()> {
        if self.position(collection, id).is_some() {
            return Err(StoreError::DuplicateId(id));
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }

    fn replace(&mut self, collection: &str, id: DocumentId, document: &Document) -> StoreResult<()> {
        let index = self.position(collection, id).ok_or_else(|| {
            StoreError::InvalidDocument(format!("document {id} vanished from `{collection}`"))
        })?;
        if let Some(slot) = self
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(index))
        {
            *slot = document.clone();
        }
        Ok(())
    }

    fn remove(&mut self, collection: &str, id: DocumentId) -> StoreResult<bool> {
        let Some(index) = self.position(collection, id) else {
            return Ok(false);
        };
        if let Some(documents) = self.collections.get_mut(collection) {
            documents.remove(index);
        }
        Ok(true)
    }
}
