//! Async store wrapper around a synchronous collection backend.
//!
//! # Invariants
//! - One store call holds the backend lock for its whole duration, so every
//!   call observes and produces a consistent collection state.
//! - Writing calls run inside one backend transaction; a failed call leaves
//!   no writes behind.

use crate::filter::projection::Projection;
use crate::model::document::{Document, DocumentId};
use crate::model::schema::RecordSchema;
use crate::store::engine;
use crate::store::query::{Populations, Query, Update, UpdateOptions, UpdateSummary};
use crate::store::{DocumentStore, StoreResult};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Primitive per-collection storage operations.
///
/// Implementations keep documents in insertion order. Writes made between
/// [`begin`](Self::begin) and [`rollback`](Self::rollback) are discarded.
pub trait CollectionBackend: Send {
    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;

    fn scan(&mut self, collection: &str) -> StoreResult<Vec<Document>>;
    fn get(&mut self, collection: &str, id: DocumentId) -> StoreResult<Option<Document>>;
    fn insert(&mut self, collection: &str, id: DocumentId, document: &Document) -> StoreResult<()>;
    fn replace(&mut self, collection: &str, id: DocumentId, document: &Document) -> StoreResult<()>;
    fn remove(&mut self, collection: &str, id: DocumentId) -> StoreResult<bool>;
}

/// [`DocumentStore`] over any [`CollectionBackend`].
pub struct EmbeddedStore<B> {
    backend: Mutex<B>,
}

impl<B: CollectionBackend> EmbeddedStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }
}

#[async_trait]
impl<B: CollectionBackend> DocumentStore for EmbeddedStore<B> {
    async fn create(
        &self,
        schema: &dyn RecordSchema,
        document: Document,
        populations: &Populations,
    ) -> StoreResult<Document> {
        let mut backend = self.backend.lock().await;
        engine::create(&mut *backend, schema, document, populations)
    }

    async fn find(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        populations: &Populations,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        let mut backend = self.backend.lock().await;
        engine::find(&mut *backend, schema, query, populations, projection)
    }

    async fn find_one(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        populations: &Populations,
    ) -> StoreResult<Option<Document>> {
        let mut backend = self.backend.lock().await;
        engine::find_one(&mut *backend, schema, query, populations)
    }

    async fn find_by_id(
        &self,
        schema: &dyn RecordSchema,
        id: DocumentId,
        populations: &Populations,
        projection: &Projection,
    ) -> StoreResult<Option<Document>> {
        let mut backend = self.backend.lock().await;
        engine::find_by_id(&mut *backend, schema, id, populations, projection)
    }

    async fn update(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        update: &Update,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateSummary> {
        let mut backend = self.backend.lock().await;
        engine::update(&mut *backend, schema, query, update, options)
    }

    async fn find_one_and_update(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        update: &Update,
        options: &UpdateOptions,
        populations: &Populations,
    ) -> StoreResult<Option<Document>> {
        let mut backend = self.backend.lock().await;
        engine::find_one_and_update(&mut *backend, schema, query, update, options, populations)
    }

    async fn find_by_id_and_update(
        &self,
        schema: &dyn RecordSchema,
        id: DocumentId,
        update: &Update,
        options: &UpdateOptions,
        populations: &Populations,
    ) -> StoreResult<Option<Document>> {
        let mut backend = self.backend.lock().await;
        engine::find_one_and_update(
            &mut *backend,
            schema,
            &Query::by_id(id),
            update,
            options,
            populations,
        )
    }

    async fn find_by_id_and_remove(
        &self,
        schema: &dyn RecordSchema,
        id: DocumentId,
        populations: &Populations,
    ) -> StoreResult<Option<Document>> {
        let mut backend = self.backend.lock().await;
        engine::find_by_id_and_remove(&mut *backend, schema, id, populations)
    }
}
