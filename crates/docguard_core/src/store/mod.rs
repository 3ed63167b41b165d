//! Document store collaborator contract and embedded adapters.
//!
//! # Responsibility
//! - Define the async CRUD contract services delegate to.
//! - Provide in-memory and SQLite adapters for tests and embedding.
//!
//! # Invariants
//! - Each trait call is one logical store request.
//! - Stores never apply permission filtering; services do.
//! - Stored documents are never populated; population only shapes results.

use crate::db::DbError;
use crate::filter::projection::Projection;
use crate::model::document::{Document, DocumentId};
use crate::model::schema::RecordSchema;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod embedded;
mod engine;
pub mod memory;
pub mod query;
pub mod sqlite;

pub use embedded::{CollectionBackend, EmbeddedStore};
pub use memory::{MemoryCollections, MemoryDocumentStore};
pub use query::{Populations, Query, Update, UpdateOptions, UpdateSummary};
pub use sqlite::{SqliteCollections, SqliteDocumentStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a document store.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidDocument(String),
    InvalidUpdate(String),
    DuplicateId(DocumentId),
    UnknownReference { collection: String, field: String },
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidDocument(message) => write!(f, "invalid document: {message}"),
            Self::InvalidUpdate(message) => write!(f, "invalid update: {message}"),
            Self::DuplicateId(id) => write!(f, "document already exists: {id}"),
            Self::UnknownReference { collection, field } => {
                write!(f, "field `{field}` of `{collection}` is not a reference")
            }
            Self::Unavailable(message) => write!(f, "document store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Async CRUD contract of the external document store.
///
/// Method names follow the ORM query builders the service layer wraps.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `document`, assigning `_id` when missing.
    async fn create(
        &self,
        schema: &dyn RecordSchema,
        document: Document,
        populations: &Populations,
    ) -> StoreResult<Document>;

    /// All documents matching `query`, in insertion order.
    async fn find(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        populations: &Populations,
        projection: &Projection,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        populations: &Populations,
    ) -> StoreResult<Option<Document>>;

    async fn find_by_id(
        &self,
        schema: &dyn RecordSchema,
        id: DocumentId,
        populations: &Populations,
        projection: &Projection,
    ) -> StoreResult<Option<Document>>;

    /// Applies `update` without returning documents.
    async fn update(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        update: &Update,
        options: &UpdateOptions,
    ) -> StoreResult<UpdateSummary>;

    /// Updates the first match; returns it before or after the update
    /// depending on `options.return_updated`.
    async fn find_one_and_update(
        &self,
        schema: &dyn RecordSchema,
        query: &Query,
        update: &Update,
        options: &UpdateOptions,
        populations: &Populations,
    ) -> StoreResult<Option<Document>>;

    async fn find_by_id_and_update(
        &self,
        schema: &dyn RecordSchema,
        id: DocumentId,
        update: &Update,
        options: &UpdateOptions,
        populations: &Populations,
    ) -> StoreResult<Option<Document>>;

    /// Deletes by id and returns the removed document.
    async fn find_by_id_and_remove(
        &self,
        schema: &dyn RecordSchema,
        id: DocumentId,
        populations: &Populations,
    ) -> StoreResult<Option<Document>>;
}
