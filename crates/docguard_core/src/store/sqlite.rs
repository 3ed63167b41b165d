//! SQLite collection backend.
//!
//! # Responsibility
//! - Persist documents as JSON text rows in the `documents` table.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Rows are returned in insertion (`rowid`) order.
//! - Read paths reject rows whose body is not a JSON object.
//! - Engine writes run in one `BEGIN IMMEDIATE` transaction per store call.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::document::{into_document, Document, DocumentId};
use crate::store::embedded::{CollectionBackend, EmbeddedStore};
use crate::store::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Collections stored in one SQLite database.
pub struct SqliteCollections {
    conn: Connection,
}

/// Document store persisted to SQLite.
pub type SqliteDocumentStore = EmbeddedStore<SqliteCollections>;

impl SqliteCollections {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl EmbeddedStore<SqliteCollections> {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::with_backend(SqliteCollections::new(open_db(path)?)))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::with_backend(SqliteCollections::new(open_db_in_memory()?)))
    }
}

impl CollectionBackend for SqliteCollections {
    fn begin(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }

    fn scan(&mut self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM documents
             WHERE collection = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([collection])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_body(row.get::<_, String>(0)?)?);
        }
        Ok(documents)
    }

    fn get(&mut self, collection: &str, id: DocumentId) -> StoreResult<Option<Document>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        body.map(parse_body).transpose()
    }

    fn insert(&mut self, collection: &str, id: DocumentId, document: &Document) -> StoreResult<()> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id.to_string(), encode_body(document)?],
        )?;
        if inserted == 0 {
            return Err(StoreError::DuplicateId(id));
        }
        Ok(())
    }

    fn replace(&mut self, collection: &str, id: DocumentId, document: &Document) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?2 AND id = ?3;",
            params![encode_body(document)?, collection, id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::InvalidDocument(format!(
                "document {id} vanished from `{collection}`"
            )));
        }
        Ok(())
    }

    fn remove(&mut self, collection: &str, id: DocumentId) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id.to_string()],
        )?;
        Ok(removed > 0)
    }
}

fn encode_body(document: &Document) -> StoreResult<String> {
    serde_json::to_string(document)
        .map_err(|err| StoreError::InvalidDocument(format!("cannot encode document: {err}")))
}

fn parse_body(body: String) -> StoreResult<Document> {
    let value: serde_json::Value = serde_json::from_str(&body).map_err(|err| {
        StoreError::InvalidDocument(format!("invalid persisted body in documents.body: {err}"))
    })?;
    into_document(value).ok_or_else(|| {
        StoreError::InvalidDocument("persisted body in documents.body is not an object".to_string())
    })
}
