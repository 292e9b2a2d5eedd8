//! Pinkeeper Storage Layer
//!
//! Implements the DocumentStore trait on SQLite.
//!
//! # Architecture
//!
//! - One `documents` table keyed by (collection, id)
//! - Bodies are JSON objects; upserts merge fields into the stored object
//! - A single connection behind a mutex; every operation is short and never
//!   held across an await point
//!
//! # Examples
//!
//! ```no_run
//! use pinkeeper_store::SqliteDocumentStore;
//!
//! let store = SqliteDocumentStore::new(":memory:").unwrap();
//! // Store is now ready for settings documents
//! ```

#![warn(missing_docs)]

use async_trait::async_trait;
use pinkeeper_domain::{Collection, Document, DocumentStore};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Field holding the document's own id, written on insert only
pub const ID_FIELD: &str = "_id";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored body is not a JSON object
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A previous holder of the connection panicked
    #[error("Connection lock poisoned")]
    Poisoned,
}

/// SQLite-based implementation of DocumentStore
///
/// # Thread Safety
///
/// The connection is guarded by a mutex so one store can be shared across tasks.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.connection()?.execute_batch(schema)?;
        Ok(())
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let count: i64 = self.connection()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn parse_document(body: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::InvalidData(format!(
            "expected a JSON object, found {}",
            other
        ))),
        Err(e) => Err(StoreError::InvalidData(e.to_string())),
    }
}

fn load_document(
    conn: &Connection,
    collection: Collection,
    id: &str,
) -> Result<Option<Document>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            |row| row.get(0),
        )
        .optional()?;

    body.as_deref().map(parse_document).transpose()
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    type Error = StoreError;

    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, Self::Error> {
        let conn = self.connection()?;
        load_document(&conn, collection, id)
    }

    async fn upsert_document(
        &self,
        collection: Collection,
        id: &str,
        fields: Document,
    ) -> Result<(), Self::Error> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let mut document = match load_document(&tx, collection, id)? {
            Some(existing) => existing,
            None => {
                let mut fresh = Document::new();
                fresh.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
                fresh
            }
        };
        for (name, value) in fields {
            document.insert(name, value);
        }

        let body = Value::Object(document).to_string();
        tx.execute(
            "INSERT INTO documents (collection, id, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET
             body = excluded.body, updated_at = excluded.updated_at",
            params![
                collection.as_str(),
                id,
                body,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(collection = collection.as_str(), id, "document upserted");
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<bool, Self::Error> {
        let removed = self.connection()?.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
        Ok(removed > 0)
    }
}
