//! SQLite implementation of the DocumentStorage trait

use crate::config::DatabaseConfig;
use crate::store::{Document, DocumentId, DocumentProjection, DocumentStorage, Image, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Timestamps are stored as fixed-width RFC 3339 text so that the retention
/// sweep's `<` comparison is a plain lexicographic one.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// SQLite implementation of DocumentStorage. A single connection guarded by a
/// mutex; every trait method is one statement, so the per-statement atomicity
/// the services rely on holds.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) the database at the configured path
    pub fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }
        let conn = Connection::open(&config.db_path)?;
        if config.wal_mode {
            let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            info!("SQLite journal mode: {}", mode);
        }
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                modification_secret TEXT NOT NULL,
                owner_external_id TEXT,
                data BLOB,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_accessed_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS images (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                name TEXT NOT NULL,
                mimetype TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_external_id);
            CREATE INDEX IF NOT EXISTS idx_documents_last_accessed ON documents(last_accessed_at);
            CREATE INDEX IF NOT EXISTS idx_images_document ON images(document_id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn image_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Image> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Image {
        id: row.get(0)?,
        document_id: row.get(1)?,
        name: row.get(2)?,
        mimetype: row.get(3)?,
        created_at: decode_ts(4, &created_at)?,
        updated_at: decode_ts(5, &updated_at)?,
    })
}

fn document_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    let last_accessed_at: String = row.get(6)?;
    Ok(Document {
        id: row.get(0)?,
        modification_secret: row.get(1)?,
        owner_external_id: row.get(2)?,
        data: row.get(3)?,
        created_at: decode_ts(4, &created_at)?,
        updated_at: decode_ts(5, &updated_at)?,
        last_accessed_at: decode_ts(6, &last_accessed_at)?,
    })
}

impl DocumentStorage for SqliteDocumentStore {
    fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO documents (id, modification_secret, owner_external_id, data,
                created_at, updated_at, last_accessed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                document.id,
                document.modification_secret,
                document.owner_external_id,
                document.data,
                encode_ts(document.created_at),
                encode_ts(document.updated_at),
                encode_ts(document.last_accessed_at),
            ],
        )?;
        Ok(())
    }

    fn fetch_projection(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentProjection>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let projection = conn
            .query_row(
                "SELECT id, data, modification_secret FROM documents WHERE id = ?1",
                params![document_id],
                |row| {
                    Ok(DocumentProjection {
                        id: row.get(0)?,
                        data: row.get(1)?,
                        modification_secret: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(projection)
    }

    fn touch_last_accessed(
        &self,
        document_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE documents SET last_accessed_at = ?1 WHERE id = ?2",
            params![encode_ts(at), document_id],
        )?;
        Ok(affected > 0)
    }

    fn update_snapshot(
        &self,
        document_id: &str,
        data: &[u8],
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE documents SET data = ?1, updated_at = ?2, last_accessed_at = ?2
             WHERE id = ?3",
            params![data, encode_ts(at), document_id],
        )?;
        Ok(affected > 0)
    }

    fn delete_document(&self, document_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![document_id],
        )?;
        Ok(affected > 0)
    }

    fn documents_by_owner(&self, owner_external_id: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, modification_secret, owner_external_id, data,
                    created_at, updated_at, last_accessed_at
             FROM documents WHERE owner_external_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![owner_external_id], document_from_row)?;
        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?);
        }
        Ok(documents)
    }

    fn stale_document_ids(&self, cutoff: DateTime<Utc>) -> Result<Vec<DocumentId>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id FROM documents WHERE last_accessed_at < ?1")?;
        let rows = stmt.query_map(params![encode_ts(cutoff)], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn insert_image(&self, image: &Image) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO images (id, document_id, name, mimetype, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                image.id,
                image.document_id,
                image.name,
                image.mimetype,
                encode_ts(image.created_at),
                encode_ts(image.updated_at),
            ],
        )?;
        Ok(())
    }

    fn fetch_image(&self, image_id: &str) -> Result<Option<Image>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let image = conn
            .query_row(
                "SELECT id, document_id, name, mimetype, created_at, updated_at
                 FROM images WHERE id = ?1",
                params![image_id],
                image_from_row,
            )
            .optional()?;
        Ok(image)
    }

    fn delete_image(&self, image_id: &str) -> Result<Option<Image>, StoreError> {
        let existing = self.fetch_image(image_id)?;
        if existing.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM images WHERE id = ?1", params![image_id])?;
        }
        Ok(existing)
    }

    fn images_for_document(&self, document_id: &str) -> Result<Vec<Image>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, name, mimetype, created_at, updated_at
             FROM images WHERE document_id = ?1",
        )?;
        let rows = stmt.query_map(params![document_id], image_from_row)?;
        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }
        Ok(images)
    }
}
