//! Relational Store Abstraction
//!
//! This module provides an abstraction over the relational store that holds
//! document and image records, allowing the system to use different backends
//! (SQLite, a remote database, mocks for testing) without affecting the
//! service layer.

pub mod mock_store;
pub mod sqlite_store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a store backend. "Not found" is never an error at this
/// layer; it is an `Option`/`bool` result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A persisted collaborative document.
///
/// `id` and `modification_secret` are fixed at creation and never change;
/// possession of the secret proves write authorization. The `data` blob is the
/// opaque snapshot owned by the collaboration engine and is never serialized
/// into API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub modification_secret: String,
    pub owner_external_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub data: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

/// The narrow projection used for access checks: everything authorization
/// needs, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentProjection {
    pub id: String,
    pub data: Option<Vec<u8>>,
    pub modification_secret: String,
}

/// Metadata record for an uploaded image. The bytes themselves live in the
/// blob store, keyed by the image id. An image's lifetime is bounded by its
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub document_id: String,
    pub name: String,
    pub mimetype: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document identifier type
pub type DocumentId = String;

/// Image identifier type
pub type ImageId = String;

/// Whether an identifier is well-formed. Malformed identifiers short-circuit
/// to "not found" before any store call is made.
pub fn is_well_formed_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Trait defining the relational storage interface for documents and images.
/// Each method is a single atomic statement against the backend; callers treat
/// zero rows affected as a soft "already gone" result.
pub trait DocumentStorage: Send + Sync {
    /// Insert a freshly created document row
    fn insert_document(&self, document: &Document) -> Result<(), StoreError>;

    /// Fetch the access-check projection (`id`, `data`, `modification_secret`)
    fn fetch_projection(&self, document_id: &str)
        -> Result<Option<DocumentProjection>, StoreError>;

    /// Update `last_accessed_at`; false when the row no longer exists
    fn touch_last_accessed(&self, document_id: &str, at: DateTime<Utc>)
        -> Result<bool, StoreError>;

    /// Replace the snapshot blob and bump `updated_at` + `last_accessed_at`
    /// in one statement; false when the row no longer exists
    fn update_snapshot(&self, document_id: &str, data: &[u8], at: DateTime<Utc>)
        -> Result<bool, StoreError>;

    /// Delete a document row; false when it was already gone
    fn delete_document(&self, document_id: &str) -> Result<bool, StoreError>;

    /// All documents with the given owner, newest first
    fn documents_by_owner(&self, owner_external_id: &str) -> Result<Vec<Document>, StoreError>;

    /// Ids of documents whose `last_accessed_at` is strictly older than the
    /// cutoff; this is the retention sweep's selection snapshot
    fn stale_document_ids(&self, cutoff: DateTime<Utc>) -> Result<Vec<DocumentId>, StoreError>;

    /// Insert an image metadata row
    fn insert_image(&self, image: &Image) -> Result<(), StoreError>;

    /// Fetch an image metadata row
    fn fetch_image(&self, image_id: &str) -> Result<Option<Image>, StoreError>;

    /// Delete an image metadata row, returning the removed record
    fn delete_image(&self, image_id: &str) -> Result<Option<Image>, StoreError>;

    /// All images attached to a document
    fn images_for_document(&self, document_id: &str) -> Result<Vec<Image>, StoreError>;
}
