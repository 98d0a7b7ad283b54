//! Binary Object Store Abstraction
//!
//! Image bytes live outside the relational store, keyed by the image id. This
//! module abstracts over the backend (local filesystem, a remote bucket, mocks
//! for testing) so the service layer only sees put/get/delete.

pub mod local_store;
pub mod mock_store;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Trait defining the binary object store interface
pub trait BlobStorage: Send + Sync {
    /// Store a blob under the given id, replacing any previous content
    fn put_blob(&self, blob_id: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Retrieve a blob; None when no blob is stored under the id
    fn get_blob(&self, blob_id: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Remove a blob; removing a missing blob is not an error
    fn delete_blob(&self, blob_id: &str) -> Result<(), BlobError>;
}
