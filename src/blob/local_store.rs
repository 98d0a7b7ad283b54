//! Local filesystem implementation of the BlobStorage trait
//!
//! One file per blob under the configured base path. Blob ids are the uuid
//! image ids generated by this process, so the id is safe to use as a file
//! name directly.

use crate::blob::{BlobError, BlobStorage};
use crate::config::BlobConfig;
use crate::store::is_well_formed_id;
use log::info;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(config: &BlobConfig) -> Result<Self, BlobError> {
        let base_path = PathBuf::from(&config.base_path);
        fs::create_dir_all(&base_path)?;
        info!("Using local blob store at {}", base_path.display());
        Ok(Self { base_path })
    }

    fn blob_path(&self, blob_id: &str) -> Result<PathBuf, BlobError> {
        // Only ids this process minted reach the store; anything else is
        // rejected rather than joined into a path.
        if !is_well_formed_id(blob_id) {
            return Err(BlobError::Unavailable(format!(
                "invalid blob id: {}",
                blob_id
            )));
        }
        Ok(self.base_path.join(blob_id))
    }
}

impl BlobStorage for LocalBlobStore {
    fn put_blob(&self, blob_id: &str, data: &[u8]) -> Result<(), BlobError> {
        let path = self.blob_path(blob_id)?;
        fs::write(path, data)?;
        Ok(())
    }

    fn get_blob(&self, blob_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.blob_path(blob_id)?;
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_blob(&self, blob_id: &str) -> Result<(), BlobError> {
        let path = self.blob_path(blob_id)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlobBackend;
    use uuid::Uuid;

    fn store_in(dir: &tempfile::TempDir) -> LocalBlobStore {
        let config = BlobConfig {
            backend: BlobBackend::Local,
            base_path: dir.path().join("blobs").to_string_lossy().to_string(),
        };
        LocalBlobStore::new(&config).unwrap()
    }

    #[test]
    fn test_put_get_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let blob_id = Uuid::new_v4().to_string();

        store.put_blob(&blob_id, b"payload").unwrap();
        assert_eq!(store.get_blob(&blob_id).unwrap(), Some(b"payload".to_vec()));

        store.delete_blob(&blob_id).unwrap();
        assert_eq!(store.get_blob(&blob_id).unwrap(), None);
        // deleting again is not an error
        store.delete_blob(&blob_id).unwrap();
    }

    #[test]
    fn test_missing_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get_blob(&Uuid::new_v4().to_string()).unwrap(), None);
    }

    #[test]
    fn test_rejects_non_uuid_blob_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.put_blob("../escape", b"x").is_err());
        assert!(store.get_blob("../escape").is_err());
    }
}
