//! Mock implementation of the BlobStorage trait for testing

use crate::blob::{BlobError, BlobStorage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory blob store. `fail_deletes` lets tests simulate an unavailable
/// backend during cleanup.
pub struct MockBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_deletes: AtomicBool,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Number of stored blobs (test helper)
    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Make every subsequent delete fail (test helper)
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStorage for MockBlobStore {
    fn put_blob(&self, blob_id: &str, data: &[u8]) -> Result<(), BlobError> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert(blob_id.to_string(), data.to_vec());
        Ok(())
    }

    fn get_blob(&self, blob_id: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs.get(blob_id).cloned())
    }

    fn delete_blob(&self, blob_id: &str) -> Result<(), BlobError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("simulated delete failure".to_string()));
        }
        let mut blobs = self.blobs.lock().unwrap();
        blobs.remove(blob_id);
        Ok(())
    }
}
