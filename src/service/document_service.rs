//! Document lifecycle service
//!
//! Owns create, projection fetch, touch, snapshot update, cascading delete and
//! list-by-owner. "Not found" is always a soft result here; callers test the
//! returned `Option`/`bool`.

use crate::blob::BlobStorage;
use crate::store::{is_well_formed_id, Document, DocumentProjection, DocumentStorage, StoreError};
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

pub struct DocumentService {
    store: Arc<dyn DocumentStorage>,
    blobs: Arc<dyn BlobStorage>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStorage>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self { store, blobs }
    }

    /// Create a new document with a fresh id and modification secret. No
    /// snapshot data yet; the collaboration engine synthesizes the initial
    /// structure on first load.
    pub fn create(&self, owner_external_id: Option<&str>) -> Result<Document, StoreError> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4().to_string(),
            modification_secret: Uuid::new_v4().to_string(),
            owner_external_id: owner_external_id.map(str::to_string),
            data: None,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
        };
        self.store.insert_document(&document)?;
        info!("Created document {}", document.id);
        Ok(document)
    }

    /// The access-check projection: id, snapshot and secret, nothing else.
    /// None for malformed identifiers without touching the store.
    pub fn fetch_for_access_check(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentProjection>, StoreError> {
        if !is_well_formed_id(document_id) {
            return Ok(None);
        }
        self.store.fetch_projection(document_id)
    }

    /// Exact comparison of a caller-supplied secret against the stored one.
    /// False for malformed ids and absent documents; never an error for
    /// either. No side effects.
    pub fn verify_modification_secret(
        &self,
        document_id: &str,
        supplied: &str,
    ) -> Result<bool, StoreError> {
        let projection = self.fetch_for_access_check(document_id)?;
        Ok(projection
            .map(|p| p.modification_secret == supplied)
            .unwrap_or(false))
    }

    /// Best-effort `last_accessed_at` bump. A vanished row is an expected
    /// race with the retention sweep and must not raise.
    pub fn touch_last_accessed(&self, document_id: &str) -> Result<(), StoreError> {
        if !is_well_formed_id(document_id) {
            return Ok(());
        }
        let touched = self.store.touch_last_accessed(document_id, Utc::now())?;
        if !touched {
            debug!("Skipped touch, document {} no longer exists", document_id);
        }
        Ok(())
    }

    /// Replace the snapshot blob; false when the document is gone or the id
    /// is malformed. Empty payloads are written through as-is.
    pub fn update_snapshot(&self, document_id: &str, data: &[u8]) -> Result<bool, StoreError> {
        if !is_well_formed_id(document_id) {
            return Ok(false);
        }
        self.store.update_snapshot(document_id, data, Utc::now())
    }

    /// Delete a document and everything attached to it: image rows first,
    /// each with its blob, then the document row. A failing blob delete is
    /// logged and skipped so the row cleanup always proceeds; otherwise
    /// orphaned rows would accumulate forever.
    pub fn delete_by_id(&self, document_id: &str) -> Result<bool, StoreError> {
        if !is_well_formed_id(document_id) {
            return Ok(false);
        }
        for image in self.store.images_for_document(document_id)? {
            if self.store.delete_image(&image.id)?.is_some() {
                if let Err(e) = self.blobs.delete_blob(&image.id) {
                    warn!("Failed to delete blob for image {}: {}", image.id, e);
                }
            }
        }
        let deleted = self.store.delete_document(document_id)?;
        if deleted {
            info!("Deleted document {}", document_id);
        }
        Ok(deleted)
    }

    /// Documents belonging to an owner, newest first. No owner means no
    /// listing: the anonymous case returns empty without a store call.
    pub fn list_by_owner(
        &self,
        owner_external_id: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        match owner_external_id {
            Some(owner) if !owner.is_empty() => self.store.documents_by_owner(owner),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::mock_store::MockBlobStore;
    use crate::store::mock_store::MockDocumentStore;
    use crate::store::Image;

    fn service() -> (DocumentService, Arc<MockDocumentStore>, Arc<MockBlobStore>) {
        let store = Arc::new(MockDocumentStore::new());
        let blobs = Arc::new(MockBlobStore::new());
        (
            DocumentService::new(store.clone(), blobs.clone()),
            store,
            blobs,
        )
    }

    fn attach_image(store: &MockDocumentStore, blobs: &MockBlobStore, document_id: &str) -> Image {
        let now = Utc::now();
        let image = Image {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            name: "image.png".to_string(),
            mimetype: "image/png".to_string(),
            created_at: now,
            updated_at: now,
        };
        store.insert_image(&image).unwrap();
        blobs.put_blob(&image.id, b"pixels").unwrap();
        image
    }

    #[test]
    fn test_create_assigns_owner_and_fresh_secret() {
        let (service, _, _) = service();
        let owned = service.create(Some("owner-123")).unwrap();
        assert_eq!(owned.owner_external_id.as_deref(), Some("owner-123"));
        assert!(owned.data.is_none());

        let anonymous = service.create(None).unwrap();
        assert!(anonymous.owner_external_id.is_none());
        assert_ne!(owned.modification_secret, anonymous.modification_secret);
    }

    #[test]
    fn test_verify_modification_secret() {
        let (service, _, _) = service();
        let document = service.create(None).unwrap();

        assert!(service
            .verify_modification_secret(&document.id, &document.modification_secret)
            .unwrap());
        assert!(!service
            .verify_modification_secret(&document.id, "anything-else")
            .unwrap());
        assert!(!service
            .verify_modification_secret("invalid", &document.modification_secret)
            .unwrap());
        assert!(!service
            .verify_modification_secret(&Uuid::new_v4().to_string(), "whatever")
            .unwrap());
    }

    #[test]
    fn test_fetch_for_access_check_short_circuits_malformed_ids() {
        let (service, store, _) = service();
        assert!(service.fetch_for_access_check("invalid").unwrap().is_none());
        assert_eq!(store.document_count(), 0);
    }

    #[test]
    fn test_touch_is_silent_for_missing_and_malformed() {
        let (service, _, _) = service();
        service.touch_last_accessed("invalid").unwrap();
        service
            .touch_last_accessed(&Uuid::new_v4().to_string())
            .unwrap();
    }

    #[test]
    fn test_update_snapshot() {
        let (service, _, _) = service();
        let document = service.create(None).unwrap();

        assert!(service.update_snapshot(&document.id, &[7, 7]).unwrap());
        let projection = service
            .fetch_for_access_check(&document.id)
            .unwrap()
            .unwrap();
        assert_eq!(projection.data, Some(vec![7, 7]));

        // empty payloads are written through, not rejected
        assert!(service.update_snapshot(&document.id, &[]).unwrap());

        assert!(!service.update_snapshot("invalid", &[1]).unwrap());
        assert!(!service
            .update_snapshot(&Uuid::new_v4().to_string(), &[1])
            .unwrap());
    }

    #[test]
    fn test_delete_cascades_to_images_and_blobs() {
        let (service, store, blobs) = service();
        let document = service.create(None).unwrap();
        attach_image(&store, &blobs, &document.id);
        attach_image(&store, &blobs, &document.id);

        assert!(service.delete_by_id(&document.id).unwrap());
        assert_eq!(store.image_count(), 0);
        assert_eq!(blobs.blob_count(), 0);
        assert!(service
            .fetch_for_access_check(&document.id)
            .unwrap()
            .is_none());

        // idempotent: deleting again is a soft NotFound, not an error
        assert!(!service.delete_by_id(&document.id).unwrap());
    }

    #[test]
    fn test_delete_proceeds_when_blob_cleanup_fails() {
        let (service, store, blobs) = service();
        let document = service.create(None).unwrap();
        attach_image(&store, &blobs, &document.id);

        blobs.set_fail_deletes(true);
        assert!(service.delete_by_id(&document.id).unwrap());
        // the row is gone even though the blob is stranded
        assert_eq!(store.image_count(), 0);
        assert_eq!(store.document_count(), 0);
        assert_eq!(blobs.blob_count(), 1);
    }

    #[test]
    fn test_list_by_owner() {
        let (service, store, _) = service();
        let first = service.create(Some("owner-A")).unwrap();
        let second = service.create(Some("owner-A")).unwrap();
        service.create(Some("owner-B")).unwrap();

        let documents = service.list_by_owner(Some("owner-A")).unwrap();
        assert_eq!(documents.len(), 2);
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert!(ids.contains(&first.id.as_str()));
        assert!(ids.contains(&second.id.as_str()));

        // anonymous callers get an empty listing without a store call
        store.clear();
        assert!(service.list_by_owner(None).unwrap().is_empty());
        assert!(service.list_by_owner(Some("")).unwrap().is_empty());
    }
}
