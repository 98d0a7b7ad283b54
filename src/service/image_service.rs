//! Image lifecycle service
//!
//! Image metadata rows are owned here; the bytes live in the blob store keyed
//! by the image id, and the HTTP layer performs the upload/cleanup around
//! these calls.

use crate::store::{is_well_formed_id, DocumentStorage, Image, StoreError};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

pub struct ImageService {
    store: Arc<dyn DocumentStorage>,
}

impl ImageService {
    pub fn new(store: Arc<dyn DocumentStorage>) -> Self {
        Self { store }
    }

    /// Create an image record attached to an existing document. None when the
    /// document does not exist. The stored name never echoes the uploaded
    /// filename; only the extension survives.
    pub fn create(
        &self,
        document_id: &str,
        mimetype: &str,
        original_filename: Option<&str>,
    ) -> Result<Option<Image>, StoreError> {
        if !is_well_formed_id(document_id) {
            return Ok(None);
        }
        if self.store.fetch_projection(document_id)?.is_none() {
            return Ok(None);
        }
        let now = Utc::now();
        let image = Image {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            name: anonymized_name(mimetype, original_filename),
            mimetype: mimetype.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_image(&image)?;
        info!("Created image {} for document {}", image.id, document_id);
        Ok(Some(image))
    }

    /// None for malformed or unknown ids, without querying in the malformed
    /// case.
    pub fn fetch(&self, image_id: &str) -> Result<Option<Image>, StoreError> {
        if !is_well_formed_id(image_id) {
            return Ok(None);
        }
        self.store.fetch_image(image_id)
    }

    /// Remove the metadata row, returning the removed record. The caller is
    /// responsible for removing the blob afterwards and treats a failing blob
    /// delete as non-fatal.
    pub fn delete(&self, image_id: &str) -> Result<Option<Image>, StoreError> {
        if !is_well_formed_id(image_id) {
            return Ok(None);
        }
        self.store.delete_image(image_id)
    }
}

/// Derive the stored image name from the upload: the client-supplied filename
/// is dropped, keeping at most its extension, with the mime subtype as a
/// fallback.
fn anonymized_name(mimetype: &str, original_filename: Option<&str>) -> String {
    let extension = original_filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(char::is_alphanumeric))
        .or_else(|| {
            mimetype
                .split_once('/')
                .map(|(_, subtype)| subtype.to_ascii_lowercase())
                .filter(|subtype| !subtype.is_empty())
        });
    match extension {
        Some(ext) => format!("image.{}", ext),
        None => "image".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::mock_store::MockBlobStore;
    use crate::service::document_service::DocumentService;
    use crate::store::mock_store::MockDocumentStore;

    fn services() -> (DocumentService, ImageService, Arc<MockDocumentStore>) {
        let store = Arc::new(MockDocumentStore::new());
        let blobs = Arc::new(MockBlobStore::new());
        (
            DocumentService::new(store.clone(), blobs),
            ImageService::new(store.clone()),
            store,
        )
    }

    #[test]
    fn test_create_image_for_existing_document() {
        let (documents, images, _) = services();
        let document = documents.create(None).unwrap();

        let image = images
            .create(&document.id, "image/png", Some("holiday photo.PNG"))
            .unwrap()
            .unwrap();
        assert_eq!(image.document_id, document.id);
        assert_eq!(image.mimetype, "image/png");
        assert_eq!(image.name, "image.png");
    }

    #[test]
    fn test_create_image_requires_existing_document() {
        let (_, images, store) = services();
        assert!(images
            .create(&Uuid::new_v4().to_string(), "image/png", None)
            .unwrap()
            .is_none());
        assert!(images.create("invalid", "image/png", None).unwrap().is_none());
        assert_eq!(store.image_count(), 0);
    }

    #[test]
    fn test_fetch_and_delete() {
        let (documents, images, _) = services();
        let document = documents.create(None).unwrap();
        let image = images
            .create(&document.id, "image/jpeg", Some("x.jpg"))
            .unwrap()
            .unwrap();

        assert_eq!(images.fetch(&image.id).unwrap(), Some(image.clone()));
        assert!(images.fetch("invalid").unwrap().is_none());
        assert!(images.fetch(&Uuid::new_v4().to_string()).unwrap().is_none());

        assert_eq!(images.delete(&image.id).unwrap(), Some(image.clone()));
        assert!(images.delete(&image.id).unwrap().is_none());
    }

    #[test]
    fn test_anonymized_name_variants() {
        assert_eq!(anonymized_name("image/png", Some("secret-notes.png")), "image.png");
        assert_eq!(anonymized_name("image/png", Some("UPPER.PNG")), "image.png");
        // no usable extension falls back to the mime subtype
        assert_eq!(anonymized_name("image/webp", Some("noextension")), "image.webp");
        assert_eq!(anonymized_name("image/gif", None), "image.gif");
        // pathological inputs never leak through
        assert_eq!(anonymized_name("image/png", Some("a.<script>")), "image.png");
    }
}
