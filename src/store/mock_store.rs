//! Mock implementation of the DocumentStorage trait for testing

use crate::store::{Document, DocumentId, DocumentProjection, DocumentStorage, Image, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory implementation of DocumentStorage
pub struct MockDocumentStore {
    documents: Mutex<HashMap<String, Document>>,
    images: Mutex<HashMap<String, Image>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored documents (test helper)
    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Number of stored image records (test helper)
    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap().len()
    }

    /// Clear all data from the store (useful for test cleanup)
    pub fn clear(&self) {
        self.documents.lock().unwrap().clear();
        self.images.lock().unwrap().clear();
    }
}

impl Default for MockDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStorage for MockDocumentStore {
    fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().unwrap();
        if documents.contains_key(&document.id) {
            return Err(StoreError::Unavailable(format!(
                "document already exists: {}",
                document.id
            )));
        }
        documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    fn fetch_projection(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentProjection>, StoreError> {
        let documents = self.documents.lock().unwrap();
        Ok(documents.get(document_id).map(|document| DocumentProjection {
            id: document.id.clone(),
            data: document.data.clone(),
            modification_secret: document.modification_secret.clone(),
        }))
    }

    fn touch_last_accessed(
        &self,
        document_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut documents = self.documents.lock().unwrap();
        match documents.get_mut(document_id) {
            Some(document) => {
                document.last_accessed_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn update_snapshot(
        &self,
        document_id: &str,
        data: &[u8],
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut documents = self.documents.lock().unwrap();
        match documents.get_mut(document_id) {
            Some(document) => {
                document.data = Some(data.to_vec());
                document.updated_at = at;
                document.last_accessed_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_document(&self, document_id: &str) -> Result<bool, StoreError> {
        let mut documents = self.documents.lock().unwrap();
        Ok(documents.remove(document_id).is_some())
    }

    fn documents_by_owner(&self, owner_external_id: &str) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.lock().unwrap();
        let mut matching: Vec<Document> = documents
            .values()
            .filter(|document| {
                document.owner_external_id.as_deref() == Some(owner_external_id)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    fn stale_document_ids(&self, cutoff: DateTime<Utc>) -> Result<Vec<DocumentId>, StoreError> {
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .values()
            .filter(|document| document.last_accessed_at < cutoff)
            .map(|document| document.id.clone())
            .collect())
    }

    fn insert_image(&self, image: &Image) -> Result<(), StoreError> {
        let mut images = self.images.lock().unwrap();
        if images.contains_key(&image.id) {
            return Err(StoreError::Unavailable(format!(
                "image already exists: {}",
                image.id
            )));
        }
        images.insert(image.id.clone(), image.clone());
        Ok(())
    }

    fn fetch_image(&self, image_id: &str) -> Result<Option<Image>, StoreError> {
        let images = self.images.lock().unwrap();
        Ok(images.get(image_id).cloned())
    }

    fn delete_image(&self, image_id: &str) -> Result<Option<Image>, StoreError> {
        let mut images = self.images.lock().unwrap();
        Ok(images.remove(image_id))
    }

    fn images_for_document(&self, document_id: &str) -> Result<Vec<Image>, StoreError> {
        let images = self.images.lock().unwrap();
        Ok(images
            .values()
            .filter(|image| image.document_id == document_id)
            .cloned()
            .collect())
    }
}
