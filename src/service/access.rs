//! Access resolution for collaboration sessions
//!
//! Derives the effective access level for an incoming session from the
//! client-presented modification secret. A wrong or absent secret downgrades
//! the session to read-only; a document that does not exist at all refuses
//! the session entirely.

use crate::service::document_service::DocumentService;
use crate::store::StoreError;
use thiserror::Error;

/// Clients send this sentinel instead of a secret to request an explicitly
/// read-only session.
pub const READ_ONLY_SECRET: &str = "readOnly";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Error)]
pub enum AccessError {
    /// The referenced document does not exist; session establishment must be
    /// aborted, distinct from the soft read-only downgrade.
    #[error("Document not found!")]
    DocumentNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolve the access level for a session on `document_id`.
///
/// An absent secret or the read-only sentinel resolves without touching the
/// store. Otherwise the secret is checked against the stored one; a missing
/// document is the single hard failure here.
pub fn resolve_access(
    documents: &DocumentService,
    document_id: &str,
    secret: Option<&str>,
) -> Result<AccessLevel, AccessError> {
    let supplied = match secret {
        None => return Ok(AccessLevel::ReadOnly),
        Some(s) if s.is_empty() || s == READ_ONLY_SECRET => return Ok(AccessLevel::ReadOnly),
        Some(s) => s,
    };
    let projection = documents
        .fetch_for_access_check(document_id)?
        .ok_or(AccessError::DocumentNotFound)?;
    if projection.modification_secret == supplied {
        Ok(AccessLevel::ReadWrite)
    } else {
        Ok(AccessLevel::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::mock_store::MockBlobStore;
    use crate::store::mock_store::MockDocumentStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn document_service() -> DocumentService {
        DocumentService::new(
            Arc::new(MockDocumentStore::new()),
            Arc::new(MockBlobStore::new()),
        )
    }

    #[test]
    fn test_absent_secret_is_read_only() {
        let documents = document_service();
        let document = documents.create(None).unwrap();
        assert_eq!(
            resolve_access(&documents, &document.id, None).unwrap(),
            AccessLevel::ReadOnly
        );
        assert_eq!(
            resolve_access(&documents, &document.id, Some("")).unwrap(),
            AccessLevel::ReadOnly
        );
    }

    #[test]
    fn test_sentinel_is_read_only_without_store_lookup() {
        let documents = document_service();
        // no document exists, yet the sentinel still resolves softly
        assert_eq!(
            resolve_access(&documents, &Uuid::new_v4().to_string(), Some(READ_ONLY_SECRET))
                .unwrap(),
            AccessLevel::ReadOnly
        );
    }

    #[test]
    fn test_wrong_secret_is_read_only() {
        let documents = document_service();
        let document = documents.create(None).unwrap();
        assert_eq!(
            resolve_access(&documents, &document.id, Some("invalid")).unwrap(),
            AccessLevel::ReadOnly
        );
    }

    #[test]
    fn test_matching_secret_is_read_write() {
        let documents = document_service();
        let document = documents.create(None).unwrap();
        assert_eq!(
            resolve_access(&documents, &document.id, Some(&document.modification_secret))
                .unwrap(),
            AccessLevel::ReadWrite
        );
    }

    #[test]
    fn test_missing_document_aborts_session() {
        let documents = document_service();
        let result = resolve_access(
            &documents,
            &Uuid::new_v4().to_string(),
            Some(&Uuid::new_v4().to_string()),
        );
        assert!(matches!(result, Err(AccessError::DocumentNotFound)));
    }
}
