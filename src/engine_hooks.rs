//! Hook surface consumed by the collaboration runtime
//!
//! The real-time engine is an external collaborator; it calls these hooks to
//! load and persist snapshots and to authenticate sessions. The engine also
//! owns the encoding of an empty document, which is injected at construction
//! so this layer never interprets snapshot bytes.

use crate::service::access::{resolve_access, AccessError, AccessLevel};
use crate::service::document_service::DocumentService;
use crate::store::StoreError;
use log::{debug, warn};
use std::sync::Arc;

/// Per-session connection configuration mutated by the authenticate hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionConfig {
    pub read_only: bool,
    pub is_authenticated: bool,
}

pub struct EngineHooks {
    documents: Arc<DocumentService>,
    empty_snapshot: Vec<u8>,
}

impl EngineHooks {
    /// `empty_snapshot` is the engine-supplied encoding of a well-formed
    /// empty document, returned whenever no snapshot is stored yet.
    pub fn new(documents: Arc<DocumentService>, empty_snapshot: Vec<u8>) -> Self {
        Self {
            documents,
            empty_snapshot,
        }
    }

    /// Fetch hook: the stored snapshot, or the synthesized empty structure
    /// when the document has none yet.
    pub fn fetch_snapshot(&self, document_id: &str) -> Result<Vec<u8>, StoreError> {
        debug!("Fetching snapshot for {}", document_id);
        let stored = self
            .documents
            .fetch_for_access_check(document_id)?
            .and_then(|projection| projection.data);
        match stored {
            Some(data) if !data.is_empty() => Ok(data),
            _ => Ok(self.empty_snapshot.clone()),
        }
    }

    /// Store hook: opaque snapshot replace. False when the document vanished.
    pub fn store_snapshot(&self, document_id: &str, state: &[u8]) -> Result<bool, StoreError> {
        debug!("Storing snapshot for {}", document_id);
        self.documents.update_snapshot(document_id, state)
    }

    /// Connect hook: refuse the session outright when the document does not
    /// exist.
    pub fn on_connect(&self, document_id: &str) -> Result<(), AccessError> {
        if self
            .documents
            .fetch_for_access_check(document_id)?
            .is_none()
        {
            return Err(AccessError::DocumentNotFound);
        }
        Ok(())
    }

    /// Authenticate hook: resolve the access level and write it into the
    /// session's connection configuration. No database mutation.
    pub fn on_authenticate(
        &self,
        document_id: &str,
        connection: &mut ConnectionConfig,
        secret: Option<&str>,
    ) -> Result<(), AccessError> {
        let level = resolve_access(&self.documents, document_id, secret)?;
        connection.read_only = level == AccessLevel::ReadOnly;
        connection.is_authenticated = true;
        Ok(())
    }

    /// After-load hook: best-effort last-access bump; a store hiccup here
    /// must never break the session.
    pub fn after_load(&self, document_id: &str) {
        debug!("Updating last accessed timestamp for {}", document_id);
        if let Err(e) = self.documents.touch_last_accessed(document_id) {
            warn!("Failed to update last access for {}: {}", document_id, e);
        }
    }
}
