//! Background garbage collection of abandoned documents
//!
//! A periodic task that deletes documents whose last access is older than the
//! retention threshold, images and blobs included. A live session can touch a
//! document between selection and deletion; that staleness window is bounded
//! by one sweep interval and is accepted rather than locked away.

use crate::config::RetentionConfig;
use crate::service::document_service::DocumentService;
use crate::store::{DocumentStorage, StoreError};
use chrono::{Duration, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::time;

pub struct GcWorker {
    documents: Arc<DocumentService>,
    store: Arc<dyn DocumentStorage>,
    max_age: Duration,
    sweep_interval: std::time::Duration,
}

impl GcWorker {
    pub fn new(
        documents: Arc<DocumentService>,
        store: Arc<dyn DocumentStorage>,
        config: &RetentionConfig,
    ) -> Self {
        Self {
            documents,
            store,
            max_age: Duration::seconds(config.max_age_secs as i64),
            sweep_interval: std::time::Duration::from_secs(config.sweep_interval_secs),
        }
    }

    /// Start the retention sweep as a background task (non-blocking)
    pub fn start_background(self) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting retention worker with {}s interval, max age {}s",
            self.sweep_interval.as_secs(),
            self.max_age.num_seconds()
        );
        tokio::spawn(async move {
            let mut interval = time::interval(self.sweep_interval);
            loop {
                interval.tick().await;
                match self.sweep() {
                    Ok(0) => {}
                    Ok(removed) => info!("Retention sweep removed {} documents", removed),
                    Err(e) => error!("Error during retention sweep: {}", e),
                }
            }
        })
    }

    /// One scan-and-delete cycle. The selection snapshot is taken once; each
    /// document's deletion is independent and a failure never stops the batch.
    pub fn sweep(&self) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - self.max_age;
        let stale = self.store.stale_document_ids(cutoff)?;
        if stale.is_empty() {
            return Ok(0);
        }
        info!("Retention sweep selected {} stale documents", stale.len());

        let mut removed = 0;
        for document_id in stale {
            match self.documents.delete_by_id(&document_id) {
                Ok(true) => removed += 1,
                Ok(false) => debug!("Stale document {} already gone", document_id),
                Err(e) => {
                    // isolate per-document failures, continue with the rest
                    error!("Failed to delete stale document {}: {}", document_id, e);
                }
            }
        }
        Ok(removed)
    }
}
