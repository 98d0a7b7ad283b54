//! Application State Management
//!
//! Backend selection and dependency wiring: the relational and blob store
//! implementations are chosen from configuration and injected into the
//! services, so handlers and tests only ever see the service layer.

use std::sync::Arc;

use log::info;

use crate::blob::{local_store::LocalBlobStore, mock_store::MockBlobStore, BlobStorage};
use crate::config::{AppConfig, BlobBackend, DatabaseBackend};
use crate::service::document_service::DocumentService;
use crate::service::identity::IdentityExtractor;
use crate::service::image_service::ImageService;
use crate::store::{
    mock_store::MockDocumentStore, sqlite_store::SqliteDocumentStore, DocumentStorage,
};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStorage>,
    pub blobs: Arc<dyn BlobStorage>,
    pub documents: Arc<DocumentService>,
    pub images: Arc<ImageService>,
    pub identity: Arc<IdentityExtractor>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state with services configured from the YAML config
    pub fn new() -> Self {
        let config = AppConfig::load().expect("Failed to load configuration");
        Self::from_config(config)
    }

    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn DocumentStorage> = match config.database.backend {
            DatabaseBackend::Sqlite => {
                info!(
                    "Using SQLite document store with db_path: {}, wal_mode: {}",
                    config.database.db_path, config.database.wal_mode
                );
                Arc::new(
                    SqliteDocumentStore::new(&config.database)
                        .expect("Failed to open the document database"),
                )
            }
            DatabaseBackend::Mock => {
                info!("Using mock document store");
                Arc::new(MockDocumentStore::new())
            }
        };

        let blobs: Arc<dyn BlobStorage> = match config.blobs.backend {
            BlobBackend::Local => {
                info!(
                    "Using local blob store with base_path: {}",
                    config.blobs.base_path
                );
                Arc::new(LocalBlobStore::new(&config.blobs).expect("Failed to open the blob store"))
            }
            BlobBackend::Mock => {
                info!("Using mock blob store");
                Arc::new(MockBlobStore::new())
            }
        };

        let documents = Arc::new(DocumentService::new(store.clone(), blobs.clone()));
        let images = Arc::new(ImageService::new(store.clone()));
        let identity = Arc::new(IdentityExtractor::new(
            &config.identity.cookie_name,
            config.identity.resolve_signing_secret().as_deref(),
        ));

        info!("Application state initialized");
        Self {
            store,
            blobs,
            documents,
            images,
            identity,
            config,
        }
    }

    /// Application state for testing: mock backends, default configuration
    pub fn new_for_testing() -> Self {
        let mut config = AppConfig::default();
        config.database.backend = DatabaseBackend::Mock;
        config.blobs.backend = BlobBackend::Mock;
        Self::from_config(config)
    }
}
