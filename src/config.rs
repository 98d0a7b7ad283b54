//! Application Configuration
//!
//! Configuration is read from a YAML file with sensible defaults when the
//! file is absent, following the same shape for every subsystem: backend
//! selection plus backend-specific settings.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Relational store backend types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    Mock,
}

/// Blob store backend types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum BlobBackend {
    #[default]
    Local,
    Mock,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub blobs: BlobConfig,
    pub retention: RetentionConfig,
    pub identity: IdentityConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
}

/// Relational store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// Database file path
    pub db_path: String,
    /// Enable WAL mode
    pub wal_mode: bool,
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    pub backend: BlobBackend,
    /// Base path for blob files
    pub base_path: String,
}

/// Document retention / garbage collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Enable the background sweep
    pub enabled: bool,
    /// Seconds between sweeps
    pub sweep_interval_secs: u64,
    /// Documents not accessed for this many seconds are deleted
    pub max_age_secs: u64,
}

/// Identity cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Name of the cookie carrying the signed identity token
    pub cookie_name: String,
    /// HS256 signing secret; when unset every caller is anonymous
    pub jwt_secret: Option<String>,
}

impl IdentityConfig {
    /// The signing secret, with the `JWT_SECRET` environment variable taking
    /// precedence over the configured value.
    pub fn resolve_signing_secret(&self) -> Option<String> {
        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => Some(secret),
            _ => self.jwt_secret.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted image payload in bytes
    pub max_image_size_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Path to the log4rs configuration file
    pub config_file: String,
}

impl AppConfig {
    /// Load configuration from `config.yaml`, use defaults if not found
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from("config.yaml")
    }

    /// Load configuration from an explicit path, use defaults if not found
    pub fn load_from(config_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if Path::new(config_path).exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", config_path);
            Ok(config)
        } else {
            warn!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                workers: 4,
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Sqlite,
                db_path: "./data/documents.db".to_string(),
                wal_mode: true,
            },
            blobs: BlobConfig {
                backend: BlobBackend::Local,
                base_path: "./data/blobs".to_string(),
            },
            retention: RetentionConfig {
                enabled: true,
                sweep_interval_secs: 3600,       // hourly sweep
                max_age_secs: 30 * 24 * 60 * 60, // 30 days
            },
            identity: IdentityConfig {
                cookie_name: "person_id".to_string(),
                jwt_secret: None,
            },
            upload: UploadConfig {
                max_image_size_bytes: 1024 * 1024, // 1 MB
            },
            logging: LoggingConfig {
                config_file: "server_log.yaml".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = AppConfig::load_from("/nonexistent/config.yaml").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upload.max_image_size_bytes, 1024 * 1024);
        assert_eq!(config.identity.cookie_name, "person_id");
        assert!(config.retention.enabled);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "server:\n  host: 0.0.0.0\n  port: 8088\n  workers: 2\n\
             database:\n  backend: Mock\n  db_path: ./x.db\n  wal_mode: false\n\
             blobs:\n  backend: Mock\n  base_path: ./b\n\
             retention:\n  enabled: false\n  sweep_interval_secs: 60\n  max_age_secs: 120\n\
             identity:\n  cookie_name: person_id\n  jwt_secret: topsecret\n\
             upload:\n  max_image_size_bytes: 2048\n\
             logging:\n  config_file: server_log.yaml\n"
        )
        .unwrap();

        let config = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.database.backend, DatabaseBackend::Mock);
        assert_eq!(config.upload.max_image_size_bytes, 2048);
        assert!(!config.retention.enabled);
        assert_eq!(config.identity.jwt_secret.as_deref(), Some("topsecret"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_signing_secret() {
        let identity = IdentityConfig {
            cookie_name: "person_id".to_string(),
            jwt_secret: Some("from-config".to_string()),
        };
        env::remove_var("JWT_SECRET");
        assert_eq!(
            identity.resolve_signing_secret().as_deref(),
            Some("from-config")
        );

        env::set_var("JWT_SECRET", "from-env");
        assert_eq!(identity.resolve_signing_secret().as_deref(), Some("from-env"));
        env::remove_var("JWT_SECRET");
    }

    #[test]
    #[serial]
    fn test_missing_secret_resolves_to_none() {
        let identity = IdentityConfig {
            cookie_name: "person_id".to_string(),
            jwt_secret: None,
        };
        env::remove_var("JWT_SECRET");
        assert_eq!(identity.resolve_signing_secret(), None);
    }
}
