//! Storage configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// Local filesystem directory.
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// Process memory (tests only).
    Memory,
}

impl StorageProvider {
    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }
}
