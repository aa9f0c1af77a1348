//! Storage service implementation using Apache OpenDAL.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use opendal::{Operator, services};
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use crate::intake::sanitize_filename;

/// Spool storage for resumes awaiting processing.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish()
                .pipe(Ok),
        }
    }

    /// Validate an upload against the size limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is larger than allowed.
    pub fn validate_size(&self, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }
        Ok(())
    }

    /// Generate the spool key for a submission's resume.
    ///
    /// Format: `{YYYYmmdd_HHMMSS}_{submission_id}_{sanitized_filename}`
    #[must_use]
    pub fn spool_key(submission_id: Uuid, filename: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}_{}_{}",
            at.format("%Y%m%d_%H%M%S"),
            submission_id,
            sanitize_filename(filename)
        )
    }

    /// Write a file to the spool.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is too large or the write fails.
    pub async fn write(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.validate_size(data.len() as u64)?;
        self.operator
            .write(key, data)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Read a spooled file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    pub async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self.operator.read(key).await.map_err(StorageError::from)?;
        Ok(buffer.to_bytes())
    }

    /// Delete a spooled file.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Check if a file exists in the spool.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.stat(key).await.is_ok()
    }

    /// On-disk location of a spooled file, for filesystem providers.
    #[must_use]
    pub fn local_path(&self, key: &str) -> Option<PathBuf> {
        match &self.config.provider {
            StorageProvider::LocalFs { root } => Some(root.join(key)),
            StorageProvider::Memory => None,
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
