//! Submission pipeline errors.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that fail a submission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The resume could not be spooled.
    #[error("failed to spool resume: {0}")]
    Storage(#[from] StorageError),
}
