//! Intake error types.

use thiserror::Error;

/// Reasons a form submission is rejected before any work is done.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    /// The email field is absent or blank.
    #[error("Email is required")]
    MissingEmail,

    /// The email field does not look like an address.
    #[error("Please provide a valid email address")]
    InvalidEmail,

    /// The resume field is absent, has no filename, or is empty.
    #[error("No resume file provided")]
    MissingFile,

    /// The resume extension is not on the allow-list.
    #[error("Invalid file type. Please upload PDF, DOC, or DOCX files only.")]
    InvalidFileType,
}

impl IntakeError {
    /// Machine-readable code used in API error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingEmail => "MISSING_EMAIL",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::MissingFile => "MISSING_FILE",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
        }
    }
}
