//! Intake domain types.

use applyboost_shared::LeadDetails;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Whether a form must carry a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    /// `/upload-resume` and `/schedule-consultation`.
    Required,
    /// The general lead form.
    Optional,
}

/// A file field as received from the client.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    /// Filename supplied by the browser.
    pub filename: String,
    /// File content.
    pub data: Bytes,
}

/// Raw form fields, before validation.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    /// Visitor name.
    pub name: Option<String>,
    /// Visitor email.
    pub email: Option<String>,
    /// Visitor phone.
    pub phone: Option<String>,
    /// Uploaded resume.
    pub resume: Option<ResumeUpload>,
}

/// A validated resume.
#[derive(Debug, Clone)]
pub struct Resume {
    /// Filename the visitor uploaded.
    pub original_filename: String,
    /// Filename safe to use on disk and in mail headers.
    pub filename: String,
    /// File content.
    pub data: Bytes,
}

/// A validated, request-scoped lead submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Correlation id for logs and the response.
    pub id: Uuid,
    /// Visitor name.
    pub name: Option<String>,
    /// Visitor email.
    pub email: String,
    /// Visitor phone.
    pub phone: Option<String>,
    /// Resume, when one was uploaded.
    pub resume: Option<Resume>,
    /// When the submission was accepted.
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Details for the admin notification email.
    #[must_use]
    pub fn lead_details(&self) -> LeadDetails {
        LeadDetails {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            resume_filename: self.resume.as_ref().map(|r| r.filename.clone()),
            submitted_at: self.submitted_at,
        }
    }
}
