//! Submission service implementation.

use std::sync::Arc;

use applyboost_shared::{DriveUploadNotice, EmailAttachment, EmailError, LeadDetails};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::error::SubmissionError;
use super::ports::{Notifier, ResumeUploader};
use crate::drive::{DriveError, UploadResult};
use crate::intake::{Resume, Submission};
use crate::storage::StorageService;

/// What happened to a processed submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    /// Correlation id of the submission.
    pub submission_id: Uuid,
    /// Admin notification delivered.
    pub email_sent: bool,
    /// Visitor confirmation delivered.
    pub confirmation_sent: bool,
    /// Drive upload result; `None` when Drive is not configured or there
    /// was no resume.
    pub drive: Option<UploadResult>,
    /// Drive upload notification delivered.
    pub drive_notification_sent: bool,
}

impl SubmissionOutcome {
    fn new(submission_id: Uuid) -> Self {
        Self {
            submission_id,
            email_sent: false,
            confirmation_sent: false,
            drive: None,
            drive_notification_sent: false,
        }
    }

    /// Whether the resume reached Drive.
    #[must_use]
    pub fn drive_uploaded(&self) -> bool {
        self.drive.as_ref().is_some_and(|d| d.success)
    }

    /// Browser link to the archived resume.
    #[must_use]
    pub fn drive_link(&self) -> Option<&str> {
        self.drive.as_ref()?.web_view_link.as_deref()
    }
}

/// Processes accepted submissions.
pub struct SubmissionService<N: Notifier, U: ResumeUploader> {
    storage: Arc<StorageService>,
    notifier: Arc<N>,
    uploader: Option<Arc<U>>,
}

impl<N: Notifier, U: ResumeUploader> SubmissionService<N, U> {
    /// Create a new submission service. Without an uploader, resumes are
    /// only emailed.
    #[must_use]
    pub fn new(storage: Arc<StorageService>, notifier: Arc<N>, uploader: Option<Arc<U>>) -> Self {
        Self {
            storage,
            notifier,
            uploader,
        }
    }

    /// The spool this service writes to.
    #[must_use]
    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    /// Whether resumes are archived to Drive.
    #[must_use]
    pub fn archives_to_drive(&self) -> bool {
        self.uploader.is_some()
    }

    /// Run the pipeline for one submission.
    ///
    /// The spooled resume is deleted once every consumer has finished,
    /// whatever their outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only if the resume cannot be spooled or read back.
    #[instrument(skip(self, submission), fields(submission_id = %submission.id))]
    pub async fn process(
        &self,
        submission: &Submission,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        info!(
            email = %submission.email,
            name = submission.name.as_deref().unwrap_or("-"),
            phone = submission.phone.as_deref().unwrap_or("-"),
            resume = submission.resume.as_ref().map_or("-", |r| r.filename.as_str()),
            "Processing submission"
        );

        let lead = submission.lead_details();
        let Some(resume) = submission.resume.as_ref() else {
            let mut outcome = SubmissionOutcome::new(submission.id);
            outcome.email_sent =
                delivered("admin notification", self.notifier.notify_admin(&lead, None).await);
            return Ok(outcome);
        };

        let key = StorageService::spool_key(submission.id, &resume.filename, submission.submitted_at);
        self.storage.write(&key, resume.data.clone()).await?;
        debug!(
            key = %key,
            path = ?self.storage.local_path(&key),
            size = resume.data.len(),
            "Resume spooled"
        );

        let outcome = self.dispatch(submission, &lead, resume, &key).await;

        if let Err(e) = self.storage.delete(&key).await {
            warn!(key = %key, error = %e, "Failed to remove spooled resume");
        }
        outcome
    }

    async fn dispatch(
        &self,
        submission: &Submission,
        lead: &LeadDetails,
        resume: &Resume,
        key: &str,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let data = self.storage.read(key).await?;
        let attachment = EmailAttachment::new(resume.filename.clone(), data.to_vec());

        let (admin, confirmation, drive) = tokio::join!(
            self.notifier.notify_admin(lead, Some(&attachment)),
            self.notifier
                .confirm_visitor(&submission.email, &resume.filename),
            self.archive(submission, resume, data.clone()),
        );

        let mut outcome = SubmissionOutcome::new(submission.id);
        outcome.email_sent = delivered("admin notification", admin);
        outcome.confirmation_sent = delivered("visitor confirmation", confirmation);
        if let Some((result, notified)) = drive {
            outcome.drive = Some(result);
            outcome.drive_notification_sent = notified;
        }
        Ok(outcome)
    }

    /// Upload to Drive, then tell the notification inbox.
    async fn archive(
        &self,
        submission: &Submission,
        resume: &Resume,
        data: Bytes,
    ) -> Option<(UploadResult, bool)> {
        let uploader = self.uploader.as_ref()?;

        match uploader
            .upload_resume(data, &resume.filename, &submission.email)
            .await
        {
            Ok(file) => {
                let notice = DriveUploadNotice {
                    user_email: submission.email.clone(),
                    file_name: file.name.clone(),
                    original_filename: resume.original_filename.clone(),
                    file_id: file.id.clone(),
                    web_view_link: file.web_view_link.clone(),
                    created_time: file.created_time.clone(),
                };
                let notified = delivered(
                    "drive notification",
                    self.notifier.notify_drive_upload(&notice).await,
                );
                Some((UploadResult::uploaded(file), notified))
            }
            Err(e) => {
                if matches!(e, DriveError::NotAuthorized) {
                    warn!(error = %e, "Drive upload skipped");
                } else {
                    error!(error = %e, "Drive upload failed");
                }
                Some((UploadResult::failed(&e), false))
            }
        }
    }
}

/// Collapses an email result to a flag, logging the failure.
fn delivered(kind: &'static str, result: Result<(), EmailError>) -> bool {
    match result {
        Ok(()) => {
            info!(kind, "Email sent");
            true
        }
        Err(EmailError::NotConfigured) => {
            warn!(kind, "Email not configured; skipping");
            false
        }
        Err(e) => {
            error!(kind, error = %e, "Email failed");
            false
        }
    }
}
