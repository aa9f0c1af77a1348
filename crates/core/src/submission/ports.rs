//! Outbound dependencies of the pipeline.

use applyboost_shared::{DriveUploadNotice, EmailAttachment, EmailError, EmailService, LeadDetails};
use bytes::Bytes;

use crate::drive::{DriveClient, DriveError, DriveFile};

/// Sends the emails a submission triggers.
///
/// Implemented by [`EmailService`]; tests substitute a recorder.
pub trait Notifier: Send + Sync {
    /// Tell the admin about a new lead.
    fn notify_admin(
        &self,
        lead: &LeadDetails,
        attachment: Option<&EmailAttachment>,
    ) -> impl std::future::Future<Output = Result<(), EmailError>> + Send;

    /// Confirm receipt to the visitor.
    fn confirm_visitor(
        &self,
        to_email: &str,
        resume_filename: &str,
    ) -> impl std::future::Future<Output = Result<(), EmailError>> + Send;

    /// Report a Drive upload to the notification inbox.
    fn notify_drive_upload(
        &self,
        notice: &DriveUploadNotice,
    ) -> impl std::future::Future<Output = Result<(), EmailError>> + Send;
}

/// Archives resumes.
///
/// Implemented by [`DriveClient`].
pub trait ResumeUploader: Send + Sync {
    /// Upload one resume on behalf of `email`.
    fn upload_resume(
        &self,
        data: Bytes,
        filename: &str,
        email: &str,
    ) -> impl std::future::Future<Output = Result<DriveFile, DriveError>> + Send;
}

impl Notifier for EmailService {
    async fn notify_admin(
        &self,
        lead: &LeadDetails,
        attachment: Option<&EmailAttachment>,
    ) -> Result<(), EmailError> {
        self.send_admin_notification(lead, attachment).await
    }

    async fn confirm_visitor(&self, to_email: &str, resume_filename: &str) -> Result<(), EmailError> {
        self.send_user_confirmation(to_email, resume_filename).await
    }

    async fn notify_drive_upload(&self, notice: &DriveUploadNotice) -> Result<(), EmailError> {
        self.send_drive_notification(notice).await
    }
}

impl ResumeUploader for DriveClient {
    async fn upload_resume(
        &self,
        data: Bytes,
        filename: &str,
        email: &str,
    ) -> Result<DriveFile, DriveError> {
        self.upload_file(data, filename, email).await
    }
}
