//! Email service for lead notifications and confirmations.
//!
//! Uses `lettre` for SMTP transport.

use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{
        Attachment, Body, Mailbox, MultiPart, SinglePart,
        header::{ContentTransferEncoding, ContentType},
    },
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::debug;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP credentials are missing.
    #[error("Email credentials are not configured")]
    NotConfigured,
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    /// Filename announced in the `Content-Disposition` header.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
    /// Raw file bytes; encoded as base64 on the wire.
    pub data: Vec<u8>,
}

impl EmailAttachment {
    /// Creates an attachment, guessing the MIME type from the filename.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            filename,
            content_type,
            data,
        }
    }
}

/// What the admin is told about a new lead.
#[derive(Debug, Clone)]
pub struct LeadDetails {
    /// Visitor name, if given.
    pub name: Option<String>,
    /// Visitor email.
    pub email: String,
    /// Visitor phone, if given.
    pub phone: Option<String>,
    /// Sanitized resume filename, if a resume was uploaded.
    pub resume_filename: Option<String>,
    /// When the form was received.
    pub submitted_at: DateTime<Utc>,
}

/// What the notification inbox is told about a Drive upload.
#[derive(Debug, Clone)]
pub struct DriveUploadNotice {
    /// Visitor email.
    pub user_email: String,
    /// Name of the file as stored in Drive.
    pub file_name: String,
    /// Name the visitor uploaded.
    pub original_filename: String,
    /// Drive file id.
    pub file_id: String,
    /// Browser link to the file.
    pub web_view_link: Option<String>,
    /// Drive creation timestamp.
    pub created_time: Option<String>,
}

/// Email service for sending lead emails.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    scheduling_url: String,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub fn new(config: EmailConfig, scheduling_url: impl Into<String>) -> Self {
        Self {
            config,
            scheduling_url: scheduling_url.into(),
        }
    }

    /// Returns true when SMTP credentials are available.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Creates an SMTP transport.
    ///
    /// `starttls` upgrades a plain connection (port 587), `tls` connects with
    /// implicit TLS (port 465), `none` is for a local catcher only.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let host = self.config.smtp_host.as_str();
        let mut builder = match self.config.encryption.as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| EmailError::SendError(e.to_string()))?,
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| EmailError::SendError(e.to_string()))?,
        }
        .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_username, &self.config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(builder.build())
    }

    fn sender(&self) -> Result<Mailbox, EmailError> {
        let address = self
            .config
            .smtp_username
            .as_deref()
            .ok_or(EmailError::NotConfigured)?;
        format!("{} <{address}>", self.config.from_name)
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("{e}")))
    }

    fn recipient(to_email: &str) -> Result<Mailbox, EmailError> {
        to_email
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("{to_email}: {e}")))
    }

    /// Builds a message with a plain-text body and an optional attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid or the message cannot be built.
    pub fn build_message(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
        attachment: Option<&EmailAttachment>,
    ) -> Result<Message, EmailError> {
        let builder = Message::builder()
            .from(self.sender()?)
            .to(Self::recipient(to_email)?)
            .subject(subject);

        let Some(attachment) = attachment else {
            return builder
                .header(ContentType::TEXT_PLAIN)
                .body(body.to_string())
                .map_err(|e| EmailError::BuildError(e.to_string()));
        };

        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|e| EmailError::BuildError(e.to_string()))?;
        let encoded = Body::new_with_encoding(attachment.data.clone(), ContentTransferEncoding::Base64)
            .map_err(|_| EmailError::BuildError("attachment could not be encoded".to_string()))?;

        builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(
                        Attachment::new(attachment.filename.clone()).body(encoded, content_type),
                    ),
            )
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }

    /// Builds the admin notification for a new lead.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built.
    pub fn build_admin_notification(
        &self,
        lead: &LeadDetails,
        attachment: Option<&EmailAttachment>,
    ) -> Result<Message, EmailError> {
        let display_name = lead.name.as_deref().unwrap_or(&lead.email);
        let subject = format!("New ApplyBoost Lead: {display_name}");
        let body = format!(
            r"New lead submitted through the ApplyBoost website:

Name: {name}
Email: {email}
Phone: {phone}
Resume: {resume}
Submitted: {submitted}

Please follow up with this potential client.
Scheduling link: {scheduling_url}

ApplyBoost Studio System",
            name = lead.name.as_deref().unwrap_or("Not provided"),
            email = lead.email,
            phone = lead.phone.as_deref().unwrap_or("Not provided"),
            resume = lead.resume_filename.as_deref().unwrap_or("Not uploaded"),
            submitted = lead.submitted_at.format("%Y-%m-%d %H:%M:%S UTC"),
            scheduling_url = self.scheduling_url,
        );

        self.build_message(&self.config.admin_email, &subject, &body, attachment)
    }

    /// Builds the confirmation sent to the visitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the visitor address is invalid.
    pub fn build_user_confirmation(
        &self,
        to_email: &str,
        resume_filename: &str,
    ) -> Result<Message, EmailError> {
        let subject = "Consultation Request Received - ApplyBoost Studio";
        let body = format!(
            r"Thank you for your consultation request!

We have received your resume ({resume_filename}) and will be in touch shortly to schedule your consultation call.

Next Steps:
1. Our team will review your resume
2. We'll contact you within 24 hours to schedule your consultation
3. During the call, we'll discuss your job search goals and how we can help

You can also schedule your consultation directly here:
{scheduling_url}

If you have any questions, please don't hesitate to reach out.

Best regards,
The ApplyBoost Studio Team",
            scheduling_url = self.scheduling_url,
        );

        self.build_message(to_email, subject, &body, None)
    }

    /// Builds the Drive upload notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built.
    pub fn build_drive_notification(
        &self,
        upload: &DriveUploadNotice,
    ) -> Result<Message, EmailError> {
        let subject = "New Resume Uploaded to Google Drive";
        let body = format!(
            r"New resume has been uploaded to Google Drive!

User Email: {user_email}
File Name: {file_name}
Original Filename: {original}
Upload Time: {created}

View in Google Drive: {link}

File ID: {file_id}",
            user_email = upload.user_email,
            file_name = upload.file_name,
            original = upload.original_filename,
            created = upload.created_time.as_deref().unwrap_or("unknown"),
            link = upload.web_view_link.as_deref().unwrap_or("unavailable"),
            file_id = upload.file_id,
        );

        self.build_message(&self.config.notification_email, subject, &body, None)
    }

    /// Sends the admin notification for a new lead.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_admin_notification(
        &self,
        lead: &LeadDetails,
        attachment: Option<&EmailAttachment>,
    ) -> Result<(), EmailError> {
        self.ensure_configured()?;
        let message = self.build_admin_notification(lead, attachment)?;
        self.deliver(message).await
    }

    /// Sends the confirmation to the visitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_user_confirmation(
        &self,
        to_email: &str,
        resume_filename: &str,
    ) -> Result<(), EmailError> {
        self.ensure_configured()?;
        let message = self.build_user_confirmation(to_email, resume_filename)?;
        self.deliver(message).await
    }

    /// Sends the Drive upload notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_drive_notification(
        &self,
        upload: &DriveUploadNotice,
    ) -> Result<(), EmailError> {
        self.ensure_configured()?;
        let message = self.build_drive_notification(upload)?;
        self.deliver(message).await
    }

    /// Sends a generic plain-text email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        self.ensure_configured()?;
        let message = self.build_message(to_email, subject, body, None)?;
        self.deliver(message).await
    }

    /// Sends a plain-text email with one attached file.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email_with_attachment(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
        attachment: &EmailAttachment,
    ) -> Result<(), EmailError> {
        self.ensure_configured()?;
        let message = self.build_message(to_email, subject, body, Some(attachment))?;
        self.deliver(message).await
    }

    fn ensure_configured(&self) -> Result<(), EmailError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(EmailError::NotConfigured)
        }
    }

    async fn deliver(&self, message: Message) -> Result<(), EmailError> {
        let transport = self.create_transport()?;
        transport
            .send(message)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        debug!(smtp_host = %self.config.smtp_host, "Email delivered to relay");
        Ok(())
    }
}

#[cfg(test)]
#[path = "email_tests.rs"]
mod tests;
