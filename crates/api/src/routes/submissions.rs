//! Resume upload and lead form routes.

use applyboost_core::intake::{ResumePolicy, ResumeUpload, SubmissionForm, validate_submission};
use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    routing::post,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const RESUME_RECEIVED: &str =
    "Resume uploaded successfully! Redirecting you to schedule your consultation.";
const FORM_RECEIVED: &str = "Form submitted successfully! We'll be in touch soon.";

/// Creates submission routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload-resume", post(upload_resume))
        .route("/schedule-consultation", post(schedule_consultation))
        .route("/api/submit-form", post(submit_form))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    /// Always `true`.
    pub success: bool,
    /// Message shown to the visitor.
    pub message: &'static str,
    /// Booking page the visitor is sent to next.
    pub redirect_url: String,
    /// Correlation id for support requests.
    pub submission_id: Uuid,
    /// Admin notification delivered.
    pub email_sent: bool,
    /// Visitor confirmation delivered.
    pub confirmation_sent: bool,
    /// Resume archived to Drive.
    pub drive_uploaded: bool,
    /// Drive link to the archived resume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_link: Option<String>,
}

/// Collects the multipart fields we know about.
async fn read_form(mut multipart: Multipart) -> Result<SubmissionForm, ApiError> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                form.resume = Some(ResumeUpload { filename, data });
            }
            "email" => form.email = Some(field.text().await?),
            "name" => form.name = Some(field.text().await?),
            "phone" => form.phone = Some(field.text().await?),
            _ => debug!(field = %name, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn accept(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    policy: ResumePolicy,
    message: &'static str,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let form = read_form(multipart?).await?;
    let submission = validate_submission(form, policy)?;
    let outcome = state.submissions.process(&submission).await?;

    info!(
        submission_id = %outcome.submission_id,
        email_sent = outcome.email_sent,
        confirmation_sent = outcome.confirmation_sent,
        drive_uploaded = outcome.drive_uploaded(),
        "Submission processed"
    );

    Ok(Json(SubmissionResponse {
        success: true,
        message,
        redirect_url: state.site.scheduling_url.clone(),
        submission_id: outcome.submission_id,
        email_sent: outcome.email_sent,
        confirmation_sent: outcome.confirmation_sent,
        drive_uploaded: outcome.drive_uploaded(),
        drive_link: outcome.drive_link().map(str::to_string),
    }))
}

/// POST `/upload-resume`
async fn upload_resume(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    accept(&state, multipart, ResumePolicy::Required, RESUME_RECEIVED).await
}

/// POST `/schedule-consultation`
async fn schedule_consultation(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    accept(&state, multipart, ResumePolicy::Required, RESUME_RECEIVED).await
}

/// POST `/api/submit-form`
///
/// The general lead form: the resume is optional.
async fn submit_form(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    accept(&state, multipart, ResumePolicy::Optional, FORM_RECEIVED).await
}
