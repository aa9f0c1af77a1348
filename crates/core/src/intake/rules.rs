//! File acceptance and form validation.

use chrono::Utc;
use uuid::Uuid;

use super::error::IntakeError;
use super::types::{Resume, ResumePolicy, Submission, SubmissionForm};

/// Resume extensions we accept, lower-case.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// The allow-listed extension of `filename`, lower-cased.
///
/// The extension is whatever follows the last `.`, compared
/// case-insensitively.
#[must_use]
pub fn allowed_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    ALLOWED_EXTENSIONS
        .iter()
        .find(|allowed| ext.eq_ignore_ascii_case(allowed))
        .copied()
}

/// Returns true if `filename` has an allowed extension.
///
/// Names without a dot or ending in a dot are rejected.
#[must_use]
pub fn allowed_file(filename: &str) -> bool {
    allowed_extension(filename).is_some()
}

/// Makes a client-supplied filename safe for the spool directory and for
/// mail headers.
///
/// Keeps only the final path component, turns whitespace into `_`, drops
/// anything that is not ASCII alphanumeric, `.`, `-` or `_`, and trims
/// leading and trailing dots and underscores. May return an empty string.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_matches(['.', '_']).to_string()
}

/// Spool and upload name for a resume whose extension already passed.
///
/// Names that lose their stem to sanitizing, such as `Иванов.pdf`, become
/// `resume.{ext}`.
fn resume_filename(original: &str, ext: &str) -> String {
    let sanitized = sanitize_filename(original);
    if allowed_file(&sanitized) {
        sanitized
    } else {
        format!("resume.{ext}")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates raw form fields into a [`Submission`].
///
/// Checks run in order: email present, email shaped like an address,
/// resume present and non-empty (when required, or when one was sent),
/// extension allowed.
///
/// # Errors
///
/// Returns the first [`IntakeError`] encountered.
pub fn validate_submission(
    form: SubmissionForm,
    policy: ResumePolicy,
) -> Result<Submission, IntakeError> {
    let email = non_blank(form.email).ok_or(IntakeError::MissingEmail)?;
    if !looks_like_email(&email) {
        return Err(IntakeError::InvalidEmail);
    }

    // An empty file part is what browsers send when nothing was chosen.
    let upload = form
        .resume
        .filter(|r| !r.filename.trim().is_empty() || !r.data.is_empty());

    let resume = match (upload, policy) {
        (None, ResumePolicy::Required) => return Err(IntakeError::MissingFile),
        (None, ResumePolicy::Optional) => None,
        (Some(upload), _) => {
            if upload.filename.trim().is_empty() || upload.data.is_empty() {
                return Err(IntakeError::MissingFile);
            }
            let ext = allowed_extension(&upload.filename).ok_or(IntakeError::InvalidFileType)?;
            let filename = resume_filename(&upload.filename, ext);
            Some(Resume {
                original_filename: upload.filename,
                filename,
                data: upload.data,
            })
        }
    };

    Ok(Submission {
        id: Uuid::now_v7(),
        name: non_blank(form.name),
        email,
        phone: non_blank(form.phone),
        resume,
        submitted_at: Utc::now(),
    })
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
