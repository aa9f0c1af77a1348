//! Intake rules for the lead form.
//!
//! Everything here is pure: deciding whether an uploaded file is acceptable,
//! cleaning its name, and turning raw form fields into a [`Submission`].

mod error;
mod rules;
mod types;


pub use error::IntakeError;
pub use rules::{
    ALLOWED_EXTENSIONS, allowed_extension, allowed_file, sanitize_filename, validate_submission,
};
pub use types::{Resume, ResumePolicy, ResumeUpload, Submission, SubmissionForm};
