//! Lead submission pipeline.
//!
//! Turns a validated [`Submission`](crate::intake::Submission) into
//! notifications and a Drive archive copy:
//! - spool the resume
//! - admin notification (resume attached), visitor confirmation and Drive
//!   upload, concurrently
//! - remove the spooled file
//!
//! Email and Drive failures are reported in the outcome, never as errors.

mod error;
mod ports;
mod service;


pub use error::SubmissionError;
pub use ports::{Notifier, ResumeUploader};
pub use service::{SubmissionOutcome, SubmissionService};
