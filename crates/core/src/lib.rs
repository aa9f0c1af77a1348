//! Core business logic for ApplyBoost.
//!
//! This crate contains the lead intake pipeline with ZERO web dependencies.
//! The HTTP layer hands it parsed form fields; everything after that lives
//! here.
//!
//! # Modules
//!
//! - `intake` - File acceptance, filename sanitizing, form validation
//! - `storage` - Spool directory for resumes in flight
//! - `drive` - Google Drive client and OAuth token handling
//! - `submission` - Notification and archive pipeline

pub mod drive;
pub mod intake;
pub mod storage;
pub mod submission;
