//! Shared configuration, errors, and email delivery for ApplyBoost.
//!
//! This crate provides the pieces used across all other crates:
//! - Application-wide error types
//! - Configuration management
//! - SMTP email service

pub mod config;
pub mod email;
pub mod error;

pub use config::{AppConfig, DriveConfig, EmailConfig, ServerConfig, SiteConfig, UploadsConfig};
pub use email::{DriveUploadNotice, EmailAttachment, EmailError, EmailService, LeadDetails};
pub use error::{AppError, AppResult};
