//! Spool storage for uploaded resumes, using Apache OpenDAL.
//!
//! A resume lives here only while its submission is processed: it is
//! written when the form is accepted, read back for the admin email and the
//! Drive upload, then deleted.
//!
//! Providers:
//! - Local filesystem (the `uploads/` directory)
//! - In-memory (tests)

mod config;
mod error;
mod service;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::StorageService;
