//! Google Drive client for archiving resumes.
//!
//! Talks to the Drive v3 REST API with `reqwest`. Authorization uses the
//! installed-app OAuth flow: client secrets come from `credentials.json`,
//! the authorized user token is kept in `token.json` and refreshed when it
//! expires.
//!
//! ```text
//! unauthenticated ──load token.json──► valid? ──yes──► authenticated
//!                                        │ no
//!                          refresh_token? ──yes──► refresh, persist
//!                                        │ no
//!                            interactive? ──yes──► loopback consent, persist
//!                                        │ no
//!                                   NotAuthorized
//! ```

mod auth;
mod client;
mod error;
mod types;

#[cfg(test)]
mod tests;

pub use auth::{ClientSecrets, StoredToken, authorization_url, authorize_interactive};
pub use client::{DriveClient, escape_query_literal};
pub use error::DriveError;
pub use types::{DriveFile, UploadResult};
