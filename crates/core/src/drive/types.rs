//! Drive domain types.

use serde::{Deserialize, Serialize};

use super::error::DriveError;

/// A file or folder as returned by the Drive API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file id.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Browser link.
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_time: Option<String>,
}

/// `files.list` response page.
#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Metadata sent when creating a file or folder.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Outcome of archiving one resume, reported back to the visitor and the
/// notification email.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadResult {
    /// Whether the file reached Drive.
    pub success: bool,
    /// Drive file id.
    pub file_id: Option<String>,
    /// Name the file was stored under.
    pub file_name: Option<String>,
    /// Browser link.
    pub web_view_link: Option<String>,
    /// Drive creation time.
    pub created_time: Option<String>,
    /// Why the upload failed.
    pub error: Option<String>,
}

impl UploadResult {
    /// A successful upload.
    #[must_use]
    pub fn uploaded(file: DriveFile) -> Self {
        Self {
            success: true,
            file_id: Some(file.id),
            file_name: Some(file.name),
            web_view_link: file.web_view_link,
            created_time: file.created_time,
            error: None,
        }
    }

    /// A failed upload.
    #[must_use]
    pub fn failed(err: &DriveError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            ..Self::default()
        }
    }
}
