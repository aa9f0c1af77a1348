//! Drive v3 REST client.

use std::time::Duration;

use applyboost_shared::DriveConfig;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::auth::{self, ClientSecrets, StoredToken};
use super::error::DriveError;
use super::types::{DriveFile, FileList, FileMetadata};

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const FILE_FIELDS: &str = "id,name,webViewLink,createdTime";
const LIST_FIELDS: &str = "files(id,name,createdTime,webViewLink)";

/// Drive requires chunks in multiples of 256 KiB.
const CHUNK_ALIGNMENT: usize = 256 * 1024;
const DEFAULT_CHUNK_SIZE: usize = 32 * CHUNK_ALIGNMENT;

/// Consecutive 308 answers without progress before the upload is abandoned.
const MAX_STALLED_CHUNKS: u32 = 3;

/// Escapes a value for use inside a single-quoted Drive query literal.
#[must_use]
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive client holding one authorized session.
///
/// Token load, refresh and persistence happen under a single lock, so
/// concurrent submissions never race on `token.json`.
pub struct DriveClient {
    http: reqwest::Client,
    config: DriveConfig,
    session: Mutex<Option<StoredToken>>,
    upload_folder: Mutex<Option<String>>,
    interactive: bool,
    chunk_size: usize,
}

impl DriveClient {
    /// Creates a client for the configured Drive account.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: DriveConfig) -> Result<Self, DriveError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| DriveError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session: Mutex::new(None),
            upload_folder: Mutex::new(None),
            interactive: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Allows the browser consent flow when no usable token exists.
    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Sets the resumable upload chunk size, rounded up to 256 KiB.
    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1).div_ceil(CHUNK_ALIGNMENT) * CHUNK_ALIGNMENT;
        self
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Ensures a usable access token, refreshing or authorizing as needed.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::NotAuthorized`] when there is no token to use
    /// or refresh and the client is not interactive.
    pub async fn authenticate(&self) -> Result<(), DriveError> {
        self.access_token().await.map(|_| ())
    }

    async fn access_token(&self) -> Result<String, DriveError> {
        let mut session = self.session.lock().await;

        if session.is_none() {
            *session = StoredToken::load(&self.config.token_file).await?;
        }

        if let Some(token) = session.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.token.clone());
        }

        let token = match session.take() {
            Some(stale) if stale.can_refresh() => {
                let refreshed = auth::refresh_token(&self.http, &stale).await?;
                info!("Refreshed Drive access token");
                refreshed
            }
            _ if self.interactive => {
                let secrets = ClientSecrets::load(&self.config.credentials_file).await?;
                auth::authorize_interactive(&self.http, &secrets, &self.config.scopes).await?
            }
            _ => return Err(DriveError::NotAuthorized),
        };

        token.save(&self.config.token_file).await?;
        debug!(path = %self.config.token_file.display(), "Persisted Drive token");

        let access = token.token.clone();
        *session = Some(token);
        Ok(access)
    }

    /// Forces the next call to refresh the token.
    async fn invalidate(&self) {
        if let Some(token) = self.session.lock().await.as_mut() {
            token.expiry = Some(Utc::now());
        }
    }

    /// Sends an authorized request, retrying once with a fresh token on 401.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, DriveError> {
        let token = self.access_token().await?;
        let response = build().bearer_auth(token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Drive rejected the access token; refreshing");
        self.invalidate().await;
        let token = self.access_token().await?;
        Ok(build().bearer_auth(token).send().await?)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, DriveError> {
        let response = ensure_success(self.send(build).await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DriveError::UnexpectedResponse(e.to_string()))
    }

    /// Lists files in `folder_id`, or in the configured folder when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_files(&self, folder_id: Option<&str>) -> Result<Vec<DriveFile>, DriveError> {
        let folder = folder_id.unwrap_or(&self.config.folder_id);
        let query = if folder.is_empty() {
            "trashed=false".to_string()
        } else {
            format!("'{}' in parents and trashed=false", escape_query_literal(folder))
        };

        let url = format!("{}/files", self.config.api_base);
        let list: FileList = self
            .send_json(|| {
                self.http.get(&url).query(&[
                    ("q", query.as_str()),
                    ("fields", LIST_FIELDS),
                    ("orderBy", "createdTime desc"),
                    ("pageSize", "100"),
                ])
            })
            .await?;
        Ok(list.files)
    }

    /// Returns the id of folder `name` under the configured parent, creating
    /// it when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or creation fails.
    #[instrument(skip(self))]
    pub async fn find_or_create_folder(&self, name: &str) -> Result<String, DriveError> {
        let mut query = format!(
            "name='{}' and mimeType='{FOLDER_MIME_TYPE}' and trashed=false",
            escape_query_literal(name)
        );
        if !self.config.folder_id.is_empty() {
            query.push_str(&format!(
                " and '{}' in parents",
                escape_query_literal(&self.config.folder_id)
            ));
        }

        let url = format!("{}/files", self.config.api_base);
        let list: FileList = self
            .send_json(|| {
                self.http
                    .get(&url)
                    .query(&[("q", query.as_str()), ("fields", LIST_FIELDS)])
            })
            .await?;
        if let Some(existing) = list.files.into_iter().next() {
            debug!(folder_id = %existing.id, "Found Drive folder");
            return Ok(existing.id);
        }

        let metadata = FileMetadata {
            name: name.to_string(),
            parents: self.parents_of_configured_folder(),
            description: None,
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        };
        let created: DriveFile = self
            .send_json(|| {
                self.http
                    .post(&url)
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&metadata)
            })
            .await?;
        info!(folder_id = %created.id, "Created Drive folder");
        Ok(created.id)
    }

    fn parents_of_configured_folder(&self) -> Vec<String> {
        if self.config.folder_id.is_empty() {
            Vec::new()
        } else {
            vec![self.config.folder_id.clone()]
        }
    }

    /// Folder uploads go to: the configured subfolder, else the configured
    /// folder, else the Drive root.
    async fn upload_parents(&self) -> Result<Vec<String>, DriveError> {
        let Some(subfolder) = self.config.subfolder.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(self.parents_of_configured_folder());
        };

        let mut cached = self.upload_folder.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(vec![id.clone()]);
        }
        let id = self.find_or_create_folder(subfolder).await?;
        *cached = Some(id.clone());
        Ok(vec![id])
    }

    /// Uploads a resume with the resumable protocol.
    ///
    /// The stored name is `{YYYYmmdd_HHMMSS}_{email}_{filename}`.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization, session creation or any chunk
    /// fails.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload_file(
        &self,
        data: Bytes,
        filename: &str,
        email: &str,
    ) -> Result<DriveFile, DriveError> {
        let now = Utc::now();
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let metadata = FileMetadata {
            name: format!("{}_{email}_{filename}", now.format("%Y%m%d_%H%M%S")),
            parents: self.upload_parents().await?,
            description: Some(format!(
                "Resume submission from {email} at {}",
                now.to_rfc3339()
            )),
            mime_type: Some(content_type.clone()),
        };

        let session_uri = self.start_resumable(&metadata, &content_type, data.len()).await?;
        let file = self.upload_chunks(&session_uri, data).await?;
        info!(file_id = %file.id, name = %file.name, "Uploaded resume to Drive");
        Ok(file)
    }

    async fn start_resumable(
        &self,
        metadata: &FileMetadata,
        content_type: &str,
        len: usize,
    ) -> Result<String, DriveError> {
        let url = format!("{}/files", self.config.upload_base);
        let response = self
            .send(|| {
                self.http
                    .post(&url)
                    .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
                    .header("X-Upload-Content-Type", content_type)
                    .header("X-Upload-Content-Length", len)
                    .json(metadata)
            })
            .await?;
        let response = ensure_success(response).await?;

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| DriveError::UnexpectedResponse("resumable session without Location".into()))
    }

    async fn upload_chunks(&self, session_uri: &str, data: Bytes) -> Result<DriveFile, DriveError> {
        let total = data.len();
        let mut offset = 0usize;
        let mut stalled = 0u32;

        loop {
            let end = (offset + self.chunk_size).min(total);
            // Nothing left to send: ask for the session status instead.
            let content_range = if offset == total {
                format!("bytes */{total}")
            } else {
                format!("bytes {offset}-{}/{total}", end - 1)
            };

            // Session URIs carry their own authorization.
            let response = self
                .http
                .put(session_uri)
                .header(header::CONTENT_RANGE, content_range)
                .body(data.slice(offset..end))
                .send()
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    return response
                        .json::<DriveFile>()
                        .await
                        .map_err(|e| DriveError::UnexpectedResponse(e.to_string()));
                }
                StatusCode::PERMANENT_REDIRECT => {
                    let next = committed_offset(&response);
                    debug!(offset = next, total, "Drive acknowledged chunk");
                    if next <= offset {
                        stalled += 1;
                        if stalled >= MAX_STALLED_CHUNKS {
                            return Err(DriveError::UnexpectedResponse(format!(
                                "upload stalled at byte {offset} of {total}"
                            )));
                        }
                    } else {
                        stalled = 0;
                    }
                    if next > total {
                        return Err(DriveError::UnexpectedResponse(format!(
                            "server acknowledged {next} of {total} bytes"
                        )));
                    }
                    offset = next;
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(DriveError::Api {
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        }
    }
}

/// Next byte to send after a 308: one past the end of the `Range` header,
/// or zero when nothing has been committed.
fn committed_offset(response: &Response) -> usize {
    response
        .headers()
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(_, end)| end.trim().parse::<usize>().ok())
        .map_or(0, |end| end + 1)
}

async fn ensure_success(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::Api {
        status: status.as_u16(),
        body,
    })
}
