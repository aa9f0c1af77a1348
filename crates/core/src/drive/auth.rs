//! OAuth client secrets, stored tokens, and the installed-app flow.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::DriveError;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Largest callback request we read from the browser.
const MAX_CALLBACK_BYTES: usize = 8 * 1024;

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth client registration, as downloaded from the Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Consent endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses a `credentials.json` document (`installed` or `web` layout).
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a client secrets file.
    pub fn from_json(json: &str) -> Result<Self, DriveError> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| DriveError::InvalidCredentials(e.to_string()))?;
        file.installed.or(file.web).ok_or_else(|| {
            DriveError::InvalidCredentials("expected an \"installed\" or \"web\" client".into())
        })
    }

    /// Loads client secrets from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid.
    pub async fn load(path: &Path) -> Result<Self, DriveError> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DriveError::CredentialsMissing(path.to_path_buf()));
            }
            Err(e) => return Err(DriveError::InvalidCredentials(e.to_string())),
        };
        Self::from_json(&json)
    }
}

/// An authorized user token, persisted as `token.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token.
    pub token: String,
    /// Refresh token, when offline access was granted.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token endpoint used for refreshes.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When the access token expires.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the access token can be used at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty()
            && self
                .expiry
                .is_none_or(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now)
    }

    /// Whether the access token can be used now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether a refresh is possible.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Loads the token file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Option<Self>, DriveError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| DriveError::TokenFile(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DriveError::TokenFile(format!("{}: {e}", path.display()))),
        }
    }

    /// Writes the token file, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), DriveError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| DriveError::TokenFile(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| DriveError::TokenFile(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| DriveError::TokenFile(format!("{}: {e}", path.display())))
    }

    /// Applies a token endpoint response, keeping the refresh token when the
    /// endpoint does not send a new one.
    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = response.access_token;
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
        self.expiry = response
            .expires_in
            .map(|secs| now + Duration::seconds(secs));
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

async fn token_request(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, DriveError> {
    let response = http.post(token_uri).form(form).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DriveError::Api {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| DriveError::UnexpectedResponse(e.to_string()))
}

/// Exchanges the refresh token for a new access token.
///
/// # Errors
///
/// Returns an error if there is no refresh token or the endpoint refuses.
pub(crate) async fn refresh_token(
    http: &reqwest::Client,
    token: &StoredToken,
) -> Result<StoredToken, DriveError> {
    let refresh = token
        .refresh_token
        .as_deref()
        .ok_or(DriveError::NotAuthorized)?;

    debug!(token_uri = %token.token_uri, "Refreshing Drive access token");
    let response = token_request(
        http,
        &token.token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", &token.client_id),
            ("client_secret", &token.client_secret),
        ],
    )
    .await?;

    let mut refreshed = token.clone();
    refreshed.apply(response, Utc::now());
    Ok(refreshed)
}

async fn exchange_code(
    http: &reqwest::Client,
    secrets: &ClientSecrets,
    scopes: &[String],
    code: &str,
    redirect_uri: &str,
) -> Result<StoredToken, DriveError> {
    let response = token_request(
        http,
        &secrets.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &secrets.client_id),
            ("client_secret", &secrets.client_secret),
        ],
    )
    .await?;

    let mut token = StoredToken {
        token: String::new(),
        refresh_token: None,
        token_uri: secrets.token_uri.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        scopes: scopes.to_vec(),
        expiry: None,
    };
    token.apply(response, Utc::now());
    Ok(token)
}

/// Builds the consent URL for the installed-app flow.
///
/// Requests offline access so the result carries a refresh token.
///
/// # Errors
///
/// Returns an error if the client's `auth_uri` is not a URL.
pub fn authorization_url(
    secrets: &ClientSecrets,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
) -> Result<Url, DriveError> {
    let scope = scopes.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| DriveError::InvalidCredentials(format!("auth_uri: {e}")))
}

/// Query parameters of the loopback redirect.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Parses the request line of the browser's redirect, e.g.
/// `GET /?state=..&code=.. HTTP/1.1`.
pub(crate) fn parse_callback(request: &str) -> Option<Callback> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse(&format!("http://127.0.0.1{target}")).ok()?;

    let mut callback = Callback::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => callback.code = Some(value.into_owned()),
            "state" => callback.state = Some(value.into_owned()),
            "error" => callback.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(callback)
}

const CALLBACK_PAGE: &str = "<!DOCTYPE html><html><body>\
<p>Authorization complete. You can close this window.</p></body></html>";

/// Serves redirect requests on `listener` until one carries a code or an
/// error, and returns the authorization code.
pub(crate) async fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String, DriveError> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| DriveError::AuthorizationFailed(e.to_string()))?;

        let mut buf = vec![0u8; MAX_CALLBACK_BYTES];
        let mut len = 0;
        while len < buf.len() {
            let n = stream
                .read(&mut buf[len..])
                .await
                .map_err(|e| DriveError::AuthorizationFailed(e.to_string()))?;
            if n == 0 {
                break;
            }
            len += n;
            if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let request = String::from_utf8_lossy(&buf[..len]);

        let callback = parse_callback(&request).unwrap_or_default();
        let done = callback.code.is_some() || callback.error.is_some();
        let (status, body) = if done {
            ("200 OK", CALLBACK_PAGE)
        } else {
            ("404 Not Found", "")
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            warn!(%peer, error = %e, "Failed to answer OAuth callback");
        }
        let _ = stream.shutdown().await;

        if !done {
            debug!(%peer, "Ignoring unrelated request on OAuth callback port");
            continue;
        }
        if let Some(error) = callback.error {
            return Err(DriveError::AuthorizationFailed(error));
        }
        if callback.state.as_deref() != Some(state) {
            return Err(DriveError::AuthorizationFailed("state mismatch".into()));
        }
        return callback
            .code
            .ok_or_else(|| DriveError::AuthorizationFailed("missing code".into()));
    }
}

/// Runs the installed-app consent flow on a loopback redirect and returns
/// the new token. The caller persists it.
///
/// The consent URL is logged and opened in the default browser.
///
/// # Errors
///
/// Returns an error if consent is refused or the code exchange fails.
pub async fn authorize_interactive(
    http: &reqwest::Client,
    secrets: &ClientSecrets,
    scopes: &[String],
) -> Result<StoredToken, DriveError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|e| DriveError::AuthorizationFailed(e.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|e| DriveError::AuthorizationFailed(e.to_string()))?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{port}/");
    let state = Uuid::new_v4().simple().to_string();

    let url = authorization_url(secrets, scopes, &redirect_uri, &state)?;
    info!(url = %url, "Open this URL to authorize Google Drive access");
    if let Err(e) = open::that_detached(url.as_str()) {
        warn!(error = %e, "Could not open a browser; visit the URL manually");
    }

    let code = wait_for_code(&listener, &state).await?;
    exchange_code(http, secrets, scopes, &code, &redirect_uri).await
}
