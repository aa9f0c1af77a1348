//! Tests for the Drive client, against a local fake of the Google endpoints.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use applyboost_shared::DriveConfig;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::auth::{parse_callback, wait_for_code};
use super::*;

// ============================================================================
// Fake Google
// ============================================================================

#[derive(Default)]
struct Fake {
    base: String,
    folders: Vec<(String, String)>,
    token_requests: Vec<HashMap<String, String>>,
    queries: Vec<String>,
    created: Vec<Value>,
    upload_inits: Vec<(Option<String>, Value)>,
    content_ranges: Vec<String>,
    received: Vec<u8>,
    first_put_limit: Option<usize>,
    defer_final: bool,
    auth_headers: Vec<String>,
}

type Shared = Arc<StdMutex<Fake>>;

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn token(State(fake): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    fake.lock().unwrap().token_requests.push(form);
    Json(json!({
        "access_token": "fresh-token",
        "expires_in": 3600,
        "scope": "https://www.googleapis.com/auth/drive.file",
        "token_type": "Bearer"
    }))
}

async fn list(
    State(fake): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let auth = bearer(&headers);
    let mut fake = fake.lock().unwrap();
    fake.auth_headers.push(auth.clone());
    if auth == "Bearer revoked" {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let q = params.get("q").cloned().unwrap_or_default();
    fake.queries.push(q.clone());

    let files: Vec<Value> = if q.starts_with("name=") {
        fake.folders
            .iter()
            .filter(|(name, _)| q.contains(&format!("name='{name}'")))
            .map(|(name, id)| json!({ "id": id, "name": name }))
            .collect()
    } else {
        vec![json!({
            "id": "file-1",
            "name": "20260102_030405_ada@example.com_cv.pdf",
            "createdTime": "2026-01-02T03:04:05.000Z",
            "webViewLink": "https://drive.google.com/file/d/file-1/view"
        })]
    };
    Json(json!({ "files": files })).into_response()
}

async fn create(State(fake): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut fake = fake.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    fake.folders.push((name.clone(), "folder-created".to_string()));
    fake.created.push(body);
    Json(json!({ "id": "folder-created", "name": name }))
}

async fn start_upload(
    State(fake): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = fake.lock().unwrap();
    fake.auth_headers.push(bearer(&headers));
    let length = headers
        .get("x-upload-content-length")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    fake.upload_inits.push((length, body));
    let location = format!("{}/session/abc", fake.base);
    (StatusCode::OK, [(header::LOCATION, location)]).into_response()
}

async fn put_chunk(State(fake): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    let mut fake = fake.lock().unwrap();
    let range = headers
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    fake.content_ranges.push(range.clone());

    let Some((span, total)) = range.strip_prefix("bytes ").and_then(|r| r.split_once('/')) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let total: usize = total.parse().unwrap();

    if span == "*" {
        if !body.is_empty() {
            return StatusCode::BAD_REQUEST.into_response();
        }
    } else {
        let (start, end) = span.split_once('-').unwrap();
        let start: usize = start.parse().unwrap();
        let end: usize = end.parse().unwrap();
        if start != fake.received.len() || end < start || end - start + 1 != body.len() {
            return StatusCode::BAD_REQUEST.into_response();
        }

        let accept = fake.first_put_limit.take().map_or(body.len(), |l| l.min(body.len()));
        fake.received.extend_from_slice(&body[..accept]);

        // Acknowledge every byte but hold the file back until asked again.
        if fake.received.len() == total && std::mem::take(&mut fake.defer_final) {
            return (
                StatusCode::PERMANENT_REDIRECT,
                [(header::RANGE, format!("bytes=0-{}", total - 1))],
            )
                .into_response();
        }
    }

    if fake.received.len() < total {
        let last = fake.received.len() - 1;
        return (
            StatusCode::PERMANENT_REDIRECT,
            [(header::RANGE, format!("bytes=0-{last}"))],
        )
            .into_response();
    }
    Json(json!({
        "id": "file-1",
        "name": "stored.pdf",
        "webViewLink": "https://drive.google.com/file/d/file-1/view",
        "createdTime": "2026-01-02T03:04:05.000Z"
    }))
    .into_response()
}

async fn spawn_fake(fake: Fake) -> (String, Shared) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let state = Arc::new(StdMutex::new(Fake {
        base: base.clone(),
        ..fake
    }));

    let app = Router::new()
        .route("/token", post(token))
        .route("/drive/v3/files", get(list).post(create))
        .route("/upload/drive/v3/files", post(start_upload))
        .route("/session/abc", put(put_chunk))
        .with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (base, state)
}

fn drive_config(base: &str, dir: &TempDir) -> DriveConfig {
    DriveConfig {
        enabled: true,
        credentials_file: dir.path().join("credentials.json"),
        token_file: dir.path().join("token.json"),
        folder_id: "parent123".to_string(),
        api_base: format!("{base}/drive/v3"),
        upload_base: format!("{base}/upload/drive/v3"),
        request_timeout_secs: 5,
        ..DriveConfig::default()
    }
}

fn token_for(base: &str, access: &str, expiry: chrono::DateTime<Utc>) -> StoredToken {
    StoredToken {
        token: access.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        token_uri: format!("{base}/token"),
        client_id: "client.apps.googleusercontent.com".to_string(),
        client_secret: "s3cret".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
        expiry: Some(expiry),
    }
}

async fn authorized_client(base: &str, dir: &TempDir) -> DriveClient {
    token_for(base, "valid-token", Utc::now() + Duration::hours(1))
        .save(&dir.path().join("token.json"))
        .await
        .expect("save token");
    DriveClient::new(drive_config(base, dir)).expect("client")
}

// ============================================================================
// Tokens and credentials
// ============================================================================

#[rstest]
#[case(Some(3600), true)]
#[case(Some(61), true)]
#[case(Some(59), false)]
#[case(Some(0), false)]
#[case(Some(-3600), false)]
#[case(None, true)]
fn test_token_validity(#[case] expires_in: Option<i64>, #[case] valid: bool) {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let mut token = token_for("http://x", "access", now);
    token.expiry = expires_in.map(|secs| now + Duration::seconds(secs));
    assert_eq!(token.is_valid_at(now), valid);
}

#[test]
fn test_empty_token_is_never_valid() {
    let now = Utc::now();
    let token = token_for("http://x", "", now + Duration::hours(1));
    assert!(!token.is_valid_at(now));
}

#[test]
fn test_can_refresh() {
    let mut token = token_for("http://x", "access", Utc::now());
    assert!(token.can_refresh());
    token.refresh_token = Some(String::new());
    assert!(!token.can_refresh());
    token.refresh_token = None;
    assert!(!token.can_refresh());
}

#[test]
fn test_token_file_layout() {
    let json = r#"{
        "token": "ya29.a0",
        "refresh_token": "1//0g",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "id.apps.googleusercontent.com",
        "client_secret": "secret",
        "scopes": ["https://www.googleapis.com/auth/drive.file"],
        "expiry": "2026-01-02T03:04:05.123456Z"
    }"#;
    let token: StoredToken = serde_json::from_str(json).expect("parse");
    assert_eq!(token.token, "ya29.a0");
    assert_eq!(token.refresh_token.as_deref(), Some("1//0g"));
    assert_eq!(
        token.expiry,
        Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap() + Duration::microseconds(123_456))
    );
}

#[tokio::test]
async fn test_token_save_and_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("token.json");
    assert!(StoredToken::load(&path).await.expect("load").is_none());

    let token = token_for("http://x", "access", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    token.save(&path).await.expect("save");
    assert_eq!(StoredToken::load(&path).await.expect("load"), Some(token));
    assert!(!dir.path().join("token.json.tmp").exists());
}

#[tokio::test]
async fn test_corrupt_token_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("token.json");
    tokio::fs::write(&path, b"not json").await.expect("write");
    assert!(matches!(
        StoredToken::load(&path).await.unwrap_err(),
        DriveError::TokenFile(_)
    ));
}

#[rstest]
#[case("installed")]
#[case("web")]
fn test_client_secrets_layouts(#[case] layout: &str) {
    let json = format!(
        r#"{{"{layout}": {{
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "redirect_uris": ["http://localhost"]
        }}}}"#
    );
    let secrets = ClientSecrets::from_json(&json).expect("parse");
    assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
    assert_eq!(secrets.auth_uri, "https://accounts.google.com/o/oauth2/auth");
    assert_eq!(secrets.token_uri, "https://oauth2.googleapis.com/token");
}

#[test]
fn test_client_secrets_rejects_other_documents() {
    assert!(matches!(
        ClientSecrets::from_json(r#"{"type": "service_account"}"#).unwrap_err(),
        DriveError::InvalidCredentials(_)
    ));
    assert!(matches!(
        ClientSecrets::from_json("[]").unwrap_err(),
        DriveError::InvalidCredentials(_)
    ));
}

#[tokio::test]
async fn test_missing_credentials_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("credentials.json");
    match ClientSecrets::load(&path).await.unwrap_err() {
        DriveError::CredentialsMissing(missing) => assert_eq!(missing, path),
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Consent flow
// ============================================================================

#[test]
fn test_authorization_url() {
    let secrets = ClientSecrets::from_json(
        r#"{"installed": {"client_id": "abc", "client_secret": "xyz"}}"#,
    )
    .expect("parse");
    let scopes = vec![
        "https://www.googleapis.com/auth/drive.file".to_string(),
        "openid".to_string(),
    ];
    let url = authorization_url(&secrets, &scopes, "http://127.0.0.1:8765/", "st4te")
        .expect("url");

    assert_eq!(url.host_str(), Some("accounts.google.com"));
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "abc");
    assert_eq!(params["redirect_uri"], "http://127.0.0.1:8765/");
    assert_eq!(
        params["scope"],
        "https://www.googleapis.com/auth/drive.file openid"
    );
    assert_eq!(params["access_type"], "offline");
    assert_eq!(params["prompt"], "consent");
    assert_eq!(params["state"], "st4te");
}

#[test]
fn test_parse_callback() {
    let callback = parse_callback(
        "GET /?state=abc&code=4%2F0Ad&scope=drive HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n",
    )
    .expect("callback");
    assert_eq!(callback.code.as_deref(), Some("4/0Ad"));
    assert_eq!(callback.state.as_deref(), Some("abc"));
    assert_eq!(callback.error, None);

    let denied = parse_callback("GET /?error=access_denied&state=abc HTTP/1.1\r\n").expect("callback");
    assert_eq!(denied.error.as_deref(), Some("access_denied"));

    assert!(parse_callback("POST / HTTP/1.1\r\n").is_none());
    assert!(parse_callback("").is_none());
}

async fn browser_get(port: u16, target: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    stream
        .write_all(format!("GET {target} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n").as_bytes())
        .await
        .expect("write");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read");
    response
}

#[tokio::test]
async fn test_wait_for_code_ignores_unrelated_requests() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    let browser = tokio::spawn(async move {
        let favicon = browser_get(port, "/favicon.ico").await;
        let callback = browser_get(port, "/?state=st4te&code=the-code").await;
        (favicon, callback)
    });

    let code = wait_for_code(&listener, "st4te").await.expect("code");
    assert_eq!(code, "the-code");

    let (favicon, callback) = browser.await.expect("browser");
    assert!(favicon.starts_with("HTTP/1.1 404"));
    assert!(callback.starts_with("HTTP/1.1 200"));
    assert!(callback.contains("Authorization complete"));
}

#[tokio::test]
async fn test_wait_for_code_rejects_state_mismatch() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move { browser_get(port, "/?state=forged&code=c").await });

    assert!(matches!(
        wait_for_code(&listener, "st4te").await.unwrap_err(),
        DriveError::AuthorizationFailed(_)
    ));
}

#[tokio::test]
async fn test_wait_for_code_reports_denied_consent() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move { browser_get(port, "/?error=access_denied&state=st4te").await });

    match wait_for_code(&listener, "st4te").await.unwrap_err() {
        DriveError::AuthorizationFailed(reason) => assert_eq!(reason, "access_denied"),
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Client
// ============================================================================

#[rstest]
#[case("Resumes", "Resumes")]
#[case("Ada's CVs", "Ada\\'s CVs")]
#[case("back\\slash", "back\\\\slash")]
#[case("it\\'s", "it\\\\\\'s")]
fn test_escape_query_literal(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(escape_query_literal(input), expected);
}

#[tokio::test]
async fn test_authenticate_without_token_is_not_authorized() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = DriveClient::new(drive_config("http://127.0.0.1:9", &dir)).expect("client");
    assert!(matches!(
        client.authenticate().await.unwrap_err(),
        DriveError::NotAuthorized
    ));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let (base, fake) = spawn_fake(Fake::default()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let token_file = dir.path().join("token.json");
    token_for(&base, "stale-token", Utc::now() - Duration::minutes(5))
        .save(&token_file)
        .await
        .expect("save");

    let client = DriveClient::new(drive_config(&base, &dir)).expect("client");
    client.authenticate().await.expect("authenticate");

    {
        let fake = fake.lock().unwrap();
        assert_eq!(fake.token_requests.len(), 1);
        let request = &fake.token_requests[0];
        assert_eq!(request["grant_type"], "refresh_token");
        assert_eq!(request["refresh_token"], "refresh-1");
        assert_eq!(request["client_id"], "client.apps.googleusercontent.com");
    }

    let persisted = StoredToken::load(&token_file).await.expect("load").expect("token");
    assert_eq!(persisted.token, "fresh-token");
    assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
    assert!(persisted.is_valid());

    // A valid session does not refresh again.
    client.authenticate().await.expect("authenticate");
    assert_eq!(fake.lock().unwrap().token_requests.len(), 1);
}

#[tokio::test]
async fn test_revoked_token_is_refreshed_and_retried() {
    let (base, fake) = spawn_fake(Fake::default()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    token_for(&base, "revoked", Utc::now() + Duration::hours(1))
        .save(&dir.path().join("token.json"))
        .await
        .expect("save");

    let client = DriveClient::new(drive_config(&base, &dir)).expect("client");
    let files = client.list_files(None).await.expect("list");
    assert_eq!(files.len(), 1);

    let fake = fake.lock().unwrap();
    assert_eq!(fake.auth_headers, ["Bearer revoked", "Bearer fresh-token"]);
    assert_eq!(fake.token_requests.len(), 1);
}

#[tokio::test]
async fn test_list_files_queries_folder() {
    let (base, fake) = spawn_fake(Fake::default()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let client = authorized_client(&base, &dir).await;

    let files = client.list_files(None).await.expect("list");
    assert_eq!(files[0].id, "file-1");
    assert_eq!(
        files[0].web_view_link.as_deref(),
        Some("https://drive.google.com/file/d/file-1/view")
    );

    client.list_files(Some("other'folder")).await.expect("list");
    let fake = fake.lock().unwrap();
    assert_eq!(
        fake.queries,
        [
            "'parent123' in parents and trashed=false",
            "'other\\'folder' in parents and trashed=false",
        ]
    );
    assert_eq!(fake.auth_headers[0], "Bearer valid-token");
}

#[tokio::test]
async fn test_find_existing_folder() {
    let (base, fake) = spawn_fake(Fake {
        folders: vec![("Resumes".to_string(), "folder-existing".to_string())],
        ..Fake::default()
    })
    .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let client = authorized_client(&base, &dir).await;

    let id = client.find_or_create_folder("Resumes").await.expect("folder");
    assert_eq!(id, "folder-existing");

    let fake = fake.lock().unwrap();
    assert!(fake.created.is_empty());
    assert_eq!(
        fake.queries[0],
        "name='Resumes' and mimeType='application/vnd.google-apps.folder' \
         and trashed=false and 'parent123' in parents"
    );
}

#[tokio::test]
async fn test_create_missing_folder() {
    let (base, fake) = spawn_fake(Fake::default()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let client = authorized_client(&base, &dir).await;

    let id = client.find_or_create_folder("Resumes").await.expect("folder");
    assert_eq!(id, "folder-created");

    let fake = fake.lock().unwrap();
    assert_eq!(
        fake.created,
        [json!({
            "name": "Resumes",
            "parents": ["parent123"],
            "mimeType": "application/vnd.google-apps.folder"
        })]
    );
}

#[tokio::test]
async fn test_resumable_upload_continues_after_partial_chunk() {
    let (base, fake) = spawn_fake(Fake {
        first_put_limit: Some(100_000),
        ..Fake::default()
    })
    .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let client = authorized_client(&base, &dir).await.chunk_size(1);

    let data: Vec<u8> = (0..614_400u32).map(|i| (i % 251) as u8).collect();
    let file = client
        .upload_file(Bytes::from(data.clone()), "cv.pdf", "ada@example.com")
        .await
        .expect("upload");

    assert_eq!(file.id, "file-1");
    assert_eq!(
        file.web_view_link.as_deref(),
        Some("https://drive.google.com/file/d/file-1/view")
    );

    let fake = fake.lock().unwrap();
    assert_eq!(
        fake.content_ranges,
        [
            "bytes 0-262143/614400",
            "bytes 100000-362143/614400",
            "bytes 362144-614399/614400",
        ]
    );
    assert_eq!(fake.received, data);

    let (length, metadata) = &fake.upload_inits[0];
    assert_eq!(length.as_deref(), Some("614400"));
    assert_eq!(metadata["parents"], json!(["parent123"]));
    assert_eq!(metadata["mimeType"], "application/pdf");
    let name = metadata["name"].as_str().expect("name");
    assert!(name.ends_with("_ada@example.com_cv.pdf"), "{name}");
    assert_eq!(name.len(), "20260102_030405_ada@example.com_cv.pdf".len());
    assert!(
        metadata["description"]
            .as_str()
            .expect("description")
            .starts_with("Resume submission from ada@example.com at ")
    );
}

#[tokio::test]
async fn test_fully_acknowledged_upload_queries_status() {
    let (base, fake) = spawn_fake(Fake {
        defer_final: true,
        ..Fake::default()
    })
    .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let client = authorized_client(&base, &dir).await;

    let file = client
        .upload_file(Bytes::from_static(b"%PDF-1.4 short resume"), "cv.pdf", "ada@example.com")
        .await
        .expect("upload");

    assert_eq!(file.id, "file-1");
    let fake = fake.lock().unwrap();
    assert_eq!(fake.content_ranges, ["bytes 0-20/21", "bytes */21"]);
    assert_eq!(fake.received, b"%PDF-1.4 short resume");
}

#[tokio::test]
async fn test_upload_into_subfolder() {
    let (base, fake) = spawn_fake(Fake::default()).await;
    let dir = tempfile::tempdir().expect("tempdir");
    token_for(&base, "valid-token", Utc::now() + Duration::hours(1))
        .save(&dir.path().join("token.json"))
        .await
        .expect("save");
    let config = DriveConfig {
        subfolder: Some("Resumes".to_string()),
        ..drive_config(&base, &dir)
    };
    let client = DriveClient::new(config).expect("client");

    client
        .upload_file(Bytes::from_static(b"%PDF-1.4"), "cv.pdf", "ada@example.com")
        .await
        .expect("upload");

    let fake = fake.lock().unwrap();
    assert_eq!(fake.created.len(), 1);
    assert_eq!(fake.upload_inits[0].1["parents"], json!(["folder-created"]));
    assert_eq!(fake.content_ranges, ["bytes 0-7/8"]);
}

#[test]
fn test_upload_result_from_error() {
    let result = UploadResult::failed(&DriveError::NotAuthorized);
    assert!(!result.success);
    assert!(result.file_id.is_none());
    assert_eq!(
        result.error.as_deref(),
        Some("not authorized; run drive-auth to create a token")
    );
}
