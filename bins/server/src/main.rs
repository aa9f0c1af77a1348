//! ApplyBoost Server
//!
//! Main entry point for the ApplyBoost site and intake API.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use applyboost_api::{AppState, create_router};
use applyboost_core::drive::DriveClient;
use applyboost_core::storage::{StorageConfig, StorageProvider, StorageService};
use applyboost_core::submission::SubmissionService;
use applyboost_shared::{AppConfig, DriveConfig, EmailService};

/// Builds the Drive client when archiving is enabled and credentials exist.
fn drive_client(config: &DriveConfig) -> anyhow::Result<Option<Arc<DriveClient>>> {
    if !config.enabled {
        info!("Google Drive upload disabled");
        return Ok(None);
    }
    if !config.token_file.exists() && !config.credentials_file.exists() {
        warn!(
            credentials_file = %config.credentials_file.display(),
            token_file = %config.token_file.display(),
            "Google Drive enabled but no credentials found; uploads disabled"
        );
        return Ok(None);
    }
    if !config.token_file.exists() {
        warn!(
            token_file = %config.token_file.display(),
            "No Drive token yet; run drive-auth before uploads can succeed"
        );
    }

    let client = DriveClient::new(config.clone()).context("Failed to build Drive client")?;
    info!(
        folder_id = %config.folder_id,
        subfolder = config.subfolder.as_deref().unwrap_or("-"),
        "Google Drive upload enabled"
    );
    Ok(Some(Arc::new(client)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "applyboost=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Spool directory for resumes in flight
    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .with_context(|| format!("Failed to create {}", config.uploads.dir.display()))?;
    let spool_dir = tokio::fs::canonicalize(&config.uploads.dir).await?;
    let storage = StorageService::from_config(
        StorageConfig::new(StorageProvider::local_fs(&spool_dir))
            .with_max_file_size(u64::try_from(config.server.max_upload_bytes).unwrap_or(u64::MAX)),
    )?;
    info!(dir = %spool_dir.display(), "Spool storage ready");

    // Create email service
    let email_service = EmailService::new(config.email.clone(), config.site.scheduling_url.clone());
    if email_service.is_configured() {
        info!(
            smtp_host = %config.email.smtp_host,
            smtp_port = %config.email.smtp_port,
            "Email service configured"
        );
    } else {
        warn!("SMTP credentials not set; emails will be skipped (set SENDER_EMAIL and SENDER_PASSWORD)");
    }

    let drive = drive_client(&config.drive)?;

    // Create application state
    let state = AppState {
        submissions: Arc::new(SubmissionService::new(
            Arc::new(storage),
            Arc::new(email_service),
            drive,
        )),
        site: Arc::new(config.site.clone()),
    };

    // Create router
    let app = create_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
