//! Google Drive authorization for ApplyBoost.
//!
//! Runs the browser consent flow once, writes `token.json`, and checks
//! access by listing the upload folder. The server refreshes the token
//! from then on.
//!
//! Usage: cargo run --bin drive-auth

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use applyboost_core::drive::DriveClient;
use applyboost_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "applyboost=info,drive_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let drive = config.drive;

    println!("Authorizing Google Drive access...");
    println!("  credentials: {}", drive.credentials_file.display());
    println!("  token:       {}", drive.token_file.display());

    let client = DriveClient::new(drive.clone())?.interactive(true);
    client
        .authenticate()
        .await
        .context("Google Drive authorization failed")?;
    info!(token_file = %drive.token_file.display(), "Drive token saved");

    let folder = match drive.subfolder.as_deref().filter(|s| !s.is_empty()) {
        Some(name) => Some(client.find_or_create_folder(name).await?),
        None => None,
    };

    let files = client.list_files(folder.as_deref()).await?;
    println!(
        "Access verified: {} file(s) in folder {}",
        files.len(),
        folder.as_deref().unwrap_or(if drive.folder_id.is_empty() {
            "<root>"
        } else {
            &drive.folder_id
        })
    );
    for file in files.iter().take(10) {
        println!(
            "  {}  {}  {}",
            file.created_time.as_deref().unwrap_or("-"),
            file.name,
            file.web_view_link.as_deref().unwrap_or("")
        );
    }

    println!("Authorization complete!");
    Ok(())
}
