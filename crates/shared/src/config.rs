//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Resume spool directory.
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// SMTP configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Google Drive configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Public site settings.
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body for form posts, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Directory served under `/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

/// Local spool directory for uploaded resumes.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Directory resumes are written to while a submission is processed.
    #[serde(default = "default_uploads_dir")]
    pub dir: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
        }
    }
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Transport mode: `starttls`, `tls` or `none`.
    #[serde(default = "default_encryption")]
    pub encryption: String,
    /// SMTP username, also used as the sender address.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password (an app password for Gmail).
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Display name on outgoing mail.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Receives every new lead, with the resume attached.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Receives Drive upload notifications.
    #[serde(default = "default_notification_email")]
    pub notification_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            encryption: default_encryption(),
            smtp_username: None,
            smtp_password: None,
            from_name: default_from_name(),
            admin_email: default_admin_email(),
            notification_email: default_notification_email(),
        }
    }
}

impl EmailConfig {
    /// Returns true when both SMTP credentials are present and non-empty.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.smtp_username) && present(&self.smtp_password)
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_encryption() -> String {
    "starttls".to_string()
}

fn default_from_name() -> String {
    "ApplyBoost Studio".to_string()
}

fn default_admin_email() -> String {
    "applyjobsforme9876@gmail.com".to_string()
}

fn default_notification_email() -> String {
    "notifications@applybooststudio.com".to_string()
}

/// Google Drive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Upload resumes to Drive.
    #[serde(default)]
    pub enabled: bool,
    /// OAuth client secrets downloaded from the Cloud console.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Where the authorized user token is kept.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// Parent folder for uploads.
    #[serde(default)]
    pub folder_id: String,
    /// Optional child folder of `folder_id`, created on first use.
    #[serde(default)]
    pub subfolder: Option<String>,
    /// OAuth scopes requested.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Drive metadata API base.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Drive media upload API base.
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
    /// Per-request timeout for Google endpoints.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
            folder_id: String::new(),
            subfolder: None,
            scopes: default_scopes(),
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/drive.file".to_string()]
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// Public site settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Booking page visitors are sent to after submitting.
    #[serde(default = "default_scheduling_url")]
    pub scheduling_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            scheduling_url: default_scheduling_url(),
        }
    }
}

fn default_scheduling_url() -> String {
    "https://zcal.co/jobsimplified/30min".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// `SENDER_EMAIL` and `SENDER_PASSWORD` take precedence over the
    /// configured SMTP credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("APPLYBOOST")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("drive.scopes"),
            )
            .set_override_option("email.smtp_username", std::env::var("SENDER_EMAIL").ok())?
            .set_override_option("email.smtp_password", std::env::var("SENDER_PASSWORD").ok())?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
