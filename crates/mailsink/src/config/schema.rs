use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secrets::resolve_secret;

/// All tunables for one pipeline run, constructed once and passed by
/// reference into the orchestrator and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Config format version.
    pub version: String,

    /// Directory tenant the credential belongs to.
    pub tenant_id: String,

    /// OAuth2 client id.
    pub client_id: String,

    /// Client secret as a direct value. Not recommended outside local
    /// testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_insecure: Option<String>,

    /// Path to a file containing the client secret (Docker secrets pattern).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_file: Option<String>,

    /// Name of an environment variable containing the client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_env_var: Option<String>,

    /// Mailbox to poll.
    pub target_mailbox: String,

    /// Only messages received within the last N hours qualify.
    #[serde(default = "default_hours_to_fetch")]
    pub hours_to_fetch: u32,

    /// Attempts per remote call.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Where downloaded attachments are written.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,

    /// Where the audit logs live.
    #[serde(default = "default_logs_directory")]
    pub logs_directory: PathBuf,

    /// Backing file for the download tracker.
    #[serde(default = "default_tracking_file")]
    pub tracking_file: PathBuf,

    /// Raw comma/semicolon-separated extension blocklist.
    #[serde(default = "default_blocked_extensions")]
    pub blocked_extensions: String,

    /// Display name of the source folder polled for new messages.
    #[serde(default = "default_import_folder")]
    pub import_folder: String,

    /// Display name of the folder processed messages are moved to.
    #[serde(default = "default_archive_folder")]
    pub archive_folder: String,

    /// Whether downloaded attachments are recorded in the audit log.
    #[serde(default = "default_true")]
    pub log_attachments: bool,

    /// File name of the downloaded-attachments audit log.
    #[serde(default = "default_attachments_log")]
    pub attachments_log: String,

    /// File name of the blocked-files audit log.
    #[serde(default = "default_blocked_log")]
    pub blocked_log: String,

    /// Whether processed messages are moved to the archive folder.
    #[serde(default)]
    pub move_to_archive: bool,

    /// Override for the OAuth2 token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// Override for the mailbox API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_base_url: Option<String>,
}

impl Settings {
    /// Resolves the client secret from its configured source.
    pub fn client_secret(&self) -> Result<SecretString, ConfigError> {
        Ok(resolve_secret(
            self.client_secret_insecure.as_deref(),
            self.client_secret_file.as_deref(),
            self.client_secret_env_var.as_deref(),
        )?)
    }
}

fn default_hours_to_fetch() -> u32 {
    24
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_logs_directory() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_tracking_file() -> PathBuf {
    PathBuf::from("./processed_attachments.json")
}

fn default_blocked_extensions() -> String {
    ".exe,.bat,.cmd,.com,.scr,.pif,.vbs,.js,.jar,.zip,.rar,.7z".to_string()
}

fn default_import_folder() -> String {
    "Import".to_string()
}

fn default_archive_folder() -> String {
    "ExternalOld".to_string()
}

fn default_true() -> bool {
    true
}

fn default_attachments_log() -> String {
    "attachments.log".to_string()
}

fn default_blocked_log() -> String {
    "blocked_files.log".to_string()
}
