//! Resolution of the import and archive folders with fallback.
//!
//! A run must never fail merely because an optional destination folder is
//! missing: the import folder falls back to the inbox, the archive folder
//! falls back to the import folder. Only a source folder that cannot be
//! resolved at all aborts the run (handled by the caller on `None`).

use log::warn;
use tracing::debug;

use crate::mailbox::{MailboxApi, RetryPolicy};

/// Display name of the folder used when the configured import subfolder
/// cannot be resolved.
const INBOX_DISPLAY_NAME: &str = "Inbox";

pub struct FolderResolver<'a, A: MailboxApi> {
    api: &'a A,
    retry: &'a RetryPolicy,
}

impl<'a, A: MailboxApi> FolderResolver<'a, A> {
    pub fn new(api: &'a A, retry: &'a RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Resolves the import folder id, falling back to the inbox. `None`
    /// means not even the inbox could be found and the run must stop.
    pub async fn import_folder(&self, display_name: &str) -> Option<String> {
        if let Some(id) = self.resolve(display_name).await {
            return Some(id);
        }
        debug!(
            folder = display_name,
            "import folder not found, falling back to inbox"
        );
        self.resolve(INBOX_DISPLAY_NAME).await
    }

    /// Resolves the archive folder id, falling back to the import folder so
    /// a best-effort move still has a destination.
    pub async fn archive_folder(&self, display_name: &str, import_folder_id: &str) -> String {
        match self.resolve(display_name).await {
            Some(id) => id,
            None => {
                debug!(
                    folder = display_name,
                    "archive folder not found, falling back to import folder"
                );
                import_folder_id.to_string()
            }
        }
    }

    /// Single lookup through the retry policy. Remote failures are logged
    /// and reported as "not found": resolution failures are preconditions,
    /// not run-fatal errors.
    async fn resolve(&self, display_name: &str) -> Option<String> {
        match self
            .retry
            .run("Folder lookup", || self.api.resolve_folder(display_name))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!("Folder lookup for '{}' failed: {}", display_name, e);
                None
            }
        }
    }
}
