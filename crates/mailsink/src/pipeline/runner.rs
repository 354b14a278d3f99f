//! Pipeline orchestrator: drives one full ingestion run.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::mailbox::{MailboxApi, RetryPolicy};
use crate::pipeline::audit::AuditLog;
use crate::pipeline::folders::FolderResolver;
use crate::pipeline::report::ProcessingResult;
use crate::policy::extension::extension_of;
use crate::policy::{BlockedExtensions, SenderAllowList};
use crate::sanitize::{redact_address, redact_path};
use crate::storage::FileStorage;
use crate::tracker::AttachmentTracker;

/// Drives the ingestion pipeline: resolve folders, list candidate messages,
/// and for each allowed message download every non-blocked, non-duplicate
/// attachment, persist it, and record it in the tracker.
///
/// A run is strictly sequential; once started it runs to completion or
/// failure.
pub struct AttachmentProcessor<'a, A: MailboxApi> {
    api: &'a A,
    settings: &'a Settings,
    retry: RetryPolicy,
    tracker: AttachmentTracker,
}

impl<'a, A: MailboxApi> AttachmentProcessor<'a, A> {
    /// Creates a processor, loading tracking state from the configured
    /// backing file.
    pub fn new(api: &'a A, settings: &'a Settings) -> Self {
        let retry = RetryPolicy::new(
            settings.retry_attempts,
            Duration::from_millis(settings.retry_delay_ms),
        );
        let tracker = AttachmentTracker::load(&settings.tracking_file);
        Self {
            api,
            settings,
            retry,
            tracker,
        }
    }

    /// Access to the tracker, for inspection after a run.
    pub fn tracker(&self) -> &AttachmentTracker {
        &self.tracker
    }

    /// Executes one run against the caller-supplied allow-list (mapping of
    /// address or `@domain` entry to a display label) and returns the
    /// counter summary.
    pub async fn run(
        &mut self,
        allow_entries: &HashMap<String, String>,
    ) -> Result<ProcessingResult> {
        let _span = info_span!(
            "pipeline_run",
            mailbox = %redact_address(&self.settings.target_mailbox)
        )
        .entered();

        let mut result = ProcessingResult::default();

        // Local directories must exist before any remote work.
        let storage = FileStorage::new(&self.settings.output_directory);
        storage.ensure_root()?;
        let audit = AuditLog::new(
            &self.settings.logs_directory,
            &self.settings.attachments_log,
            &self.settings.blocked_log,
        )?;

        // Safety valve: never fetch mail with no recipients configured to
        // match.
        let allowed = SenderAllowList::from_entries(allow_entries.keys());
        if allowed.is_empty() {
            info!("No allowed senders configured, aborting run");
            return Ok(result);
        }
        info!("Loaded {} allowed senders/domains", allowed.len());

        let blocked = BlockedExtensions::parse(&self.settings.blocked_extensions);

        let resolver = FolderResolver::new(self.api, &self.retry);
        let Some(import_folder_id) = resolver.import_folder(&self.settings.import_folder).await
        else {
            warn!(
                "Could not resolve import folder '{}', aborting run",
                self.settings.import_folder
            );
            return Ok(result);
        };
        let archive_folder_id = resolver
            .archive_folder(&self.settings.archive_folder, &import_folder_id)
            .await;

        let filter = received_since_filter(Utc::now(), self.settings.hours_to_fetch);
        let messages = self
            .retry
            .run("Message listing", || {
                self.api.list_messages(&import_folder_id, &filter)
            })
            .await?;

        info!(
            "Found {} messages with attachments in import folder",
            messages.len()
        );
        if messages.is_empty() {
            return Ok(result);
        }

        // Counts all returned messages, not just sender-approved ones.
        result.emails_processed = messages.len();

        let mut processed_message_ids: Vec<String> = Vec::new();

        for message in &messages {
            let Some(sender) = message.sender_address().map(str::to_lowercase) else {
                continue;
            };
            if !allowed.is_allowed(Some(sender.as_str())) {
                continue;
            }

            let _message_span = info_span!(
                "message",
                id = %message.id,
                sender = %redact_address(&sender)
            )
            .entered();
            info!(
                "Processing message: {} received: {}",
                message.subject.as_deref().unwrap_or("(no subject)"),
                message.received_date_time.as_deref().unwrap_or("?")
            );

            let attachments = self
                .retry
                .run("Attachment listing", || {
                    self.api.list_attachments(&message.id)
                })
                .await?;
            if attachments.is_empty() {
                info!("No attachments found");
                continue;
            }

            for attachment in &attachments {
                let Some(content) = attachment.content() else {
                    debug!(attachment = %attachment.id, "Skipped (no retrievable content)");
                    result.skipped_attachments += 1;
                    continue;
                };
                if self.tracker.is_processed(&message.id, &attachment.id) {
                    debug!(attachment = %attachment.id, "Skipped (already processed)");
                    result.skipped_attachments += 1;
                    continue;
                }

                let file_name = attachment
                    .name
                    .clone()
                    .unwrap_or_else(|| "attachment".to_string());

                if blocked.is_blocked(&file_name) {
                    info!(file = %file_name, "Blocked by extension");
                    result.skipped_attachments += 1;
                    audit.record_blocked(&sender, &file_name, &extension_of(&file_name))?;
                    continue;
                }

                let path = storage.store(&file_name, &content)?;
                if self.settings.log_attachments {
                    audit.record_downloaded(&sender, &file_name)?;
                }
                self.tracker
                    .mark_processed(&message.id, &attachment.id, &file_name);
                result.total_attachments += 1;
                result.new_downloads += 1;
                info!(
                    "Downloaded: {} ({:.2} KiB)",
                    redact_path(&path),
                    content.len() as f64 / 1024.0
                );
            }

            processed_message_ids.push(message.id.clone());
        }

        if self.settings.move_to_archive {
            self.move_processed(&processed_message_ids, &archive_folder_id)
                .await;
        } else {
            debug!(
                "Archive move disabled, leaving {} processed messages in place",
                processed_message_ids.len()
            );
        }

        info!("Email processing completed");
        Ok(result)
    }

    /// Best-effort move of processed messages to the archive folder. A
    /// failure to move one message is logged and does not abort the run or
    /// affect the counters.
    async fn move_processed(&self, message_ids: &[String], archive_folder_id: &str) {
        for message_id in message_ids {
            match self
                .retry
                .run("Message move", || {
                    self.api.move_message(message_id, archive_folder_id)
                })
                .await
            {
                Ok(()) => info!("Moved message {} to folder {}", message_id, archive_folder_id),
                Err(e) => warn!("Failed to move message {}: {}", message_id, e),
            }
        }
    }
}

/// Builds the server-side filter selecting messages received within the
/// last `hours` hours and flagged as having attachments.
fn received_since_filter(now: DateTime<Utc>, hours: u32) -> String {
    let since = now - chrono::Duration::hours(i64::from(hours));
    format!(
        "receivedDateTime ge {} and hasAttachments eq true",
        since.format("%Y-%m-%dT%H:%M:%S%.3fZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_received_since_filter_format() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        assert_eq!(
            received_since_filter(now, 24),
            "receivedDateTime ge 2026-01-01T12:00:00.000Z and hasAttachments eq true"
        );
    }

    #[test]
    fn test_received_since_filter_subday_window() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 8, 30, 0).unwrap();
        assert_eq!(
            received_since_filter(now, 6),
            "receivedDateTime ge 2026-06-15T02:30:00.000Z and hasAttachments eq true"
        );
    }
}
