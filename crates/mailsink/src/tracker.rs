//! Durable tracking of downloaded attachments.
//!
//! The tracker is the single source of truth for at-most-once downloads: a
//! record exists iff the attachment has been written to disk in some prior
//! or current run. State is persisted to a flat JSON file after every new
//! record so a mid-run crash neither redownloads saved files nor forgets
//! them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Persisted proof that a specific attachment of a specific message has
/// already been downloaded.
///
/// Message and attachment ids are stored as separate fields rather than a
/// concatenated key: the ids are opaque and may themselves contain any
/// separator character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub message_id: String,
    pub attachment_id: String,
    pub file_name: String,
    pub downloaded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackingFile {
    #[serde(default)]
    attachments: Vec<TrackingRecord>,
}

/// Durable set of `(message_id, attachment_id)` pairs already downloaded.
#[derive(Debug)]
pub struct AttachmentTracker {
    path: PathBuf,
    records: HashMap<(String, String), TrackingRecord>,
}

impl AttachmentTracker {
    /// Loads tracking state from the backing file. A missing, empty, or
    /// unparsable file yields an empty tracker: first-run and corruption are
    /// both non-fatal, since losing state only risks re-downloading.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let records = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => match serde_json::from_str::<TrackingFile>(&content) {
                Ok(file) => {
                    let records: HashMap<_, _> = file
                        .attachments
                        .into_iter()
                        .map(|r| ((r.message_id.clone(), r.attachment_id.clone()), r))
                        .collect();
                    info!(
                        "Loaded tracking data: {} attachments previously processed",
                        records.len()
                    );
                    records
                }
                Err(e) => {
                    warn!(
                        "Failed to parse tracking file '{}', using empty state: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(
                    "Failed to read tracking file '{}', using empty state: {}",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        };

        Self { path, records }
    }

    /// Pure lookup, no side effect.
    pub fn is_processed(&self, message_id: &str, attachment_id: &str) -> bool {
        self.records
            .contains_key(&(message_id.to_string(), attachment_id.to_string()))
    }

    /// Inserts (or overwrites) the record and synchronously persists the full
    /// tracker state. A persistence failure is logged but does not abort the
    /// pipeline: the in-memory mark still prevents duplicate work for the
    /// remainder of the run.
    pub fn mark_processed(&mut self, message_id: &str, attachment_id: &str, file_name: &str) {
        let record = TrackingRecord {
            message_id: message_id.to_string(),
            attachment_id: attachment_id.to_string(),
            file_name: file_name.to_string(),
            downloaded_at: Utc::now(),
        };
        self.records.insert(
            (message_id.to_string(), attachment_id.to_string()),
            record,
        );

        match self.save() {
            Ok(()) => debug!(
                "Marked attachment '{}' of message '{}' as processed",
                attachment_id, message_id
            ),
            Err(e) => warn!(
                "Failed to save tracking file '{}': {}",
                self.path.display(),
                e
            ),
        }
    }

    /// Number of tracked attachments.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been tracked yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the full state to the backing file. The file is written to a
    /// sibling temp path and atomically renamed into place so a crash mid-save
    /// leaves the previous state intact.
    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Stable order keeps successive snapshots diffable.
        let mut attachments: Vec<TrackingRecord> = self.records.values().cloned().collect();
        attachments.sort_by(|a, b| {
            (&a.message_id, &a.attachment_id).cmp(&(&b.message_id, &b.attachment_id))
        });

        let file = TrackingFile { attachments };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tracker_path(dir: &TempDir) -> PathBuf {
        dir.path().join("processed_attachments.json")
    }

    #[test]
    fn test_missing_file_yields_empty_tracker() {
        let dir = TempDir::new().unwrap();
        let tracker = AttachmentTracker::load(tracker_path(&dir));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_mark_and_check_processed() {
        let dir = TempDir::new().unwrap();
        let mut tracker = AttachmentTracker::load(tracker_path(&dir));

        assert!(!tracker.is_processed("msg-1", "att-1"));
        tracker.mark_processed("msg-1", "att-1", "invoice.pdf");
        assert!(tracker.is_processed("msg-1", "att-1"));
        assert!(!tracker.is_processed("msg-1", "att-2"));
        assert!(!tracker.is_processed("msg-2", "att-1"));
    }

    #[test]
    fn test_round_trip_through_backing_file() {
        let dir = TempDir::new().unwrap();
        let path = tracker_path(&dir);

        let mut tracker = AttachmentTracker::load(&path);
        tracker.mark_processed("msg-1", "att-1", "invoice.pdf");
        tracker.mark_processed("msg-1", "att-2", "report.xlsx");

        let reloaded = AttachmentTracker::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.is_processed("msg-1", "att-1"));
        assert!(reloaded.is_processed("msg-1", "att-2"));
        assert!(!reloaded.is_processed("msg-2", "att-1"));
    }

    #[test]
    fn test_ids_containing_underscores_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let path = tracker_path(&dir);

        let mut tracker = AttachmentTracker::load(&path);
        tracker.mark_processed("a_b", "c", "one.pdf");

        assert!(tracker.is_processed("a_b", "c"));
        assert!(!tracker.is_processed("a", "b_c"));

        let reloaded = AttachmentTracker::load(&path);
        assert!(reloaded.is_processed("a_b", "c"));
        assert!(!reloaded.is_processed("a", "b_c"));
    }

    #[test]
    fn test_empty_file_yields_empty_tracker() {
        let dir = TempDir::new().unwrap();
        let path = tracker_path(&dir);
        std::fs::write(&path, "").unwrap();

        let tracker = AttachmentTracker::load(&path);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_corrupt_file_yields_empty_tracker() {
        let dir = TempDir::new().unwrap();
        let path = tracker_path(&dir);
        std::fs::write(&path, "{not json").unwrap();

        let tracker = AttachmentTracker::load(&path);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_mark_overwrites_existing_record() {
        let dir = TempDir::new().unwrap();
        let path = tracker_path(&dir);

        let mut tracker = AttachmentTracker::load(&path);
        tracker.mark_processed("msg-1", "att-1", "old-name.pdf");
        tracker.mark_processed("msg-1", "att-1", "new-name.pdf");
        assert_eq!(tracker.len(), 1);

        let reloaded = AttachmentTracker::load(&path);
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("tracking.json");

        let mut tracker = AttachmentTracker::load(&path);
        tracker.mark_processed("msg-1", "att-1", "invoice.pdf");

        assert!(path.exists());
    }
}
