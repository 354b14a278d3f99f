//! Append-only audit logs for downloaded and blocked attachments.
//!
//! Line format for both logs: `sender fileName localTimestamp`.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::StorageError;
use crate::storage::filesystem::ensure_directory;

/// Blocked common image types are skipped without an audit line.
const QUIET_EXTENSIONS: &[&str] = &[".jpg", ".png"];

pub struct AuditLog {
    attachments_path: PathBuf,
    blocked_path: PathBuf,
}

impl AuditLog {
    /// Creates the audit log pair inside `log_dir`, creating the directory
    /// if missing.
    pub fn new(
        log_dir: &Path,
        attachments_file: &str,
        blocked_file: &str,
    ) -> Result<Self, StorageError> {
        ensure_directory(log_dir)?;
        Ok(Self {
            attachments_path: log_dir.join(attachments_file),
            blocked_path: log_dir.join(blocked_file),
        })
    }

    /// Records a persisted attachment.
    pub fn record_downloaded(&self, sender: &str, file_name: &str) -> Result<(), StorageError> {
        append_line(&self.attachments_path, sender, file_name)
    }

    /// Records an attachment rejected by the extension blocklist. Common
    /// image extensions are exempted from auditing (still not downloaded) to
    /// keep the blocked-files log free of noise.
    pub fn record_blocked(
        &self,
        sender: &str,
        file_name: &str,
        extension: &str,
    ) -> Result<(), StorageError> {
        if QUIET_EXTENSIONS
            .iter()
            .any(|quiet| quiet.eq_ignore_ascii_case(extension))
        {
            return Ok(());
        }
        append_line(&self.blocked_path, sender, file_name)
    }

    pub fn attachments_path(&self) -> &Path {
        &self.attachments_path
    }

    pub fn blocked_path(&self) -> &Path {
        &self.blocked_path
    }
}

fn append_line(path: &Path, sender: &str, file_name: &str) -> Result<(), StorageError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::AppendFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "{} {} {}", sender, file_name, timestamp).map_err(|e| {
        StorageError::AppendFile {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn audit(dir: &TempDir) -> AuditLog {
        AuditLog::new(dir.path(), "attachments.log", "blocked_files.log").unwrap()
    }

    #[test]
    fn test_downloaded_line_appended() {
        let dir = TempDir::new().unwrap();
        let log = audit(&dir);

        log.record_downloaded("sender@trusted.com", "invoice.pdf")
            .unwrap();
        log.record_downloaded("sender@trusted.com", "report.xlsx")
            .unwrap();

        let content = std::fs::read_to_string(log.attachments_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("sender@trusted.com invoice.pdf "));
        assert!(lines[1].starts_with("sender@trusted.com report.xlsx "));
    }

    #[test]
    fn test_blocked_line_appended() {
        let dir = TempDir::new().unwrap();
        let log = audit(&dir);

        log.record_blocked("sender@trusted.com", "virus.exe", ".exe")
            .unwrap();

        let content = std::fs::read_to_string(log.blocked_path()).unwrap();
        assert!(content.starts_with("sender@trusted.com virus.exe "));
    }

    #[test]
    fn test_image_extensions_not_audited() {
        let dir = TempDir::new().unwrap();
        let log = audit(&dir);

        log.record_blocked("sender@trusted.com", "photo.jpg", ".jpg")
            .unwrap();
        log.record_blocked("sender@trusted.com", "logo.png", ".png")
            .unwrap();

        assert!(!log.blocked_path().exists());
    }

    #[test]
    fn test_creates_log_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("logs");
        let log = AuditLog::new(&nested, "a.log", "b.log").unwrap();

        log.record_downloaded("s@d.com", "f.pdf").unwrap();
        assert!(nested.join("a.log").exists());
    }
}
