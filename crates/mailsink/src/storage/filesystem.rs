use std::path::{Path, PathBuf};

use chrono::Local;
use log::debug;

use crate::error::StorageError;

/// Writes attachment payloads into a flat output directory, avoiding
/// overwrites by prefixing colliding names with a timestamp.
pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Creates the output directory if missing.
    pub fn ensure_root(&self) -> Result<(), StorageError> {
        ensure_directory(&self.output_directory)
    }

    /// Writes `content` under the attachment's file name and returns the
    /// path written. When a file of the same name already exists, the new
    /// file gets a `yyyyMMddHHmmssfff_` timestamp prefix instead of
    /// overwriting.
    pub fn store(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_root()?;

        let safe_name = sanitize_file_name(file_name);
        let path = self.unique_path(&safe_name);

        debug!("Writing attachment to {}", path.display());
        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    fn unique_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.output_directory.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let prefix = Local::now().format("%Y%m%d%H%M%S%3f");
        self.output_directory
            .join(format!("{}_{}", prefix, file_name))
    }
}

/// Creates a directory (and parents) if it does not exist.
pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Reduces an untrusted attachment name to its final path component so a
/// crafted name cannot escape the output directory. Empty names fall back
/// to `attachment`.
fn sanitize_file_name(name: &str) -> String {
    let component = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();

    let component = match component {
        "" | "." | ".." => "attachment",
        other => other,
    };
    component.to_string()
}
