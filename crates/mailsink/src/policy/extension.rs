//! Filename-extension blocklist evaluation.

use std::collections::HashSet;

/// Set of lowercase filename extensions (leading dot included) whose
/// attachments must never be written to disk.
#[derive(Debug, Clone)]
pub struct BlockedExtensions {
    entries: HashSet<String>,
}

impl BlockedExtensions {
    /// Parses the raw delimiter-separated configuration string, e.g.
    /// `".exe,.bat;js"`. Entries are split on commas and semicolons,
    /// trimmed, lowercased, and prefixed with `.` when missing.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split([',', ';'])
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| {
                let lower = e.to_lowercase();
                if lower.starts_with('.') {
                    lower
                } else {
                    format!(".{}", lower)
                }
            })
            .collect();
        Self { entries }
    }

    /// Returns true when the lower-cased trailing extension of `file_name`
    /// is in the blocked set. Empty names and names without a dot are never
    /// blocked.
    pub fn is_blocked(&self, file_name: &str) -> bool {
        let ext = extension_of(file_name);
        !ext.is_empty() && self.entries.contains(&ext)
    }

    /// Number of parsed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the configuration produced no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extracts the lower-cased extension from the last `.` (inclusive) to the
/// end of the name. Returns an empty string when there is no dot.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) => file_name[idx..].to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_entries() {
        let set = BlockedExtensions::parse(".EXE, bat;.Vbs ; zip");
        assert_eq!(set.len(), 4);
        assert!(set.is_blocked("malware.exe"));
        assert!(set.is_blocked("run.BAT"));
        assert!(set.is_blocked("script.vbs"));
        assert!(set.is_blocked("archive.zip"));
    }

    #[test]
    fn test_allowed_files_pass() {
        let set = BlockedExtensions::parse(".exe,.bat,.vbs,.zip");
        assert!(!set.is_blocked("document.pdf"));
        assert!(!set.is_blocked("image.jpg"));
    }

    #[test]
    fn test_no_extension_not_blocked() {
        let set = BlockedExtensions::parse(".exe");
        assert!(!set.is_blocked("README"));
    }

    #[test]
    fn test_empty_name_not_blocked() {
        let set = BlockedExtensions::parse(".exe");
        assert!(!set.is_blocked(""));
    }

    #[test]
    fn test_case_insensitive_match() {
        let set = BlockedExtensions::parse(".exe");
        assert!(set.is_blocked("SETUP.EXE"));
    }

    #[test]
    fn test_only_trailing_extension_counts() {
        let set = BlockedExtensions::parse(".exe");
        assert!(!set.is_blocked("report.exe.pdf"));
        assert!(set.is_blocked("report.pdf.exe"));
    }

    #[test]
    fn test_empty_configuration() {
        let set = BlockedExtensions::parse("");
        assert!(set.is_empty());
        assert!(!set.is_blocked("anything.exe"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("virus.exe"), ".exe");
        assert_eq!(extension_of("archive.tar.GZ"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(""), "");
    }
}
