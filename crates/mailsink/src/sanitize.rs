//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Traces are safe to share for debugging: these functions keep full
//! filesystem paths and sender mailbox names out of spans. The audit log
//! files carry the unredacted values; spans carry only these forms.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks the local part of an email address, keeping the domain.
///
/// - `john@example.com` → `j***@example.com`
/// - addresses without `@` → `<invalid>`
pub fn redact_address(address: &str) -> String {
    match address.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().unwrap_or('?');
            format!("{}***@{}", first, domain)
        }
        Some((_, domain)) => format!("***@{}", domain),
        None => "<invalid>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/var/mailsink/downloads/invoice.pdf")),
            "invoice.pdf"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_redact_address_masks_local_part() {
        assert_eq!(redact_address("john@example.com"), "j***@example.com");
    }

    #[test]
    fn test_redact_address_empty_local_part() {
        assert_eq!(redact_address("@example.com"), "***@example.com");
    }

    #[test]
    fn test_redact_address_no_at() {
        assert_eq!(redact_address("not-an-address"), "<invalid>");
    }
}
