//! Sender allow-list evaluation.

use std::collections::HashSet;

/// Set of sender addresses and `@domain` suffixes authorized to contribute
/// attachments. Entries are normalized to lowercase once at construction;
/// evaluation is case-insensitive on both sides.
#[derive(Debug, Clone)]
pub struct SenderAllowList {
    entries: HashSet<String>,
}

impl SenderAllowList {
    /// Builds the allow-list from raw entries. Entries are trimmed and
    /// lowercased; empty entries are dropped.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Returns true when the sender address matches a full entry or its
    /// `@domain` suffix (everything from the last `@`, inclusive) matches a
    /// domain entry. Missing, empty, or `@`-less addresses are rejected.
    pub fn is_allowed(&self, sender: Option<&str>) -> bool {
        let Some(sender) = sender else {
            return false;
        };
        let sender = sender.to_lowercase();
        if sender.is_empty() || !sender.contains('@') {
            return false;
        }

        // rfind is guaranteed to hit after the contains check above.
        let domain = match sender.rfind('@') {
            Some(idx) => &sender[idx..],
            None => return false,
        };

        self.entries.contains(&sender) || self.entries.contains(domain)
    }

    /// Number of normalized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries survived normalization.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(entries: &[&str]) -> SenderAllowList {
        SenderAllowList::from_entries(entries.iter().copied())
    }

    #[test]
    fn test_exact_address_match() {
        let list = allow(&["john@example.com"]);
        assert!(list.is_allowed(Some("john@example.com")));
    }

    #[test]
    fn test_domain_match() {
        let list = allow(&["@trusted.com"]);
        assert!(list.is_allowed(Some("anyone@trusted.com")));
    }

    #[test]
    fn test_case_insensitive_both_sides() {
        let list = allow(&["John@Example.COM", "@Trusted.Com"]);
        assert!(list.is_allowed(Some("JOHN@EXAMPLE.COM")));
        assert!(list.is_allowed(Some("Anyone@TRUSTED.com")));
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let list = allow(&["john@example.com"]);
        assert!(!list.is_allowed(Some("hacker@evil.com")));
    }

    #[test]
    fn test_missing_or_malformed_rejected() {
        let list = allow(&["john@example.com"]);
        assert!(!list.is_allowed(None));
        assert!(!list.is_allowed(Some("")));
        assert!(!list.is_allowed(Some("no-at-symbol")));
    }

    #[test]
    fn test_domain_uses_last_at() {
        // Pathological address with multiple '@': the suffix starts at the
        // last one.
        let list = allow(&["@trusted.com"]);
        assert!(list.is_allowed(Some("weird@name@trusted.com")));
        assert!(!list.is_allowed(Some("weird@trusted.com@evil.com")));
    }

    #[test]
    fn test_entries_trimmed_and_empties_dropped() {
        let list = allow(&["  john@example.com ", "", "   "]);
        assert_eq!(list.len(), 1);
        assert!(list.is_allowed(Some("john@example.com")));
    }

    #[test]
    fn test_empty_list_rejects_everything() {
        let list = allow(&[]);
        assert!(list.is_empty());
        assert!(!list.is_allowed(Some("john@example.com")));
    }
}
