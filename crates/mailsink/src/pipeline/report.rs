//! Run result accumulator.

/// Counters summarizing one pipeline run. Monotonically incremented during
/// the run, never decremented.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    /// Number of messages returned by the listing call, regardless of the
    /// sender filtering outcome.
    pub emails_processed: usize,
    /// Number of attachments persisted this run.
    pub total_attachments: usize,
    /// Number of attachments newly downloaded this run.
    pub new_downloads: usize,
    /// Number of attachments skipped (no content, already tracked, or
    /// blocked by extension).
    pub skipped_attachments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_zero() {
        let result = ProcessingResult::default();
        assert_eq!(result.emails_processed, 0);
        assert_eq!(result.total_attachments, 0);
        assert_eq!(result.new_downloads, 0);
        assert_eq!(result.skipped_attachments, 0);
    }
}
