//! # Recovery Report
//!
//! What `init` found on the media and what it did about it. Torn writes
//! and stale standby Areas are repaired silently; the report is how a
//! caller (or a test) learns that it happened.

/// Result of the most recent `init` or `reset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Area selected as active, if any header validated.
    pub active_area: Option<usize>,
    /// Generation of the active Area.
    pub generation: u64,
    /// Records (values and tombstones) replayed from the active log.
    pub records_loaded: u64,
    /// Live keys after replay.
    pub live_keys: usize,
    /// A partially programmed record was found at the log tail and dropped.
    pub torn_tail_discarded: bool,
    /// The standby Area held an invalid header over non-erased bytes and
    /// was erased.
    pub standby_erased: bool,
    /// The log was compacted during `init` to clear a torn tail.
    pub compacted_on_init: bool,
    /// Blank media was formatted (`auto_format`, or `reset`).
    pub formatted: bool,
}

impl RecoveryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `init` found the media exactly as the last commit left it.
    pub fn is_clean(&self) -> bool {
        !self.torn_tail_discarded && !self.standby_erased && !self.compacted_on_init
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_is_clean() {
        assert!(RecoveryReport::new().is_clean());

        let report = RecoveryReport {
            torn_tail_discarded: true,
            ..Default::default()
        };
        assert!(!report.is_clean());
    }
}
