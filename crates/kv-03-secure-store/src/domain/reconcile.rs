//! # Reconcile Report
//!
//! Outcome of the counter check `init` runs over every replay-protected
//! key.

/// Keys grouped by what `init` found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Replay-protected keys examined.
    pub keys_checked: usize,
    /// Interrupted counter commits completed during `init`.
    pub rolled_forward: Vec<String>,
    /// Envelopes older than their committed counter.
    pub replayed: Vec<String>,
    /// Envelopes more than one commit ahead of their counter.
    pub counter_ahead: Vec<String>,
    /// Envelopes that failed to decode or authenticate.
    pub unauthenticated: Vec<String>,
    /// A store was not formatted, so counters were not (fully) checked.
    pub skipped: bool,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that `get` will refuse until they are removed or rewritten.
    pub fn unreadable(&self) -> impl Iterator<Item = &str> {
        self.replayed
            .iter()
            .chain(&self.counter_ahead)
            .chain(&self.unauthenticated)
            .map(String::as_str)
    }

    pub fn is_clean(&self) -> bool {
        self.rolled_forward.is_empty() && self.unreadable().next().is_none()
    }
}
