//! # Rollback Counters
//!
//! The Rollback-Protection Store holds one `u64` per replay-protected key,
//! little-endian, under the key's own name. A missing entry reads as 0.

use shared_types::{KvError, KvResult};

pub const COUNTER_SIZE: usize = 8;

pub fn encode_counter(counter: u64) -> [u8; COUNTER_SIZE] {
    counter.to_le_bytes()
}

pub fn decode_counter(bytes: &[u8]) -> KvResult<u64> {
    let raw: [u8; COUNTER_SIZE] = bytes.try_into().map_err(|_| {
        KvError::corrupted(format!(
            "rollback counter is {} bytes, expected {}",
            bytes.len(),
            COUNTER_SIZE
        ))
    })?;
    Ok(u64::from_le_bytes(raw))
}

/// How an envelope's embedded counter relates to the committed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Counters agree.
    Current,
    /// Envelope written, counter commit interrupted. Valid.
    PendingCommit,
    /// Envelope older than the committed counter.
    Replayed,
    /// Envelope further ahead than one interrupted commit explains.
    Ahead,
}

impl Freshness {
    pub fn classify(embedded: u64, committed: u64) -> Self {
        if embedded == committed {
            Freshness::Current
        } else if embedded < committed {
            Freshness::Replayed
        } else if Some(embedded) == committed.checked_add(1) {
            Freshness::PendingCommit
        } else {
            Freshness::Ahead
        }
    }
}

/// Counter for the next write: one past anything already used.
pub fn next_counter(committed: u64, embedded: Option<u64>) -> u64 {
    committed.max(embedded.unwrap_or(0)) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Freshness::classify(5, 5), Freshness::Current);
        assert_eq!(Freshness::classify(6, 5), Freshness::PendingCommit);
        assert_eq!(Freshness::classify(4, 5), Freshness::Replayed);
        assert_eq!(Freshness::classify(7, 5), Freshness::Ahead);
    }

    #[test]
    fn test_next_counter_absorbs_pending_commit() {
        assert_eq!(next_counter(0, None), 1);
        assert_eq!(next_counter(3, Some(3)), 4);
        assert_eq!(next_counter(3, Some(4)), 5);
        assert_eq!(next_counter(9, Some(2)), 10);
    }

    #[test]
    fn test_counter_codec() {
        assert_eq!(decode_counter(&encode_counter(0x0102)).unwrap(), 0x0102);
        assert!(matches!(
            decode_counter(&[1, 2, 3]),
            Err(KvError::Corrupted { .. })
        ));
    }
}
