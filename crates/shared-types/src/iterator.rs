//! # Iterator Snapshots
//!
//! An iterator is an owned list of keys captured when it was opened. It
//! never points into store memory, so later reads cannot alias it.

use std::collections::VecDeque;

/// Snapshot of live keys taken at `iterator_open` time.
///
/// The `id` ties the handle to the store that issued it; stores use it to
/// enforce their open-iterator limit and to refuse handles that outlived a
/// `reset` or `deinit`.
#[derive(Debug)]
pub struct KvIterator {
    id: u64,
    keys: VecDeque<String>,
}

impl KvIterator {
    /// Create a snapshot over `keys`, yielded in the given order.
    pub fn new(id: u64, keys: Vec<String>) -> Self {
        Self {
            id,
            keys: keys.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Keys not yet returned.
    pub fn remaining(&self) -> usize {
        self.keys.len()
    }

    /// Next key, without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.keys.front().map(String::as_str)
    }

    /// Consume the next key.
    pub fn advance(&mut self) -> Option<String> {
        self.keys.pop_front()
    }
}
