//! # RAM Table
//!
//! Maps each live key to the location of its latest record in the active
//! Area. Rebuilt from the log on every `init` and after compaction.

use shared_types::KvFlags;
use std::collections::HashMap;

/// Location and metadata of a live record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the record from the start of its Area.
    pub offset: u64,
    /// Padded length of the record in the Area.
    pub len: u64,
    pub value_len: u32,
    pub flags: KvFlags,
}

#[derive(Debug, Default, Clone)]
pub struct RamTable {
    entries: HashMap<String, IndexEntry>,
}

impl RamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Insert or replace; returns the superseded entry.
    pub fn insert(&mut self, key: String, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(key, entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Live entries ordered by their position in the Area.
    pub fn in_area_order(&self) -> Vec<(&str, &IndexEntry)> {
        let mut live: Vec<_> = self
            .entries
            .iter()
            .map(|(k, e)| (k.as_str(), e))
            .collect();
        live.sort_by_key(|(_, e)| e.offset);
        live
    }

    /// Live keys starting with `prefix`, in Area order.
    pub fn keys_with_prefix(&self, prefix: Option<&str>) -> Vec<String> {
        self.in_area_order()
            .into_iter()
            .filter(|(k, _)| prefix.map_or(true, |p| k.starts_with(p)))
            .map(|(k, _)| k.to_string())
            .collect()
    }
}
