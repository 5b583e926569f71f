//! Iterator handle issued by the registry.

use shared_types::KvIterator;

/// A store snapshot tagged with the partition that issued it.
#[derive(Debug)]
pub struct GlobalIterator {
    pub(crate) partition: String,
    pub(crate) inner: KvIterator,
}

impl GlobalIterator {
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Keys not yet returned.
    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}
