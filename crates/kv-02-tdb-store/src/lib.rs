//! # TDB Store (kv-02)
//!
//! A power-fail-safe, log-structured key-value store over a raw block
//! device region.
//!
//! ## Architecture
//!
//! The region is split into two equally sized **Areas**. Exactly one is
//! active; records are appended to it until it fills, at which point the
//! live records are copied into the standby Area and a new header with a
//! higher generation is written there last.
//!
//! ```text
//! Area 0                              Area 1
//! ┌────────┬─────┬─────┬──────┐       ┌────────┬──────────────────┐
//! │ hdr g=7│ rec │ rec │ free │       │ hdr g=6│ stale / erased   │
//! └────────┴─────┴─────┴──────┘       └────────┴──────────────────┘
//!     active (highest valid generation)     standby
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | One Authority | The Area with the highest valid generation is active |
//! | 2 | All-or-Nothing Set | A record without a valid trailing CRC never becomes visible |
//! | 3 | Header Last | A compaction commits only when the new header is programmed |
//! | 4 | Write Once | A `WRITE_ONCE` key changes only through `reset` |
//! | 5 | Bounded Iterators | At most `max_open_iterators` snapshots are open |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - On-media layout, RAM index, config, recovery report, metrics
//! - `service/` - `TdbStore`, implementing `shared_types::KeyValueStore`
//!
//! ## Usage
//!
//! ```ignore
//! use kv_01_block_device::HeapBlockDevice;
//! use kv_02_tdb_store::{TdbConfig, TdbStore};
//! use shared_types::{KeyValueStore, KvFlags};
//!
//! let mut store = TdbStore::new(HeapBlockDevice::new(8 * 4096, 1, 1, 4096), TdbConfig::default());
//! store.init()?;
//! store.reset()?;
//! store.set("example_key", b"example_value", KvFlags::NONE)?;
//! let value = store.get("example_key", 64)?;
//! ```

pub mod domain;
pub mod service;

pub use domain::config::{TdbConfig, MAX_RECORD_VALUE};
pub use domain::metrics::{CompactionMetrics, CompactionSnapshot};
pub use domain::recovery::RecoveryReport;
pub use service::{StoreState, TdbStore};
