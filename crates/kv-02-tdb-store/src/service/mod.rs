//! # TDB Store Service
//!
//! `TdbStore` implements `KeyValueStore` over any `BlockDevice`.
//!
//! ## Lifecycle
//!
//! ```text
//!   new ──► NotInitialized ──init──► Ready ◄──reset── Uninitialized
//!                 ▲                    │  ▲                ▲
//!                 └──────deinit────────┘  └─────reset── Faulted
//! ```
//!
//! - `Uninitialized`: no Area header validated; only `reset`/`deinit`.
//! - `Faulted`: the active Area cannot be trusted; everything except
//!   `reset`/`deinit` returns `Corrupted`.
//! - A device error in the middle of a write drops the store back to
//!   `NotInitialized`; the next `init` replays the log and repairs any
//!   torn tail.

mod log;
mod recovery;

use crate::domain::config::TdbConfig;
use crate::domain::index::{IndexEntry, RamTable};
use crate::domain::layout::{encode_record, DELETE_FLAG};
use crate::domain::metrics::CompactionMetrics;
use crate::domain::recovery::RecoveryReport;
use kv_01_block_device::BlockDevice;
use shared_types::{
    next_from_snapshot, validate_key, KeyValueStore, KvError, KvFlags, KvInfo, KvIterator,
    KvResult,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Lifecycle state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    NotInitialized,
    Uninitialized,
    Ready,
    Faulted,
}

/// Device geometry, derived at `init`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Geometry {
    pub area_size: u64,
    /// First record offset within an Area (header padded to program size).
    pub data_start: u64,
    pub program_size: u64,
    pub erase_value: u8,
}

impl Geometry {
    pub fn area_base(&self, area: usize) -> u64 {
        area as u64 * self.area_size
    }
}

/// Log-structured key-value store over two ping-pong Areas.
pub struct TdbStore<D: BlockDevice> {
    pub(crate) device: D,
    pub(crate) config: TdbConfig,
    pub(crate) state: StoreState,
    pub(crate) geometry: Geometry,
    /// Index of the active Area (0 or 1).
    pub(crate) active: usize,
    pub(crate) generation: u64,
    /// Offset of the first free byte in the active Area.
    pub(crate) free_offset: u64,
    /// Highest generation seen on the media, valid or stale.
    pub(crate) last_generation: u64,
    pub(crate) index: RamTable,
    pub(crate) open_iterators: HashSet<u64>,
    pub(crate) next_iterator_id: u64,
    pub(crate) metrics: Arc<CompactionMetrics>,
    pub(crate) report: RecoveryReport,
}

impl<D: BlockDevice> TdbStore<D> {
    /// Create a store over `device`. Nothing is read until `init`.
    pub fn new(device: D, config: TdbConfig) -> Self {
        Self {
            device,
            config,
            state: StoreState::NotInitialized,
            geometry: Geometry::default(),
            active: 0,
            generation: 0,
            free_offset: 0,
            last_generation: 0,
            index: RamTable::new(),
            open_iterators: HashSet::new(),
            next_iterator_id: 1,
            metrics: Arc::new(CompactionMetrics::new()),
            report: RecoveryReport::new(),
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn config(&self) -> &TdbConfig {
        &self.config
    }

    /// Generation of the active Area.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_area(&self) -> usize {
        self.active
    }

    /// Bytes left in the active Area before compaction is needed.
    pub fn free_space(&self) -> u64 {
        self.geometry.area_size.saturating_sub(self.free_offset)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn metrics(&self) -> Arc<CompactionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Report from the last `init` or `reset`.
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.report
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Release the store and hand back its device.
    pub fn into_device(self) -> D {
        self.device
    }

    /// Force a compaction of the active Area.
    ///
    /// # Errors
    ///
    /// `NotReady`/`Corrupted` outside the `Ready` state, `DeviceIo` if the
    /// device fails.
    pub fn compact(&mut self) -> KvResult<()> {
        self.ensure_ready()?;
        let result = self.compact_into_standby(None);
        self.abandon_on_device_error(result)
    }

    pub(crate) fn ensure_ready(&self) -> KvResult<()> {
        match self.state {
            StoreState::Ready => Ok(()),
            StoreState::Faulted => Err(KvError::corrupted("store is faulted; reset required")),
            StoreState::NotInitialized | StoreState::Uninitialized => Err(KvError::NotReady),
        }
    }

    /// After a device failure mid-write, the RAM view may no longer match
    /// the media. Drop to `NotInitialized` so the next `init` replays it.
    pub(crate) fn abandon_on_device_error<T>(&mut self, result: KvResult<T>) -> KvResult<T> {
        if let Err(KvError::DeviceIo { message }) = &result {
            tracing::warn!(
                "[kv-02] Device error during write ({}); store must be re-initialized",
                message
            );
            self.drop_ram_state();
            self.state = StoreState::NotInitialized;
        }
        result
    }

    pub(crate) fn drop_ram_state(&mut self) {
        self.index.clear();
        self.open_iterators.clear();
        self.free_offset = 0;
    }

    fn append_record(&mut self, key: &str, value: &[u8], flags: KvFlags) -> KvResult<()> {
        let value_len = u32::try_from(value.len()).map_err(|_| KvError::InvalidArgument {
            reason: format!("value is {} bytes, record limit {}", value.len(), u32::MAX),
        })?;
        let g = self.geometry;
        let record = encode_record(key, value, flags.bits(), g.program_size, g.erase_value);
        let len = record.len() as u64;
        self.ensure_room(len)?;

        let offset = self.free_offset;
        self.device.program(g.area_base(self.active) + offset, &record)?;
        self.device.sync()?;
        self.free_offset += len;
        self.index.insert(
            key.to_string(),
            IndexEntry {
                offset,
                len,
                value_len,
                flags,
            },
        );
        Ok(())
    }

    fn append_tombstone(&mut self, key: &str) -> KvResult<()> {
        let g = self.geometry;
        let record = encode_record(key, &[], DELETE_FLAG, g.program_size, g.erase_value);
        let len = record.len() as u64;

        if self.free_offset + len > g.area_size {
            // Compaction that leaves the key out commits the removal.
            return self.compact_into_standby(Some(key));
        }

        self.device
            .program(g.area_base(self.active) + self.free_offset, &record)?;
        self.device.sync()?;
        self.free_offset += len;
        self.index.remove(key);
        Ok(())
    }

    /// Make room for a record of `len` bytes, compacting if needed.
    fn ensure_room(&mut self, len: u64) -> KvResult<()> {
        let g = self.geometry;
        if g.data_start + len > g.area_size {
            return Err(KvError::MediaFull {
                required: len as usize,
                available: (g.area_size - g.data_start) as usize,
            });
        }
        if self.free_offset + len <= g.area_size {
            return Ok(());
        }

        self.compact_into_standby(None)?;
        if self.free_offset + len > g.area_size {
            return Err(KvError::MediaFull {
                required: len as usize,
                available: self.free_space() as usize,
            });
        }
        Ok(())
    }
}

impl<D: BlockDevice> KeyValueStore for TdbStore<D> {
    fn init(&mut self) -> KvResult<()> {
        if self.state != StoreState::NotInitialized {
            return Err(KvError::NotReady);
        }
        self.recover()
    }

    fn deinit(&mut self) -> KvResult<()> {
        if self.state == StoreState::NotInitialized {
            return Ok(());
        }
        self.drop_ram_state();
        self.state = StoreState::NotInitialized;
        self.device.deinit()?;
        tracing::info!("[kv-02] Store deinitialized");
        Ok(())
    }

    fn reset(&mut self) -> KvResult<()> {
        if self.state == StoreState::NotInitialized {
            return Err(KvError::NotReady);
        }
        let result = self.wipe();
        self.abandon_on_device_error(result)
    }

    fn set(&mut self, key: &str, value: &[u8], flags: KvFlags) -> KvResult<()> {
        self.ensure_ready()?;
        validate_key(key)?;
        let limit = self.config.value_limit();
        if value.len() > limit {
            return Err(KvError::InvalidArgument {
                reason: format!("value is {} bytes, max {}", value.len(), limit),
            });
        }
        if let Some(existing) = self.index.get(key) {
            if existing.flags.is_write_once() {
                return Err(KvError::WriteProtected);
            }
        }

        let result = self.append_record(key, value, flags);
        self.abandon_on_device_error(result)?;
        tracing::debug!("[kv-02] Set {} ({} bytes, flags {})", key, value.len(), flags);
        Ok(())
    }

    fn get(&mut self, key: &str, max_size: usize) -> KvResult<Vec<u8>> {
        self.ensure_ready()?;
        validate_key(key)?;
        let entry = *self.index.get(key).ok_or(KvError::NotFound)?;
        if entry.value_len as usize > max_size {
            return Err(KvError::BufferTooSmall {
                required: entry.value_len as usize,
                provided: max_size,
            });
        }

        let record = self.read_live_record(key, &entry)?;
        tracing::trace!("[kv-02] Get {} ({} bytes)", key, record.value.len());
        Ok(record.value)
    }

    fn get_info(&mut self, key: &str) -> KvResult<KvInfo> {
        self.ensure_ready()?;
        validate_key(key)?;
        let entry = self.index.get(key).ok_or(KvError::NotFound)?;
        Ok(KvInfo {
            size: entry.value_len as usize,
            flags: entry.flags,
        })
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        self.ensure_ready()?;
        validate_key(key)?;
        let entry = self.index.get(key).ok_or(KvError::NotFound)?;
        if entry.flags.is_write_once() {
            return Err(KvError::WriteProtected);
        }

        let result = self.append_tombstone(key);
        self.abandon_on_device_error(result)?;
        tracing::debug!("[kv-02] Removed {}", key);
        Ok(())
    }

    fn iterator_open(&mut self, prefix: Option<&str>) -> KvResult<KvIterator> {
        self.ensure_ready()?;
        if self.open_iterators.len() >= self.config.max_open_iterators {
            return Err(KvError::OutOfResources {
                resource: "iterators",
            });
        }

        let id = self.next_iterator_id;
        self.next_iterator_id += 1;
        self.open_iterators.insert(id);
        let keys = self.index.keys_with_prefix(prefix);
        tracing::trace!(
            "[kv-02] Iterator {} opened over {} keys (prefix {:?})",
            id,
            keys.len(),
            prefix
        );
        Ok(KvIterator::new(id, keys))
    }

    fn iterator_next(&mut self, it: &mut KvIterator, max_key_size: usize) -> KvResult<String> {
        self.ensure_ready()?;
        if !self.open_iterators.contains(&it.id()) {
            return Err(KvError::InvalidArgument {
                reason: format!("iterator {} is closed or was invalidated", it.id()),
            });
        }
        next_from_snapshot(it, max_key_size)
    }

    fn iterator_close(&mut self, it: KvIterator) -> KvResult<()> {
        if self.state == StoreState::NotInitialized {
            return Err(KvError::NotReady);
        }
        self.open_iterators.remove(&it.id());
        Ok(())
    }
}
