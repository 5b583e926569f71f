//! Area-level operations: headers, record reads, compaction and wipe.

use super::{StoreState, TdbStore};
use crate::domain::index::{IndexEntry, RamTable};
use crate::domain::layout::{decode_record, is_erased, AreaHeader, Record, AREA_HEADER_SIZE};
use crate::domain::recovery::RecoveryReport;
use kv_01_block_device::{read_unaligned, BlockDevice};
use shared_types::{KvError, KvResult};

const SCAN_CHUNK: usize = 256;

impl<D: BlockDevice> TdbStore<D> {
    /// Read and validate the header of `area`.
    pub(crate) fn read_area_header(&mut self, area: usize) -> KvResult<Option<AreaHeader>> {
        let mut raw = [0u8; AREA_HEADER_SIZE];
        read_unaligned(&mut self.device, self.geometry.area_base(area), &mut raw)?;
        Ok(AreaHeader::decode(&raw))
    }

    /// Program the header of `area`. The Area must be erased.
    pub(crate) fn write_area_header(&mut self, area: usize, generation: u64) -> KvResult<()> {
        let g = self.geometry;
        let mut buf = vec![g.erase_value; g.data_start as usize];
        buf[..AREA_HEADER_SIZE].copy_from_slice(&AreaHeader::new(generation).encode());
        self.device.program(g.area_base(area), &buf)?;
        Ok(())
    }

    pub(crate) fn erase_area(&mut self, area: usize) -> KvResult<()> {
        let g = self.geometry;
        self.device.erase(g.area_base(area), g.area_size)?;
        Ok(())
    }

    /// True when `[start, end)` (absolute) holds only the erase value.
    pub(crate) fn region_is_erased(&mut self, start: u64, end: u64) -> KvResult<bool> {
        let erase_value = self.geometry.erase_value;
        let mut chunk = [0u8; SCAN_CHUNK];
        let mut at = start;
        while at < end {
            let n = ((end - at) as usize).min(SCAN_CHUNK);
            read_unaligned(&mut self.device, at, &mut chunk[..n])?;
            if !is_erased(&chunk[..n], erase_value) {
                return Ok(false);
            }
            at += n as u64;
        }
        Ok(true)
    }

    /// Read the whole padded record for `entry` from `area`.
    pub(crate) fn read_record_bytes(&mut self, area: usize, entry: &IndexEntry) -> KvResult<Vec<u8>> {
        let mut buf = vec![0u8; entry.len as usize];
        read_unaligned(
            &mut self.device,
            self.geometry.area_base(area) + entry.offset,
            &mut buf,
        )?;
        Ok(buf)
    }

    /// Read and verify the live record of `key`.
    pub(crate) fn read_live_record(&mut self, key: &str, entry: &IndexEntry) -> KvResult<Record> {
        let raw = self.read_record_bytes(self.active, entry)?;
        let record = decode_record(&raw).map_err(|defect| {
            tracing::error!(
                "[kv-02] Record for {} at offset {} is damaged: {}",
                key,
                entry.offset,
                defect
            );
            KvError::corrupted(format!("record for {}: {}", key, defect))
        })?;
        if record.key != key {
            return Err(KvError::corrupted(format!(
                "record at offset {} holds {}, expected {}",
                entry.offset, record.key, key
            )));
        }
        Ok(record)
    }

    /// Copy every live record (minus `skip`) into the standby Area and
    /// make it active.
    ///
    /// The new header is programmed after all records, so an interruption
    /// at any point leaves the current Area authoritative.
    pub(crate) fn compact_into_standby(&mut self, skip: Option<&str>) -> KvResult<()> {
        let result = self.copy_live_records(skip);
        if result.is_err() {
            self.metrics.record_abandoned();
        }
        result
    }

    fn copy_live_records(&mut self, skip: Option<&str>) -> KvResult<()> {
        let g = self.geometry;
        let source = self.active;
        let target = 1 - source;

        let live: Vec<(String, IndexEntry)> = self
            .index
            .in_area_order()
            .into_iter()
            .filter(|(k, _)| Some(*k) != skip)
            .map(|(k, e)| (k.to_string(), *e))
            .collect();

        self.erase_area(target)?;

        let mut relocated = RamTable::new();
        let mut write_at = g.data_start;
        for (key, entry) in &live {
            let raw = self.read_record_bytes(source, entry)?;
            decode_record(&raw).map_err(|defect| {
                KvError::corrupted(format!("live record {} during compaction: {}", key, defect))
            })?;
            self.device.program(g.area_base(target) + write_at, &raw)?;
            relocated.insert(
                key.clone(),
                IndexEntry {
                    offset: write_at,
                    ..*entry
                },
            );
            write_at += entry.len;
        }

        let generation = self.generation + 1;
        self.write_area_header(target, generation)?;
        self.device.sync()?;

        let reclaimed = self.free_offset.saturating_sub(write_at);
        self.active = target;
        self.generation = generation;
        self.last_generation = self.last_generation.max(generation);
        self.free_offset = write_at;
        self.index = relocated;
        self.metrics.record_committed(reclaimed, live.len() as u64);

        tracing::info!(
            "[kv-02] Compacted area {} -> {} (generation {}, {} records kept, {} bytes reclaimed)",
            source,
            target,
            generation,
            live.len(),
            reclaimed
        );
        Ok(())
    }

    /// Erase all data, write-once keys included.
    ///
    /// From `Ready`, an empty standby Area is committed with a higher
    /// generation before the old Area is erased, so the wipe is atomic.
    /// From `Uninitialized` or `Faulted` both Areas are erased and Area 0
    /// is formatted.
    pub(crate) fn wipe(&mut self) -> KvResult<()> {
        let generation = match self.state {
            StoreState::Ready => {
                let old = self.active;
                let target = 1 - old;
                let generation = self.generation + 1;
                self.erase_area(target)?;
                self.write_area_header(target, generation)?;
                self.device.sync()?;
                self.erase_area(old)?;
                self.active = target;
                generation
            }
            _ => {
                let generation = self.last_generation + 1;
                self.format(generation)?;
                generation
            }
        };

        self.drop_ram_state();
        self.generation = generation;
        self.last_generation = generation;
        self.free_offset = self.geometry.data_start;
        self.state = StoreState::Ready;
        self.report = RecoveryReport {
            active_area: Some(self.active),
            generation,
            formatted: true,
            ..Default::default()
        };
        tracing::info!(
            "[kv-02] Store reset (area {}, generation {})",
            self.active,
            generation
        );
        Ok(())
    }

    /// Erase both Areas and write a fresh header into Area 0.
    pub(crate) fn format(&mut self, generation: u64) -> KvResult<()> {
        self.erase_area(1)?;
        self.erase_area(0)?;
        self.write_area_header(0, generation)?;
        self.device.sync()?;
        self.active = 0;
        Ok(())
    }
}
