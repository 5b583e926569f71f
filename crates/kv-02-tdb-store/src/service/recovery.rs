//! `init`: Area selection and log replay.

use super::{Geometry, StoreState, TdbStore};
use crate::domain::index::{IndexEntry, RamTable};
use crate::domain::layout::{
    align_up, decode_record, is_erased, RecordHeader, AREA_HEADER_SIZE, RECORD_CRC_SIZE,
    RECORD_HEADER_SIZE,
};
use crate::domain::recovery::RecoveryReport;
use kv_01_block_device::{read_unaligned, BlockDevice};
use shared_types::{KvError, KvResult};

const DEFAULT_ERASE_VALUE: u8 = 0xFF;

/// How the replay of the active log ended.
enum ScanEnd {
    /// Erased space (or the end of the Area) at this offset.
    Clean(u64),
    /// A record at this offset was partially programmed.
    TornTail(u64),
}

impl Geometry {
    fn probe<D: BlockDevice>(device: &D) -> KvResult<Self> {
        let program_size = device.program_size().max(1);
        let erase_size = device.erase_size().max(1);
        let area_size = (device.size() / 2) / erase_size * erase_size;
        let data_start = align_up(AREA_HEADER_SIZE as u64, program_size);
        let smallest_record = align_up(
            (RECORD_HEADER_SIZE + 1 + RECORD_CRC_SIZE) as u64,
            program_size,
        );

        if area_size < data_start + smallest_record {
            return Err(KvError::InvalidArgument {
                reason: format!(
                    "device of {} bytes (erase unit {}) is too small for two areas",
                    device.size(),
                    erase_size
                ),
            });
        }

        Ok(Self {
            area_size,
            data_start,
            program_size,
            erase_value: device.erase_value().unwrap_or(DEFAULT_ERASE_VALUE),
        })
    }
}

impl<D: BlockDevice> TdbStore<D> {
    /// Bring the store up from the media.
    pub(crate) fn recover(&mut self) -> KvResult<()> {
        self.device.init()?;
        self.geometry = Geometry::probe(&self.device)?;
        self.drop_ram_state();
        let mut report = RecoveryReport::new();

        let headers = [self.read_area_header(0)?, self.read_area_header(1)?];
        self.last_generation = headers
            .iter()
            .flatten()
            .map(|h| h.generation)
            .max()
            .unwrap_or(0);

        let active = match (headers[0], headers[1]) {
            (None, None) => return self.handle_blank_media(report),
            (Some(a), Some(b)) if a.generation == b.generation => {
                self.state = StoreState::Faulted;
                tracing::error!(
                    "[kv-02] Both areas claim generation {}; store faulted",
                    a.generation
                );
                return Err(KvError::corrupted(format!(
                    "both areas claim generation {}",
                    a.generation
                )));
            }
            (Some(a), Some(b)) => usize::from(b.generation > a.generation),
            (Some(_), None) => 0,
            (None, Some(_)) => 1,
        };
        let standby = 1 - active;
        let generation = headers[active].map(|h| h.generation).unwrap_or(0);

        if headers[standby].is_none() {
            let base = self.geometry.area_base(standby);
            if !self.region_is_erased(base, base + self.geometry.area_size)? {
                tracing::warn!(
                    "[kv-02] Standby area {} has no valid header; erasing interrupted compaction",
                    standby
                );
                self.erase_area(standby)?;
                report.standby_erased = true;
            }
        }

        self.active = active;
        self.generation = generation;

        let end = match self.replay_log(active, &mut report) {
            Ok(end) => end,
            Err(e @ KvError::Corrupted { .. }) => {
                self.drop_ram_state();
                self.state = StoreState::Faulted;
                tracing::error!("[kv-02] Active area {} is corrupted: {}", active, e);
                return Err(e);
            }
            Err(e) => {
                self.drop_ram_state();
                return Err(e);
            }
        };

        self.state = StoreState::Ready;
        match end {
            ScanEnd::Clean(offset) => self.free_offset = offset,
            ScanEnd::TornTail(offset) => {
                tracing::warn!(
                    "[kv-02] Discarding torn record at offset {} of area {}",
                    offset,
                    active
                );
                self.free_offset = offset;
                report.torn_tail_discarded = true;
                let compacted = self.compact_into_standby(None);
                self.abandon_on_device_error(compacted)?;
                report.compacted_on_init = true;
            }
        }

        report.active_area = Some(self.active);
        report.generation = self.generation;
        report.live_keys = self.index.len();
        tracing::info!(
            "[kv-02] Store initialized: area {}, generation {}, {} live keys ({} records replayed)",
            self.active,
            self.generation,
            report.live_keys,
            report.records_loaded
        );
        self.report = report;
        Ok(())
    }

    fn handle_blank_media(&mut self, mut report: RecoveryReport) -> KvResult<()> {
        if !self.config.auto_format {
            self.state = StoreState::Uninitialized;
            self.report = report;
            tracing::info!("[kv-02] No valid area header found; store needs reset");
            return Ok(());
        }

        tracing::info!("[kv-02] Formatting blank media");
        let generation = self.last_generation + 1;
        self.format(generation)?;
        self.generation = generation;
        self.last_generation = generation;
        self.free_offset = self.geometry.data_start;
        self.state = StoreState::Ready;

        report.formatted = true;
        report.active_area = Some(self.active);
        report.generation = generation;
        self.report = report;
        Ok(())
    }

    /// Replay `area`'s log into the RAM table.
    ///
    /// A record that fails to decode is a torn write when only erased
    /// bytes follow it; anything else is corruption.
    fn replay_log(&mut self, area: usize, report: &mut RecoveryReport) -> KvResult<ScanEnd> {
        let g = self.geometry;
        let base = g.area_base(area);
        let min_record = (RECORD_HEADER_SIZE + RECORD_CRC_SIZE) as u64;
        let mut table = RamTable::new();
        let mut offset = g.data_start;

        let end = loop {
            if offset + min_record > g.area_size {
                break ScanEnd::Clean(offset);
            }

            let mut head = [0u8; RECORD_HEADER_SIZE];
            read_unaligned(&mut self.device, base + offset, &mut head)?;
            if is_erased(&head, g.erase_value) {
                break ScanEnd::Clean(offset);
            }

            let header = RecordHeader::decode(&head)
                .filter(|h| offset + h.padded_len(g.program_size) <= g.area_size);
            let record = match header {
                Some(h) => {
                    let mut raw = vec![0u8; h.payload_len() as usize];
                    read_unaligned(&mut self.device, base + offset, &mut raw)?;
                    decode_record(&raw).ok()
                }
                None => None,
            };

            let Some(record) = record else {
                let skip = match header {
                    Some(h) => h.padded_len(g.program_size),
                    None => align_up(RECORD_HEADER_SIZE as u64, g.program_size),
                };
                if self.region_is_erased(base + offset + skip, base + g.area_size)? {
                    break ScanEnd::TornTail(offset);
                }
                return Err(KvError::corrupted(format!(
                    "record at offset {} of area {} is damaged and followed by data",
                    offset, area
                )));
            };

            let len = record.header.padded_len(g.program_size);
            if record.header.is_tombstone() {
                table.remove(&record.key);
            } else {
                table.insert(
                    record.key,
                    IndexEntry {
                        offset,
                        len,
                        value_len: record.header.value_len,
                        flags: record.header.user_flags(),
                    },
                );
            }
            report.records_loaded += 1;
            offset += len;
        };

        self.index = table;
        Ok(end)
    }
}
