//! # On-Media Layout
//!
//! Little-endian encoding of Area headers and log records.
//!
//! ```text
//! Area header (20 bytes, padded to program_size):
//!   magic "TDBA" u32 | version u16 | reserved u16 | generation u64 | crc u32
//!
//! Record (padded with the erase value to program_size):
//!   magic "TDBR" u32 | flags u32 | key_len u16 | reserved u16 | value_len u32
//!   key bytes | value bytes | crc u32
//! ```
//!
//! Both CRCs are CRC-32 over every byte before them.

use shared_types::{KvFlags, MAX_KEY_SIZE};
use thiserror::Error;

pub const AREA_MAGIC: u32 = u32::from_le_bytes(*b"TDBA");
pub const RECORD_MAGIC: u32 = u32::from_le_bytes(*b"TDBR");
pub const FORMAT_VERSION: u16 = 1;

pub const AREA_HEADER_SIZE: usize = 20;
pub const RECORD_HEADER_SIZE: usize = 16;
pub const RECORD_CRC_SIZE: usize = 4;

/// Internal record flag marking a tombstone. Never exposed to callers.
pub const DELETE_FLAG: u32 = 1 << 31;

/// Round `n` up to a multiple of `unit`.
pub fn align_up(n: u64, unit: u64) -> u64 {
    let unit = unit.max(1);
    n.div_ceil(unit) * unit
}

/// True when every byte equals the erase value.
pub fn is_erased(bytes: &[u8], erase_value: u8) -> bool {
    bytes.iter().all(|b| *b == erase_value)
}

/// Header at the start of each Area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaHeader {
    pub generation: u64,
}

impl AreaHeader {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn encode(&self) -> [u8; AREA_HEADER_SIZE] {
        let mut out = [0u8; AREA_HEADER_SIZE];
        out[0..4].copy_from_slice(&AREA_MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        out[8..16].copy_from_slice(&self.generation.to_le_bytes());
        let crc = crc32fast::hash(&out[..16]);
        out[16..20].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decode a header; `None` unless magic, version and CRC all check out.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < AREA_HEADER_SIZE {
            return None;
        }
        if read_u32(bytes, 0) != AREA_MAGIC || read_u16(bytes, 4) != FORMAT_VERSION {
            return None;
        }
        if crc32fast::hash(&bytes[..16]) != read_u32(bytes, 16) {
            return None;
        }
        Some(Self {
            generation: read_u64(bytes, 8),
        })
    }
}

/// Fixed-size prefix of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub flags: u32,
    pub key_len: u16,
    pub value_len: u32,
}

impl RecordHeader {
    /// Decode the fixed prefix. Only the magic and key length are
    /// checked; the CRC needs the whole record.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_HEADER_SIZE || read_u32(bytes, 0) != RECORD_MAGIC {
            return None;
        }
        let key_len = read_u16(bytes, 8);
        if key_len == 0 || key_len as usize > MAX_KEY_SIZE {
            return None;
        }
        Some(Self {
            flags: read_u32(bytes, 4),
            key_len,
            value_len: read_u32(bytes, 12),
        })
    }

    pub fn is_tombstone(&self) -> bool {
        self.flags & DELETE_FLAG != 0
    }

    /// Caller-visible flags.
    pub fn user_flags(&self) -> KvFlags {
        KvFlags::from_bits_truncate(self.flags)
    }

    /// Bytes covered by the record, CRC included, before padding.
    pub fn payload_len(&self) -> u64 {
        (RECORD_HEADER_SIZE + RECORD_CRC_SIZE) as u64 + self.key_len as u64 + self.value_len as u64
    }

    /// Bytes the record occupies in the Area.
    pub fn padded_len(&self, program_size: u64) -> u64 {
        align_up(self.payload_len(), program_size)
    }
}

/// A decoded, CRC-verified record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub key: String,
    pub value: Vec<u8>,
}

/// Why a record failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordDefect {
    #[error("bad record header")]
    BadHeader,

    #[error("record truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("record checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("record key is not valid UTF-8")]
    BadKey,
}

/// Encode a record, padded with `erase_value` to `program_size`.
pub fn encode_record(
    key: &str,
    value: &[u8],
    flags: u32,
    program_size: u64,
    erase_value: u8,
) -> Vec<u8> {
    let header = RecordHeader {
        flags,
        key_len: key.len() as u16,
        value_len: value.len() as u32,
    };
    let mut out = Vec::with_capacity(header.padded_len(program_size) as usize);
    out.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
    out.extend_from_slice(&header.flags.to_le_bytes());
    out.extend_from_slice(&header.key_len.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&header.value_len.to_le_bytes());
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(value);
    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out.resize(header.padded_len(program_size) as usize, erase_value);
    out
}

/// Decode and verify a record starting at `bytes[0]`. Trailing padding is
/// ignored.
pub fn decode_record(bytes: &[u8]) -> Result<Record, RecordDefect> {
    let header = RecordHeader::decode(bytes).ok_or(RecordDefect::BadHeader)?;
    let needed = header.payload_len() as usize;
    if bytes.len() < needed {
        return Err(RecordDefect::Truncated {
            needed,
            available: bytes.len(),
        });
    }

    let crc_at = needed - RECORD_CRC_SIZE;
    let stored = read_u32(bytes, crc_at);
    let computed = crc32fast::hash(&bytes[..crc_at]);
    if stored != computed {
        return Err(RecordDefect::ChecksumMismatch { stored, computed });
    }

    let key_end = RECORD_HEADER_SIZE + header.key_len as usize;
    let key = std::str::from_utf8(&bytes[RECORD_HEADER_SIZE..key_end])
        .map_err(|_| RecordDefect::BadKey)?
        .to_string();
    let value = bytes[key_end..crc_at].to_vec();

    Ok(Record { header, key, value })
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_header_rejects_any_flipped_byte() {
        let encoded = AreaHeader::new(42).encode();
        assert_eq!(AreaHeader::decode(&encoded), Some(AreaHeader::new(42)));

        for i in 0..AREA_HEADER_SIZE {
            let mut bad = encoded;
            bad[i] ^= 0x01;
            assert_eq!(AreaHeader::decode(&bad), None, "byte {} flipped", i);
        }
    }

    #[test]
    fn test_erased_header_is_invalid() {
        assert_eq!(AreaHeader::decode(&[0xFF; AREA_HEADER_SIZE]), None);
    }

    #[test]
    fn test_record_padding_uses_erase_value() {
        let encoded = encode_record("k", b"v", 0, 64, 0xFF);
        assert_eq!(encoded.len(), 64);
        let payload = RECORD_HEADER_SIZE + 2 + RECORD_CRC_SIZE;
        assert!(is_erased(&encoded[payload..], 0xFF));

        let record = decode_record(&encoded).unwrap();
        assert_eq!(record.key, "k");
        assert_eq!(record.value, b"v");
    }

    #[test]
    fn test_torn_record_fails_checksum() {
        let mut encoded = encode_record("example_key", b"example_value", 0, 1, 0xFF);
        let half = encoded.len() / 2;
        for b in &mut encoded[half..] {
            *b = 0xFF;
        }
        assert!(matches!(
            decode_record(&encoded),
            Err(RecordDefect::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_tombstone_flag_is_not_a_user_flag() {
        let encoded = encode_record("gone", &[], DELETE_FLAG | 1, 1, 0xFF);
        let record = decode_record(&encoded).unwrap();
        assert!(record.header.is_tombstone());
        assert_eq!(record.header.user_flags(), KvFlags::WRITE_ONCE);
    }

    #[test]
    fn test_header_rejects_oversized_key_len() {
        let mut encoded = encode_record("k", b"", 0, 1, 0xFF);
        encoded[8..10].copy_from_slice(&u16::MAX.to_le_bytes());
        assert_eq!(RecordHeader::decode(&encoded), None);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(20, 1), 20);
        assert_eq!(align_up(20, 16), 32);
        assert_eq!(align_up(32, 16), 32);
        assert_eq!(align_up(0, 8), 0);
    }
}
