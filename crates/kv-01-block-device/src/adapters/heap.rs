use crate::device::{check_range, BlockDevice};
use crate::errors::BdResult;

const ERASE_VALUE: u8 = 0xFF;

/// RAM-backed block device.
///
/// Starts fully erased. Does not enforce program-over-erased; wrap it in
/// `FlashSimBlockDevice` for that.
#[derive(Debug, Clone)]
pub struct HeapBlockDevice {
    data: Vec<u8>,
    read_size: u64,
    program_size: u64,
    erase_size: u64,
}

impl HeapBlockDevice {
    /// Create a device of `size` bytes with the given access units.
    pub fn new(size: u64, read_size: u64, program_size: u64, erase_size: u64) -> Self {
        Self {
            data: vec![ERASE_VALUE; size as usize],
            read_size: read_size.max(1),
            program_size: program_size.max(1),
            erase_size: erase_size.max(1),
        }
    }

    /// Raw contents, for media inspection in tests.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw contents, for fault injection in tests.
    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl BlockDevice for HeapBlockDevice {
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()> {
        check_range(self, "read", addr, buf.len() as u64, self.read_size)?;
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()> {
        check_range(self, "program", addr, data.len() as u64, self.program_size)?;
        let start = addr as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()> {
        check_range(self, "erase", addr, size, self.erase_size)?;
        let start = addr as usize;
        self.data[start..start + size as usize].fill(ERASE_VALUE);
        Ok(())
    }

    fn read_size(&self) -> u64 {
        self.read_size
    }

    fn program_size(&self) -> u64 {
        self.program_size
    }

    fn erase_size(&self) -> u64 {
        self.erase_size
    }

    fn erase_value(&self) -> Option<u8> {
        Some(ERASE_VALUE)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
