//! # Block Device Port
//!
//! The driven port every store programs against. Implementations live in
//! `adapters/`; production drivers for real flash live outside this
//! workspace and only need to implement this trait.

use crate::errors::{BdResult, BlockDeviceError};

/// Abstract interface for a raw block device.
pub trait BlockDevice {
    /// Prepare the device for use.
    fn init(&mut self) -> BdResult<()> {
        Ok(())
    }

    /// Release the device.
    fn deinit(&mut self) -> BdResult<()> {
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `addr`.
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()>;

    /// Program `data` at `addr`. The target range must be erased.
    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()>;

    /// Erase `size` bytes starting at `addr`.
    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()>;

    /// Flush any buffered writes to the medium.
    fn sync(&mut self) -> BdResult<()> {
        Ok(())
    }

    /// Minimum read unit in bytes.
    fn read_size(&self) -> u64;

    /// Minimum program unit in bytes.
    fn program_size(&self) -> u64;

    /// Erase unit in bytes.
    fn erase_size(&self) -> u64;

    /// Byte value erased cells read back as, when the device defines one.
    fn erase_value(&self) -> Option<u8>;

    /// Total size in bytes.
    fn size(&self) -> u64;

    fn is_valid_read(&self, addr: u64, len: u64) -> bool {
        check_range(self, "read", addr, len, self.read_size()).is_ok()
    }

    fn is_valid_program(&self, addr: u64, len: u64) -> bool {
        check_range(self, "program", addr, len, self.program_size()).is_ok()
    }

    fn is_valid_erase(&self, addr: u64, len: u64) -> bool {
        check_range(self, "erase", addr, len, self.erase_size()).is_ok()
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn init(&mut self) -> BdResult<()> {
        (**self).init()
    }

    fn deinit(&mut self) -> BdResult<()> {
        (**self).deinit()
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()> {
        (**self).read(addr, buf)
    }

    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()> {
        (**self).program(addr, data)
    }

    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()> {
        (**self).erase(addr, size)
    }

    fn sync(&mut self) -> BdResult<()> {
        (**self).sync()
    }

    fn read_size(&self) -> u64 {
        (**self).read_size()
    }

    fn program_size(&self) -> u64 {
        (**self).program_size()
    }

    fn erase_size(&self) -> u64 {
        (**self).erase_size()
    }

    fn erase_value(&self) -> Option<u8> {
        (**self).erase_value()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

/// Check bounds and alignment of an access.
///
/// # Errors
///
/// `OutOfBounds` when the range leaves the device, `Unaligned` when
/// `addr` or `len` is not a multiple of `unit`.
pub fn check_range<D: BlockDevice + ?Sized>(
    device: &D,
    op: &'static str,
    addr: u64,
    len: u64,
    unit: u64,
) -> BdResult<()> {
    let size = device.size();
    if addr.checked_add(len).map_or(true, |end| end > size) {
        return Err(BlockDeviceError::OutOfBounds { addr, len, size });
    }
    if unit > 1 && (addr % unit != 0 || len % unit != 0) {
        return Err(BlockDeviceError::Unaligned {
            op,
            addr,
            len,
            unit,
        });
    }
    Ok(())
}

/// Read an arbitrary byte range from a device with a coarser read unit.
///
/// Widens the access to `read_size` boundaries and copies out the
/// requested window.
pub fn read_unaligned<D: BlockDevice + ?Sized>(
    device: &mut D,
    addr: u64,
    buf: &mut [u8],
) -> BdResult<()> {
    let unit = device.read_size().max(1);
    let len = buf.len() as u64;
    if unit == 1 || (addr % unit == 0 && len % unit == 0) {
        return device.read(addr, buf);
    }

    let start = addr - addr % unit;
    let end = (addr + len).div_ceil(unit) * unit;
    let mut wide = vec![0u8; (end - start) as usize];
    device.read(start, &mut wide)?;
    let offset = (addr - start) as usize;
    buf.copy_from_slice(&wide[offset..offset + buf.len()]);
    Ok(())
}
