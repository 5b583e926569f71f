use crate::device::{check_range, BlockDevice};
use crate::errors::{BdResult, BlockDeviceError};

/// A window `[start, end)` of a parent device.
///
/// Addresses are translated by `start`; accesses past `end` are refused
/// here rather than spilling into a neighbouring slice.
#[derive(Debug)]
pub struct SlicingBlockDevice<D> {
    parent: D,
    start: u64,
    end: u64,
}

impl<D: BlockDevice> SlicingBlockDevice<D> {
    /// Slice `parent` to `[start, end)`.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if the window leaves the parent, `Unaligned` if
    /// either bound is not a multiple of the parent's erase unit.
    pub fn new(parent: D, start: u64, end: u64) -> BdResult<Self> {
        if start >= end {
            return Err(BlockDeviceError::OutOfBounds {
                addr: start,
                len: 0,
                size: parent.size(),
            });
        }
        check_range(&parent, "slice", start, end - start, parent.erase_size())?;
        Ok(Self { parent, start, end })
    }

    pub fn parent(&self) -> &D {
        &self.parent
    }
}

impl<D: BlockDevice> BlockDevice for SlicingBlockDevice<D> {
    fn init(&mut self) -> BdResult<()> {
        self.parent.init()
    }

    fn deinit(&mut self) -> BdResult<()> {
        self.parent.deinit()
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()> {
        check_range(self, "read", addr, buf.len() as u64, 1)?;
        self.parent.read(self.start + addr, buf)
    }

    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()> {
        check_range(self, "program", addr, data.len() as u64, 1)?;
        self.parent.program(self.start + addr, data)
    }

    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()> {
        check_range(self, "erase", addr, size, 1)?;
        self.parent.erase(self.start + addr, size)
    }

    fn sync(&mut self) -> BdResult<()> {
        self.parent.sync()
    }

    fn read_size(&self) -> u64 {
        self.parent.read_size()
    }

    fn program_size(&self) -> u64 {
        self.parent.program_size()
    }

    fn erase_size(&self) -> u64 {
        self.parent.erase_size()
    }

    fn erase_value(&self) -> Option<u8> {
        self.parent.erase_value()
    }

    fn size(&self) -> u64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{HeapBlockDevice, SharedBlockDevice};

    #[test]
    fn test_slices_translate_addresses() {
        let shared = SharedBlockDevice::new(HeapBlockDevice::new(8192, 1, 1, 4096));
        let mut low = SlicingBlockDevice::new(shared.clone(), 0, 4096).unwrap();
        let mut high = SlicingBlockDevice::new(shared.clone(), 4096, 8192).unwrap();

        low.program(0, b"low").unwrap();
        high.program(0, b"high").unwrap();

        let dev = shared.lock();
        assert_eq!(&dev.contents()[..3], b"low");
        assert_eq!(&dev.contents()[4096..4100], b"high");
    }

    #[test]
    fn test_slice_bounds_enforced() {
        let dev = HeapBlockDevice::new(8192, 1, 1, 4096);
        let mut slice = SlicingBlockDevice::new(dev, 0, 4096).unwrap();
        assert_eq!(slice.size(), 4096);
        assert!(matches!(
            slice.program(4094, b"spill"),
            Err(BlockDeviceError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_slice_must_be_erase_aligned() {
        let dev = HeapBlockDevice::new(8192, 1, 1, 4096);
        assert!(SlicingBlockDevice::new(dev, 100, 4096).is_err());
    }
}
