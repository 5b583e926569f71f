use crate::device::{check_range, read_unaligned, BlockDevice};
use crate::errors::{BdResult, BlockDeviceError};

const DEFAULT_ERASE_VALUE: u8 = 0xFF;

/// Flash-semantics wrapper with power-cut injection.
///
/// - A program over any non-erased byte fails with `NotErased`.
/// - After `power_cut_after(n)`, the first `n` programs/erases succeed;
///   the next one lands only its first half (rounded down to the access
///   unit) and fails with `PowerLoss`, and every later operation fails
///   until `restore_power`.
#[derive(Debug)]
pub struct FlashSimBlockDevice<D> {
    inner: D,
    erase_value: u8,
    ops_until_cut: Option<u64>,
    powered: bool,
    programs: u64,
    erases: u64,
}

impl<D: BlockDevice> FlashSimBlockDevice<D> {
    pub fn new(inner: D) -> Self {
        let erase_value = inner.erase_value().unwrap_or(DEFAULT_ERASE_VALUE);
        Self {
            inner,
            erase_value,
            ops_until_cut: None,
            powered: true,
            programs: 0,
            erases: 0,
        }
    }

    /// Arm a power cut after `ops` more successful programs or erases.
    pub fn power_cut_after(&mut self, ops: u64) {
        self.ops_until_cut = Some(ops);
    }

    /// Power back on and disarm any pending cut.
    pub fn restore_power(&mut self) {
        self.powered = true;
        self.ops_until_cut = None;
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Programs issued since creation (successful or cut).
    pub fn program_count(&self) -> u64 {
        self.programs
    }

    /// Erases issued since creation (successful or cut).
    pub fn erase_count(&self) -> u64 {
        self.erases
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    fn ensure_powered(&self, op: &'static str) -> BdResult<()> {
        if self.powered {
            Ok(())
        } else {
            Err(BlockDeviceError::PowerLoss { op })
        }
    }

    /// Consume one unit of the cut budget. Returns true if this operation
    /// is the one that loses power.
    fn cut_now(&mut self) -> bool {
        match self.ops_until_cut {
            Some(0) => {
                self.powered = false;
                self.ops_until_cut = None;
                true
            }
            Some(n) => {
                self.ops_until_cut = Some(n - 1);
                false
            }
            None => false,
        }
    }

    fn fill_erased(&mut self, addr: u64, size: u64) -> BdResult<()> {
        self.inner.erase(addr, size)?;
        if self.inner.erase_value().is_none() {
            let fill = vec![self.erase_value; size as usize];
            self.inner.program(addr, &fill)?;
        }
        Ok(())
    }
}

impl<D: BlockDevice> BlockDevice for FlashSimBlockDevice<D> {
    fn init(&mut self) -> BdResult<()> {
        self.ensure_powered("init")?;
        self.inner.init()
    }

    fn deinit(&mut self) -> BdResult<()> {
        self.inner.deinit()
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()> {
        self.ensure_powered("read")?;
        self.inner.read(addr, buf)
    }

    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()> {
        self.ensure_powered("program")?;
        let unit = self.program_size();
        check_range(self, "program", addr, data.len() as u64, unit)?;

        let mut current = vec![0u8; data.len()];
        read_unaligned(&mut self.inner, addr, &mut current)?;
        if let Some(pos) = current.iter().position(|b| *b != self.erase_value) {
            return Err(BlockDeviceError::NotErased {
                addr: addr + pos as u64,
            });
        }

        self.programs += 1;
        if self.cut_now() {
            let cut = (data.len() as u64 / 2) / unit * unit;
            if cut > 0 {
                self.inner.program(addr, &data[..cut as usize])?;
            }
            return Err(BlockDeviceError::PowerLoss { op: "program" });
        }
        self.inner.program(addr, data)
    }

    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()> {
        self.ensure_powered("erase")?;
        let unit = self.erase_size();
        check_range(self, "erase", addr, size, unit)?;

        self.erases += 1;
        if self.cut_now() {
            let cut = (size / 2) / unit * unit;
            if cut > 0 {
                self.fill_erased(addr, cut)?;
            }
            return Err(BlockDeviceError::PowerLoss { op: "erase" });
        }
        self.fill_erased(addr, size)
    }

    fn sync(&mut self) -> BdResult<()> {
        self.ensure_powered("sync")?;
        self.inner.sync()
    }

    fn read_size(&self) -> u64 {
        self.inner.read_size()
    }

    fn program_size(&self) -> u64 {
        self.inner.program_size()
    }

    fn erase_size(&self) -> u64 {
        self.inner.erase_size()
    }

    fn erase_value(&self) -> Option<u8> {
        Some(self.erase_value)
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::HeapBlockDevice;

    fn flash() -> FlashSimBlockDevice<HeapBlockDevice> {
        FlashSimBlockDevice::new(HeapBlockDevice::new(4096, 1, 4, 1024))
    }

    #[test]
    fn test_program_requires_erase() {
        let mut dev = flash();
        dev.program(0, b"abcd").unwrap();
        let result = dev.program(0, b"efgh");
        assert_eq!(result, Err(BlockDeviceError::NotErased { addr: 0 }));

        dev.erase(0, 1024).unwrap();
        dev.program(0, b"efgh").unwrap();
    }

    #[test]
    fn test_power_cut_writes_half() {
        let mut dev = flash();
        dev.power_cut_after(1);
        dev.program(0, b"abcd").unwrap();

        let result = dev.program(4, b"12345678");
        assert_eq!(result, Err(BlockDeviceError::PowerLoss { op: "program" }));
        assert!(!dev.is_powered());
        assert_eq!(&dev.inner().contents()[4..12], b"1234\xFF\xFF\xFF\xFF");

        let mut out = [0u8; 4];
        assert!(dev.read(0, &mut out).is_err());

        dev.restore_power();
        dev.read(0, &mut out).unwrap();
        assert_eq!(&out, b"abcd");
        assert_eq!(dev.program_count(), 2);
    }

    #[test]
    fn test_power_cut_during_erase() {
        let mut dev = flash();
        dev.program(0, &[0u8; 2048]).unwrap();
        dev.power_cut_after(0);

        assert!(dev.erase(0, 2048).is_err());
        dev.restore_power();
        assert!(dev.inner().contents()[..1024].iter().all(|b| *b == 0xFF));
        assert!(dev.inner().contents()[1024..2048].iter().all(|b| *b == 0));
    }
}
