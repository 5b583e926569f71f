use crate::device::BlockDevice;
use crate::errors::BdResult;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable handle to one device.
///
/// Lets several slices (a data store and its rollback-protection store)
/// sit on the same physical medium, and lets tests reach the medium while
/// a store owns a handle. Every call takes the lock for its duration only.
#[derive(Debug)]
pub struct SharedBlockDevice<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> Clone for SharedBlockDevice<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: BlockDevice> SharedBlockDevice<D> {
    pub fn new(device: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Lock the underlying device.
    pub fn lock(&self) -> MutexGuard<'_, D> {
        self.inner.lock()
    }
}

impl<D: BlockDevice> BlockDevice for SharedBlockDevice<D> {
    fn init(&mut self) -> BdResult<()> {
        self.inner.lock().init()
    }

    fn deinit(&mut self) -> BdResult<()> {
        self.inner.lock().deinit()
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()> {
        self.inner.lock().read(addr, buf)
    }

    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()> {
        self.inner.lock().program(addr, data)
    }

    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()> {
        self.inner.lock().erase(addr, size)
    }

    fn sync(&mut self) -> BdResult<()> {
        self.inner.lock().sync()
    }

    fn read_size(&self) -> u64 {
        self.inner.lock().read_size()
    }

    fn program_size(&self) -> u64 {
        self.inner.lock().program_size()
    }

    fn erase_size(&self) -> u64 {
        self.inner.lock().erase_size()
    }

    fn erase_value(&self) -> Option<u8> {
        self.inner.lock().erase_value()
    }

    fn size(&self) -> u64 {
        self.inner.lock().size()
    }
}
