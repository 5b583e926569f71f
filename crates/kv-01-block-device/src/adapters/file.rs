use super::lock::{ImageLock, LockError};
use crate::device::{check_range, BlockDevice};
use crate::errors::{BdResult, BlockDeviceError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const ERASE_VALUE: u8 = 0xFF;

/// Block device persisted in an image file.
///
/// The image is created (or extended) to `size` bytes of erase value on
/// open. An `ImageLock` is held for the device's lifetime.
#[derive(Debug)]
pub struct FileBlockDevice {
    file: File,
    path: PathBuf,
    size: u64,
    program_size: u64,
    erase_size: u64,
    _lock: ImageLock,
}

impl FileBlockDevice {
    /// Open or create the image at `path`.
    ///
    /// # Errors
    ///
    /// `Io` if the image cannot be opened or sized, or another process
    /// holds its lock.
    pub fn open<P: AsRef<Path>>(
        path: P,
        size: u64,
        program_size: u64,
        erase_size: u64,
    ) -> BdResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = ImageLock::acquire(&path)
            .map_err(|e: LockError| BlockDeviceError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let existing = file.metadata()?.len();
        if existing < size {
            file.seek(SeekFrom::Start(existing))?;
            file.write_all(&vec![ERASE_VALUE; (size - existing) as usize])?;
            file.sync_all()?;
            tracing::info!(
                "[kv-01] Image {} sized to {} bytes (was {})",
                path.display(),
                size,
                existing
            );
        } else {
            tracing::info!("[kv-01] Opened image {} ({} bytes)", path.display(), size);
        }

        Ok(Self {
            file,
            path,
            size,
            program_size: program_size.max(1),
            erase_size: erase_size.max(1),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileBlockDevice {
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> BdResult<()> {
        check_range(self, "read", addr, buf.len() as u64, 1)?;
        self.file.seek(SeekFrom::Start(addr))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn program(&mut self, addr: u64, data: &[u8]) -> BdResult<()> {
        check_range(self, "program", addr, data.len() as u64, self.program_size)?;
        self.file.seek(SeekFrom::Start(addr))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn erase(&mut self, addr: u64, size: u64) -> BdResult<()> {
        check_range(self, "erase", addr, size, self.erase_size)?;
        self.file.seek(SeekFrom::Start(addr))?;
        self.file.write_all(&vec![ERASE_VALUE; size as usize])?;
        Ok(())
    }

    fn sync(&mut self) -> BdResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn read_size(&self) -> u64 {
        1
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
        self.size
    }
}
