//! # Image Process Locking
//!
//! Prevents two processes from opening the same device image.
//!
//! Without locking, two stores programming one image interleave their
//! append logs and both areas end up torn.
//!
//! The lock is an advisory `fs2` lock on a sidecar `<image>.lock` file
//! holding the owner's pid.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from image locking
#[derive(Debug, Error)]
pub enum LockError {
    /// Sidecar file could not be opened
    #[error("Cannot open image lock: {0}")]
    CreateFailed(io::Error),
    /// Image is already locked by another process
    #[error("Image already in use: {} (holder pid {:?})", .path.display(), .pid)]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },
    /// Owner pid could not be recorded
    #[error("Cannot record lock owner: {0}")]
    WriteFailed(io::Error),
}

/// Exclusive lock on a device image, released on drop.
///
#[derive(Debug)]
pub struct ImageLock {
    /// Held open for the lifetime of the lock
    file: File,
    path: PathBuf,
    pid: u32,
}

impl ImageLock {
    /// Acquire an exclusive lock on `<image>.lock`.
    ///
    /// # Errors
    ///
    /// `AlreadyLocked` while another handle holds the image.
    pub fn acquire(image: &Path) -> Result<Self, LockError> {
        let lock_path = Self::lock_path_for(image);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(LockError::CreateFailed)?;

        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked {
                pid: Self::read_existing_pid(&lock_path),
                path: lock_path,
            });
        }

        let pid = std::process::id();
        let mut file = file;
        file.set_len(0)
            .and_then(|()| writeln!(file, "{pid}"))
            .and_then(|()| file.sync_all())
            .map_err(LockError::WriteFailed)?;

        Ok(Self {
            file,
            path: lock_path,
            pid,
        })
    }

    /// Pid written into the sidecar
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path_for(image: &Path) -> PathBuf {
        let mut name = image.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for ImageLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sidecar_records_owner_pid() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("kv.img");

        let lock = ImageLock::acquire(&image).expect("Should acquire lock");
        assert!(lock.path().exists());
        let content = fs::read_to_string(lock.path()).unwrap();
        let stored_pid: u32 = content.trim().parse().unwrap();
        assert_eq!(stored_pid, std::process::id());
        assert_eq!(lock.pid(), stored_pid);
    }

    #[test]
    fn test_second_acquire_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("kv.img");

        let lock1 = ImageLock::acquire(&image).expect("First lock should succeed");
        let result = ImageLock::acquire(&image);
        assert!(matches!(result, Err(LockError::AlreadyLocked { .. })));

        drop(lock1);
    }

    #[test]
    fn test_drop_releases_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("kv.img");

        {
            let _lock = ImageLock::acquire(&image).expect("Should acquire");
        }

        let lock2 = ImageLock::acquire(&image).expect("Should acquire after release");
        drop(lock2);
    }
}
