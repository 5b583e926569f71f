//! # Block Device Layer (kv-01)
//!
//! The raw medium beneath every key-value store: a flat address space that
//! can be read, programmed and erased in device-defined units.
//!
//! ## Contract
//!
//! | Operation | Alignment | Notes |
//! |-----------|-----------|-------|
//! | `read` | `read_size` | any erased or programmed range |
//! | `program` | `program_size` | flash semantics: target must be erased |
//! | `erase` | `erase_size` | sets bytes to `erase_value` when known |
//!
//! ## Crate Structure
//!
//! - `device` - The `BlockDevice` port and alignment helpers
//! - `errors` - `BlockDeviceError` and its mapping to `KvError`
//! - `adapters/` - Heap, flash-simulation, slicing, shared and file devices
//!
//! ## Usage
//!
//! ```ignore
//! use kv_01_block_device::{HeapBlockDevice, SharedBlockDevice, SlicingBlockDevice};
//!
//! let flash = SharedBlockDevice::new(HeapBlockDevice::new(12 * 4096, 1, 1, 4096));
//! let data = SlicingBlockDevice::new(flash.clone(), 0, 8 * 4096)?;
//! let rbp = SlicingBlockDevice::new(flash, 8 * 4096, 12 * 4096)?;
//! ```

pub mod adapters;
pub mod device;
pub mod errors;

pub use adapters::{FlashSimBlockDevice, HeapBlockDevice, SharedBlockDevice, SlicingBlockDevice};
#[cfg(feature = "file")]
pub use adapters::{FileBlockDevice, ImageLock, LockError};
pub use device::{read_unaligned, BlockDevice};
pub use errors::{BdResult, BlockDeviceError};
