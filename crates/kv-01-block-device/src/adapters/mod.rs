//! # Device Adapters
//!
//! Concrete `BlockDevice` implementations.
//!
//! ## Modules
//!
//! - `heap`: RAM-backed device (tests, scratch stores)
//! - `flash_sim`: flash semantics and power-cut injection over any device
//! - `slicing`: a sub-range of a parent device
//! - `shared`: cloneable handle sharing one device between several owners
//! - `file`: image-file device guarded by a process lock

mod flash_sim;
mod heap;
mod shared;
mod slicing;

#[cfg(feature = "file")]
mod file;
#[cfg(feature = "file")]
mod lock;

pub use flash_sim::FlashSimBlockDevice;
pub use heap::HeapBlockDevice;
pub use shared::SharedBlockDevice;
pub use slicing::SlicingBlockDevice;

#[cfg(feature = "file")]
pub use file::FileBlockDevice;
#[cfg(feature = "file")]
pub use lock::{ImageLock, LockError};
