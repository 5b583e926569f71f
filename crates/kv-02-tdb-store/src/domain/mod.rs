//! # Domain Layer
//!
//! Pure logic for the TDB store. Nothing here touches a device.
//!
//! ## Modules
//!
//! - `layout` - Area header and record codec, CRC verification
//! - `index` - RAM table of live keys
//! - `config` - `TdbConfig`
//! - `recovery` - `RecoveryReport` produced by `init`
//! - `metrics` - Compaction counters

pub mod config;
pub mod index;
pub mod layout;
pub mod metrics;
pub mod recovery;
