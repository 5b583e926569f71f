//! # Shared Types Crate
//!
//! The key-value contract shared by every store in the workspace.
//!
//! ## Design Principles
//!
//! - **One contract, many engines**: the raw engine, the secure overlay and
//!   the global facade all speak [`KeyValueStore`].
//! - **Flags are data**: a store persists the caller's [`KvFlags`] unchanged,
//!   even the bits it does not enforce itself.
//! - **Snapshots, not cursors**: [`KvIterator`] owns the key list captured at
//!   open time and never borrows the store.

pub mod entities;
pub mod errors;
pub mod iterator;
pub mod store_trait;

pub use entities::*;
pub use errors::*;
pub use iterator::KvIterator;
pub use store_trait::{next_from_snapshot, KeyValueStore};
