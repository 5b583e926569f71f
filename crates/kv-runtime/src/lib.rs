//! # KV Runtime
//!
//! Wires a block device into the stores and runs the walk-throughs.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`KV_CONFIG` file, then `KV_*` environment)
//! 2. Validate the device key when `security.strict` is set
//! 3. Open the backing device (image file or heap)
//! 4. Run the raw store and secure store walk-throughs
//! 5. Build the registry, `init_all`, run the global walk-through,
//!    `deinit_all`
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration, backing device and partition layout
//! - `walkthrough/` - Scripted sessions recorded as `Transcript`s

pub mod container;
pub mod walkthrough;

pub use container::{RuntimeConfig, StoreContainer};
pub use walkthrough::{global_walkthrough, store_walkthrough, Transcript};

/// Run every walk-through against `container`, in startup order.
pub fn run_walkthroughs(container: &StoreContainer) -> shared_types::KvResult<Vec<Transcript>> {
    let mut transcripts = Vec::new();

    let mut raw = container.raw_store()?;
    transcripts.push(store_walkthrough(&mut raw, "tdb"));
    drop(raw);

    let mut secure = container.secure_store()?;
    transcripts.push(store_walkthrough(&mut secure, "secure"));
    drop(secure);

    let registry = container.registry()?;
    registry.init_all()?;
    transcripts.push(global_walkthrough(&registry));
    registry.deinit_all()?;

    Ok(transcripts)
}
