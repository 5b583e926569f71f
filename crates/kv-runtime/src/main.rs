//! # KV Runtime
//!
//! Entry point: configure logging, load configuration, open the device
//! and print each walk-through's transcript.

use anyhow::{Context, Result};
use kv_runtime::{run_walkthroughs, RuntimeConfig, StoreContainer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = RuntimeConfig::load().context("Failed to load configuration")?;
    if config.security.strict {
        config
            .validate_for_production()
            .context("Refusing to start in strict mode")?;
    } else if config.validate_for_production().is_err() {
        warn!("Secure partition uses the all-zero device key; set KV_DEVICE_KEY");
    }

    match &config.storage.image {
        Some(path) => info!("Backing device: image {}", path.display()),
        None => info!("Backing device: in-memory heap"),
    }

    let container = StoreContainer::open(config).context("Failed to open backing device")?;
    let transcripts = run_walkthroughs(&container).context("Walk-through failed")?;
    for transcript in transcripts {
        println!("{}", transcript);
    }

    Ok(())
}
