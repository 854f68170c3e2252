//! Start command implementation.

use crate::core::config::{Config, ConfigOverrides};
use crate::core::runtime::Runtime;
use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

/// Start the key-value server.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// HTTP server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// HTTP server bind address.
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Data directory for persistence.
    #[arg(long)]
    pub data_dir: Option<String>,

    /// LRU cache size per partition.
    #[arg(long)]
    pub cache_size: Option<usize>,
}

/// Initialize the tracing subscriber.
fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the start command: load config (file or defaults), apply CLI
/// overrides, and drive the runtime until shutdown.
pub async fn run_start(
    args: StartArgs,
    config_path: Option<&Path>,
    log_level: Option<&str>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let overrides = ConfigOverrides {
        port: args.port,
        bind_address: args.bind_address,
        data_dir: args.data_dir,
        cache_size: args.cache_size,
        log_level: log_level.map(str::to_string),
    };
    config.apply_overrides(&overrides);

    init_tracing(&config.telemetry.log_level);

    tracing::info!(
        port = config.server.port,
        bind_address = %config.server.bind_address,
        data_dir = %config.storage.data_dir,
        cache_size = config.storage.cache_size,
        partitions = config.partition_count(),
        "starting with configuration"
    );

    let mut runtime = Runtime::new(config)?;
    runtime.run().await
}
