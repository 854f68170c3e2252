//! Stratum - unified CLI entrypoint.
//!
//! Usage:
//!   stratum start [--config config/stratum.toml] [--port 8080] [--data-dir /tmp/kv_store]
//!   stratum config validate --config config/stratum.toml
//!   stratum config show [--config config/stratum.toml]
//!   stratum inspect log <partition-log>...

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use stratum::cli::commands::{run_config, run_inspect, run_start};
use stratum::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.map(PathBuf::from);

    match cli.command {
        Commands::Start(args) => {
            run_start(args, config_path.as_deref(), cli.log_level.as_deref()).await
        }
        Commands::Config(args) => run_config(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}
