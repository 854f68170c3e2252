//! Inspect command implementation.

use crate::storage::log::decode_records;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Inspect partition log files.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(subcommand)]
    pub command: InspectCommand,
}

/// Inspect subcommands.
#[derive(Subcommand, Debug)]
pub enum InspectCommand {
    /// Decode partition logs and print their records.
    Log {
        /// Partition log paths.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Run the inspect command.
pub fn run_inspect(args: InspectArgs) -> Result<()> {
    match args.command {
        InspectCommand::Log { paths } => {
            for path in paths {
                inspect_log(&path)?;
            }
        }
    }
    Ok(())
}

fn inspect_log(path: &Path) -> Result<()> {
    let buf =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records = decode_records(&buf)
        .with_context(|| format!("corrupt partition log {}", path.display()))?;

    println!("{}: {} records", path.display(), records.len());
    for record in &records {
        println!(
            "  {} {:<6} key={:?} value_len={}",
            record.timestamp_ms,
            record.op.to_string(),
            String::from_utf8_lossy(&record.key),
            record.value.len()
        );
    }
    Ok(())
}
