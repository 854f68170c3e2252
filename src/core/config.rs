//! Configuration parsing and validation.
//!
//! Stratum configuration is loaded from TOML files with CLI overrides. When no
//! config file is given, the built-in defaults match the classic deployment:
//! port 8080 on 127.0.0.1, data under /tmp/kv_store, 1000 cache entries per
//! partition.

use crate::storage::log::SyncMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Stratum configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage and partitioning configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// Storage and partitioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the partition logs. Created recursively if absent.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// LRU cache capacity per partition, in entries.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Number of partitions. 0 means one partition per available CPU core.
    ///
    /// Changing this between restarts over the same data_dir is unsafe: keys
    /// would migrate partitions while their history stays in the old logs.
    #[serde(default)]
    pub partitions: usize,

    /// Bound of each partition's command queue.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Log durability mode: "flush" (write + flush per mutation) or "fsync"
    /// (additionally fsync per mutation).
    #[serde(default = "default_sync_mode")]
    pub sync_mode: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_size: default_cache_size(),
            partitions: 0,
            queue_depth: default_queue_depth(),
            sync_mode: default_sync_mode(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

// Default value functions

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_data_dir() -> String {
    "/tmp/kv_store".to_string()
}

fn default_cache_size() -> usize {
    1000
}

fn default_queue_depth() -> usize {
    1024
}

fn default_sync_mode() -> String {
    "flush".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Upper bound on configured partitions; one worker task is spawned per
/// partition.
const MAX_PARTITIONS: usize = 1024;

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(ref bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(ref data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir.clone();
        }
        if let Some(cache_size) = overrides.cache_size {
            self.storage.cache_size = cache_size;
        }
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be > 0");
        }

        if self.storage.cache_size == 0 {
            anyhow::bail!("storage.cache_size must be > 0");
        }

        if self.storage.queue_depth == 0 {
            anyhow::bail!("storage.queue_depth must be > 0");
        }

        if self.storage.partitions > MAX_PARTITIONS {
            anyhow::bail!(
                "storage.partitions must be <= {}, got: {}",
                MAX_PARTITIONS,
                self.storage.partitions
            );
        }

        if self.storage.sync_mode != "flush" && self.storage.sync_mode != "fsync" {
            anyhow::bail!(
                "storage.sync_mode must be 'flush' or 'fsync', got: {}",
                self.storage.sync_mode
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }

        Ok(())
    }

    /// Resolve the partition count: the configured value, or one partition
    /// per available CPU core when set to 0.
    pub fn partition_count(&self) -> usize {
        if self.storage.partitions > 0 {
            self.storage.partitions
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Resolve the log durability mode. Call after [`Config::validate`].
    pub fn sync_mode(&self) -> SyncMode {
        match self.storage.sync_mode.as_str() {
            "fsync" => SyncMode::Fsync,
            _ => SyncMode::Flush,
        }
    }

    /// The HTTP listen address in `host:port` form.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override HTTP port.
    pub port: Option<u16>,
    /// Override bind address.
    pub bind_address: Option<String>,
    /// Override data directory.
    pub data_dir: Option<String>,
    /// Override per-partition cache size.
    pub cache_size: Option<usize>,
    /// Override log level.
    pub log_level: Option<String>,
}
