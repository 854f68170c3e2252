//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

use std::path::Path;
use stratum::core::config::Config;
use tempfile::TempDir;

/// Create a temporary directory for test data.
pub fn temp_data_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp directory")
}

/// Build a config rooted at the given data directory.
pub fn test_config(data_dir: &Path, partitions: usize, cache_size: usize) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_string_lossy().into_owned();
    config.storage.partitions = partitions;
    config.storage.cache_size = cache_size;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_valid() {
        let dir = temp_data_dir();
        let config = test_config(dir.path(), 2, 16);
        config.validate().expect("test config should validate");
        assert_eq!(config.partition_count(), 2);
    }
}
