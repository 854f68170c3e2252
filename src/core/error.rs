//! Error types.
//!
//! Stratum splits errors into two layers: [`KvError`] is the domain error for
//! key-value operations (what the HTTP adapter maps to status codes), while
//! orchestration paths (config loading, startup, CLI) use `anyhow` with
//! context.
//!
//! A `get` on an absent key is not an error; it returns `Ok(None)`.

use thiserror::Error;

/// Maximum key length in bytes. Longer keys are rejected before any state
/// is touched.
pub const MAX_KEY_LEN: usize = 255;

/// Domain error for key-value operations.
#[derive(Debug, Error)]
pub enum KvError {
    /// Empty keys are rejected.
    #[error("empty key")]
    EmptyKey,

    /// Keys above [`MAX_KEY_LEN`] bytes are rejected.
    #[error("key length {len} exceeds {MAX_KEY_LEN} bytes")]
    KeyTooLong { len: usize },

    /// The partition log could not be created, written, or flushed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed non-tail record was found while replaying a partition log.
    ///
    /// Truncated tail records are tolerated (torn writes from a crash); a
    /// corrupt record in the middle of the log is fatal for the partition.
    #[error("corrupt log record at byte offset {offset}: {detail}")]
    Replay { offset: usize, detail: String },

    /// The target partition's command queue is closed (engine stopped or
    /// worker gone).
    #[error("partition {partition} is unavailable")]
    PartitionUnavailable { partition: u32 },
}

impl KvError {
    /// Check if this error is a key validation failure (HTTP 400).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyKey | Self::KeyTooLong { .. })
    }
}

/// Result type using KvError.
pub type KvResult<T> = Result<T, KvError>;
