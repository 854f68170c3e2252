//! Per-partition store: index, LRU cache, append-only log.
//!
//! A partition owns the authoritative state for its slice of the keyspace.
//! The index holds every live key; the cache fronts it for hot keys; the log
//! makes mutations durable. Cache and index are always mutated together,
//! before the log write, and a mutation whose log append fails is rolled
//! back so the in-memory state never claims durability it does not have.
//!
//! All methods assume exclusive access; the engine gives each partition to a
//! single worker task.

use crate::core::error::{KvError, KvResult, MAX_KEY_LEN};
use crate::storage::cache::LruCache;
use crate::storage::log::{decode_records, log_path, LogOp, PartitionLog, SyncMode};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reject empty keys and keys above [`MAX_KEY_LEN`] bytes.
pub fn validate_key(key: &[u8]) -> KvResult<()> {
    if key.is_empty() {
        return Err(KvError::EmptyKey);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(KvError::KeyTooLong { len: key.len() });
    }
    Ok(())
}

/// One logical KV partition.
pub struct PartitionStore {
    partition_id: u32,
    data_dir: PathBuf,
    index: HashMap<Vec<u8>, Bytes>,
    cache: LruCache,
    log: PartitionLog,
    started: bool,
}

impl PartitionStore {
    /// Create a stopped partition store. Call [`PartitionStore::start`]
    /// before issuing operations.
    pub fn new(data_dir: &Path, cache_size: usize, partition_id: u32, sync_mode: SyncMode) -> Self {
        Self {
            partition_id,
            data_dir: data_dir.to_path_buf(),
            index: HashMap::new(),
            cache: LruCache::new(cache_size),
            log: PartitionLog::new(log_path(data_dir, partition_id), sync_mode),
            started: false,
        }
    }

    /// Partition id within the engine.
    pub fn partition_id(&self) -> u32 {
        self.partition_id
    }

    /// Number of live keys in the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the partition holds no keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of cached entries. Diagnostics only.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cached keys in most-recently-used-first order. Diagnostics only.
    pub fn cache_keys(&self) -> Vec<Vec<u8>> {
        self.cache.keys()
    }

    /// Ensure the data directory exists, replay the log into the index, and
    /// open the log for append. Idempotent.
    pub async fn start(&mut self) -> KvResult<()> {
        if self.started {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.data_dir).await?;

        if let Some(buf) = self.log.read_existing().await? {
            let records = decode_records(&buf)?;
            for record in records {
                match record.op {
                    LogOp::Put => {
                        self.index.insert(record.key, record.value);
                    }
                    LogOp::Delete => {
                        self.index.remove(&record.key);
                    }
                }
            }
            tracing::debug!(
                partition = self.partition_id,
                entries = self.index.len(),
                "replayed partition log"
            );
        }

        self.log.open_append().await?;
        self.started = true;
        Ok(())
    }

    /// Flush the log and release the file handle. Errors are logged and
    /// swallowed; shutdown must not fail.
    pub async fn stop(&mut self) {
        if let Err(err) = self.log.close().await {
            tracing::warn!(
                partition = self.partition_id,
                error = %err,
                "error closing partition log during shutdown"
            );
        }
        self.started = false;
    }

    /// Look up a key: cache first, then index, populating the cache on an
    /// index hit.
    pub fn get(&mut self, key: &[u8]) -> KvResult<Option<Bytes>> {
        validate_key(key)?;

        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value));
        }

        match self.index.get(key) {
            Some(value) => {
                let value = value.clone();
                self.cache.put(key, value.clone());
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Install key → value. Acknowledged only after the log record has been
    /// flushed; on append failure the in-memory mutation is rolled back.
    pub async fn put(&mut self, key: &[u8], value: Bytes) -> KvResult<()> {
        validate_key(key)?;

        let previous = self.index.insert(key.to_vec(), value.clone());
        self.cache.put(key, value.clone());

        if let Err(err) = self.log.append(LogOp::Put, key, &value).await {
            match previous {
                Some(previous) => {
                    self.index.insert(key.to_vec(), previous);
                }
                None => {
                    self.index.remove(key);
                }
            }
            self.cache.remove(key);
            tracing::warn!(
                partition = self.partition_id,
                error = %err,
                "log append failed; put rolled back"
            );
            return Err(err);
        }
        Ok(())
    }

    /// Erase a key. Removing an absent key is not an error and still writes
    /// a DELETE record; on append failure the in-memory erase is rolled back
    /// (the cache entry stays evicted, which is always safe).
    pub async fn remove(&mut self, key: &[u8]) -> KvResult<()> {
        validate_key(key)?;

        let previous = self.index.remove(key);
        self.cache.remove(key);

        if let Err(err) = self.log.append(LogOp::Delete, key, b"").await {
            if let Some(previous) = previous {
                self.index.insert(key.to_vec(), previous);
            }
            tracing::warn!(
                partition = self.partition_id,
                error = %err,
                "log append failed; remove rolled back"
            );
            return Err(err);
        }
        Ok(())
    }

    /// Snapshot all live keys, sorted ascending by raw bytes.
    pub fn list_keys(&self) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self.index.keys().cloned().collect();
        keys.sort();
        keys
    }
}
