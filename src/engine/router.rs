//! Key-to-partition routing and dispatch.
//!
//! `shard_of` maps a key to the single partition that owns it:
//! `shard = xxhash64(key, SHARD_HASH_SEED) % partition_count`.
//!
//! The hash is seeded with a fixed constant so routing is identical across
//! restarts; the logs carry keys, not hashes, but a partition must rebuild
//! from a log whose keys still route to it. Changing the partition count
//! between restarts over the same data_dir breaks that and is a deployment
//! constraint, not a runtime check.

use crate::core::error::{KvError, KvResult};
use crate::engine::worker::PartitionCommand;
use bytes::Bytes;
use std::hash::Hasher;
use tokio::sync::{mpsc, oneshot};
use twox_hash::XxHash64;

/// Fixed routing seed. Never change this on a live data_dir.
const SHARD_HASH_SEED: u64 = 0;

/// Map a key to its owning partition index.
pub fn shard_of(key: &[u8], partition_count: usize) -> usize {
    debug_assert!(partition_count > 0);
    let mut hasher = XxHash64::with_seed(SHARD_HASH_SEED);
    hasher.write(key);
    (hasher.finish() % partition_count as u64) as usize
}

/// Dispatch capability over the partition set.
///
/// The router is stateless apart from the queue senders: it hashes a key,
/// submits the operation to the owning partition's queue, and awaits the
/// reply. Cloning is cheap; the HTTP adapter holds it behind an `Arc`.
pub struct ShardRouter {
    partitions: Vec<mpsc::Sender<PartitionCommand>>,
}

impl ShardRouter {
    /// Build a router over the partition command queues, indexed by
    /// partition id.
    pub fn new(partitions: Vec<mpsc::Sender<PartitionCommand>>) -> Self {
        Self { partitions }
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// The partition index owning `key`.
    pub fn shard_for(&self, key: &[u8]) -> usize {
        shard_of(key, self.partitions.len())
    }

    /// Fetch the value for a key from its owning partition.
    pub async fn get(&self, key: &[u8]) -> KvResult<Option<Bytes>> {
        let shard = self.shard_for(key);
        let (reply, rx) = oneshot::channel();
        self.dispatch(
            shard,
            PartitionCommand::Get {
                key: key.to_vec(),
                reply,
            },
        )
        .await?;
        self.await_reply(shard, rx).await?
    }

    /// Install key → value on its owning partition.
    pub async fn put(&self, key: &[u8], value: Bytes) -> KvResult<()> {
        let shard = self.shard_for(key);
        let (reply, rx) = oneshot::channel();
        self.dispatch(
            shard,
            PartitionCommand::Put {
                key: key.to_vec(),
                value,
                reply,
            },
        )
        .await?;
        self.await_reply(shard, rx).await?
    }

    /// Erase a key on its owning partition.
    pub async fn remove(&self, key: &[u8]) -> KvResult<()> {
        let shard = self.shard_for(key);
        let (reply, rx) = oneshot::channel();
        self.dispatch(
            shard,
            PartitionCommand::Remove {
                key: key.to_vec(),
                reply,
            },
        )
        .await?;
        self.await_reply(shard, rx).await?
    }

    /// Snapshot keys from every partition concurrently, merged and sorted
    /// ascending.
    ///
    /// This is a union of per-partition snapshots, not a global
    /// point-in-time snapshot; each key's presence reflects some moment
    /// during the call.
    pub async fn list_keys_all(&self) -> KvResult<Vec<Vec<u8>>> {
        let mut pending = Vec::with_capacity(self.partitions.len());
        for shard in 0..self.partitions.len() {
            let (reply, rx) = oneshot::channel();
            self.dispatch(shard, PartitionCommand::ListKeys { reply })
                .await?;
            pending.push((shard, rx));
        }

        let mut all_keys = Vec::new();
        for (shard, rx) in pending {
            let keys = rx
                .await
                .map_err(|_| Self::unavailable(shard))?;
            all_keys.extend(keys);
        }
        all_keys.sort();
        Ok(all_keys)
    }

    async fn dispatch(&self, shard: usize, command: PartitionCommand) -> KvResult<()> {
        self.partitions[shard]
            .send(command)
            .await
            .map_err(|_| Self::unavailable(shard))
    }

    async fn await_reply<T>(&self, shard: usize, rx: oneshot::Receiver<T>) -> KvResult<T> {
        rx.await.map_err(|_| Self::unavailable(shard))
    }

    fn unavailable(shard: usize) -> KvError {
        KvError::PartitionUnavailable {
            partition: shard as u32,
        }
    }
}
