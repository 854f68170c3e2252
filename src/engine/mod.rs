//! Partition set lifecycle and fan-out.
//!
//! The engine owns the partition set: it constructs one
//! [`PartitionStore`](crate::storage::partition::PartitionStore) per
//! configured partition, starts them in parallel (each replaying its log),
//! pins each to a dedicated worker task, and hands out a
//! [`ShardRouter`](router::ShardRouter) for dispatch. Shutdown stops every
//! partition and runs to completion even when an individual stop misbehaves.

pub mod router;
pub mod worker;

use crate::core::config::Config;
use crate::core::error::KvResult;
use crate::engine::router::ShardRouter;
use crate::engine::worker::PartitionCommand;
use crate::storage::partition::PartitionStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Lifecycle owner of the partition set.
pub struct Engine {
    senders: Vec<mpsc::Sender<PartitionCommand>>,
    workers: Vec<JoinHandle<()>>,
    router: Arc<ShardRouter>,
}

impl Engine {
    /// Construct and start the partition set.
    ///
    /// Partitions replay their logs in parallel; a replay failure on any
    /// partition fails the whole startup.
    pub async fn start(config: &Config) -> Result<Self> {
        let partition_count = config.partition_count();
        let data_dir = PathBuf::from(&config.storage.data_dir);
        let sync_mode = config.sync_mode();

        tracing::info!(
            partitions = partition_count,
            data_dir = %data_dir.display(),
            cache_size = config.storage.cache_size,
            "starting storage engine"
        );

        let mut startups = Vec::with_capacity(partition_count);
        for partition_id in 0..partition_count {
            let mut store = PartitionStore::new(
                &data_dir,
                config.storage.cache_size,
                partition_id as u32,
                sync_mode,
            );
            startups.push(tokio::spawn(async move {
                let result = store.start().await;
                result.map(|()| store)
            }));
        }

        let mut stores = Vec::with_capacity(partition_count);
        for (partition_id, startup) in startups.into_iter().enumerate() {
            let store = match startup.await {
                Ok(Ok(store)) => store,
                Ok(Err(err)) => {
                    tracing::error!(
                        partition = partition_id,
                        error = %err,
                        "partition failed to start"
                    );
                    return Err(anyhow::Error::new(err)
                        .context(format!("failed to start partition {partition_id}")));
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("partition {partition_id} startup task failed")));
                }
            };
            tracing::debug!(
                partition = partition_id,
                entries = store.len(),
                "partition started"
            );
            stores.push(store);
        }

        let mut senders = Vec::with_capacity(partition_count);
        let mut workers = Vec::with_capacity(partition_count);
        for store in stores {
            let (tx, handle) = worker::spawn(store, config.storage.queue_depth);
            senders.push(tx);
            workers.push(handle);
        }

        let router = Arc::new(ShardRouter::new(senders.clone()));
        tracing::info!(partitions = partition_count, "storage engine started");

        Ok(Self {
            senders,
            workers,
            router,
        })
    }

    /// The dispatch capability over this engine's partitions.
    pub fn router(&self) -> Arc<ShardRouter> {
        Arc::clone(&self.router)
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.senders.len()
    }

    /// Snapshot keys from every partition concurrently, merged and sorted.
    pub async fn list_keys_all(&self) -> KvResult<Vec<Vec<u8>>> {
        self.router.list_keys_all().await
    }

    /// Stop every partition and wait for the workers to exit.
    ///
    /// Runs to completion even if individual partitions misbehave; failures
    /// are logged and skipped.
    pub async fn stop(&mut self) {
        tracing::info!("stopping storage engine");

        let mut pending = Vec::with_capacity(self.senders.len());
        for (partition_id, tx) in self.senders.iter().enumerate() {
            let (reply, rx) = oneshot::channel();
            if tx.send(PartitionCommand::Stop { reply }).await.is_err() {
                tracing::warn!(partition = partition_id, "partition worker already gone");
                continue;
            }
            pending.push((partition_id, rx));
        }

        for (partition_id, rx) in pending {
            if rx.await.is_err() {
                tracing::warn!(partition = partition_id, "partition stop reply dropped");
            }
        }

        for worker in self.workers.drain(..) {
            if let Err(err) = worker.await {
                tracing::warn!(error = %err, "partition worker task panicked");
            }
        }

        self.senders.clear();
        tracing::info!("storage engine stopped");
    }
}
