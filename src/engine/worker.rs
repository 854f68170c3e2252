//! Per-partition command loop.
//!
//! Each partition is pinned to one task that owns its store exclusively.
//! Commands arrive over a bounded FIFO queue and execute strictly in
//! arrival order; the only suspension point inside an operation is the log
//! flush. This serialization is what replaces fine-grained locking and
//! guarantees ordering per key.

use crate::core::error::KvResult;
use crate::storage::partition::PartitionStore;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// One operation dispatched to a partition worker.
///
/// Every variant carries a oneshot reply channel. A dropped reply receiver
/// means the caller abandoned the operation; the work still runs to
/// completion and the send result is ignored.
#[derive(Debug)]
pub enum PartitionCommand {
    /// Look up a key.
    Get {
        key: Vec<u8>,
        reply: oneshot::Sender<KvResult<Option<Bytes>>>,
    },
    /// Install key → value.
    Put {
        key: Vec<u8>,
        value: Bytes,
        reply: oneshot::Sender<KvResult<()>>,
    },
    /// Erase a key.
    Remove {
        key: Vec<u8>,
        reply: oneshot::Sender<KvResult<()>>,
    },
    /// Snapshot all keys, sorted ascending.
    ListKeys {
        reply: oneshot::Sender<Vec<Vec<u8>>>,
    },
    /// Flush the log, release the file handle, and exit the worker.
    Stop { reply: oneshot::Sender<()> },
}

/// Spawn the worker task for a started partition store.
///
/// Returns the command queue sender and the task handle. The queue bound
/// provides backpressure: senders wait when the partition falls behind.
pub fn spawn(
    store: PartitionStore,
    queue_depth: usize,
) -> (mpsc::Sender<PartitionCommand>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(queue_depth);
    let handle = tokio::spawn(run(store, rx));
    (tx, handle)
}

async fn run(mut store: PartitionStore, mut rx: mpsc::Receiver<PartitionCommand>) {
    let partition = store.partition_id();

    loop {
        let Some(command) = rx.recv().await else {
            break;
        };

        match command {
            PartitionCommand::Get { key, reply } => {
                let _ = reply.send(store.get(&key));
            }
            PartitionCommand::Put { key, value, reply } => {
                let _ = reply.send(store.put(&key, value).await);
            }
            PartitionCommand::Remove { key, reply } => {
                let _ = reply.send(store.remove(&key).await);
            }
            PartitionCommand::ListKeys { reply } => {
                let _ = reply.send(store.list_keys());
            }
            PartitionCommand::Stop { reply } => {
                store.stop().await;
                let _ = reply.send(());
                tracing::debug!(partition, "partition worker stopped");
                return;
            }
        }
    }

    // All senders dropped without an explicit stop; release the log anyway.
    store.stop().await;
    tracing::debug!(partition, "partition worker stopped (queue closed)");
}
