//! Stratum - sharded, persistent key-value store served over HTTP.
//!
//! Stratum is a single-binary key-value store. The keyspace is hash-partitioned
//! across a set of shards; each shard owns an in-memory index fronted by a
//! bounded LRU cache and made durable by an append-only operation log that is
//! replayed on startup.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Adapter                            │
//! │          GET/PUT/DELETE /api/v1/kv/keys │ /health │ /stats      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Shard Router                            │
//! │              (stable hash of key → owning partition)            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Partition Workers                          │
//! │          one task per partition │ serialized command queue      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Partition Store                           │
//! │              Index │ LRU Cache │ Append-only Log                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Main runtime orchestration
//! - [`core::error`] - Error types
//!
//! ## Storage
//! - [`storage::cache`] - Bounded LRU cache
//! - [`storage::log`] - Append-only partition log and replay
//! - [`storage::partition`] - Per-partition store (index + cache + log)
//!
//! ## Engine
//! - [`engine`] - Partition set lifecycle and fan-out
//! - [`engine::router`] - Key-to-partition routing and dispatch
//! - [`engine::worker`] - Per-partition command loop
//!
//! ## HTTP
//! - [`http`] - axum adapter over the engine
//! - [`http::encoding`] - JSON escaping and URL encoding helpers
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - **DURABLE-ACK**: a mutation is acknowledged only after its log record
//!   has been flushed
//! - **OWNERSHIP**: a key lives in exactly one partition, chosen by a hash
//!   that is stable across restarts
//! - **CACHE-COHERENCE**: every cached entry is present in its partition's
//!   index with the identical value
//! - **SERIAL-PARTITION**: all operations on one partition execute on a
//!   single task, in arrival order

// Core infrastructure
pub mod core;

// Storage layer
pub mod storage;

// Partition engine
pub mod engine;

// HTTP adapter
pub mod http;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, runtime};
pub use engine::{router, worker};
pub use storage::{cache, log, partition};
