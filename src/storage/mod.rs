//! Storage layer: per-partition index, LRU cache, and append-only log.

pub mod cache;
pub mod log;
pub mod partition;
