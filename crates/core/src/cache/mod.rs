//! SQLite-backed partitioned response cache.
//!
//! This module provides persistent, named cache partitions using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Open-or-create partitions keyed by name
//! - URL-keyed entries with UPSERT semantics
//! - Atomic bulk population for precaching
//! - Whole-partition clear and delete (cascading to entries)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod migrations;
pub mod partitions;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
pub use partitions::PartitionInfo;
pub use storage::CacheStorage;
