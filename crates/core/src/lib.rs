//! Core types and shared functionality for eus-offline.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request/response types shared by the router and its hosts
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;

pub use cache::{CacheDb, CacheStorage, PartitionInfo, StoredEntry};
pub use config::{AppConfig, ConfigError, PartitionNames};
pub use error::Error;
pub use exchange::{OFFLINE_API_BODY, OFFLINE_DOCUMENT_BODY, Request, Response};
