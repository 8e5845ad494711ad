//! MCP tool implementations.
//!
//! This module contains all tools exposed by the eus-offline server.

pub mod cache;
pub mod offline_fetch;

pub use offline_fetch::{OfflineFetchParams, fetch_impl};
