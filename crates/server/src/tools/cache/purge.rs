//! cache_purge tool implementation.
//!
//! Deletes one entry from a partition, or every entry in it.

use eus_offline_client::fetch::resolve;
use eus_offline_core::{Error, Request};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::host::Host;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition to purge.
    pub partition: String,

    /// Only delete the entry for this URL. Clears the whole partition when
    /// omitted.
    pub url: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(host: &Host, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.partition.trim().is_empty() {
        return Err(Error::InvalidInput("partition must not be empty".into()).into());
    }

    let deleted = match params.url {
        Some(url) => {
            let url = resolve(&host.router.config().origin, &url)
                .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
            let key = Request::get(url);
            u64::from(host.db.delete_entry(&params.partition, key.cache_key()).await?)
        }
        None => host.db.clear_partition(&params.partition).await?,
    };
    tracing::info!(partition = %params.partition, deleted, "purged cache entries");

    let output = CachePurgeOutput { deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
