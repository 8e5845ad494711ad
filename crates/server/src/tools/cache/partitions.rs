//! cache_partitions tool implementation.
//!
//! Lists partitions with entry counts and whether the current router keeps
//! them.

use eus_offline_client::RouterState;
use eus_offline_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::host::Host;

/// Parameters for the cache_partitions tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePartitionsParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entry_count: u64,
    pub created_at: String,
    /// In the current version's allow-list.
    pub allowed: bool,
}

/// Output from the cache_partitions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePartitionsOutput {
    pub version: String,
    /// Version recorded by the last completed install.
    pub registered_version: Option<String>,
    pub state: RouterState,
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_partitions tool.
pub async fn partitions_impl(host: &Host, _params: CachePartitionsParams) -> Result<CallToolResult, McpError> {
    let names = &host.router.config().partitions;
    let partitions = host
        .db
        .list_partitions()
        .await?
        .into_iter()
        .map(|info| PartitionSummary {
            allowed: names.is_allowed(&info.name),
            name: info.name,
            entry_count: info.entry_count,
            created_at: info.created_at,
        })
        .collect();

    let output = CachePartitionsOutput {
        version: host.router.config().version.clone(),
        registered_version: host.db.registered_version().await?,
        state: host.router.state(),
        partitions,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::active_host;

    #[tokio::test]
    async fn test_lists_partitions_with_allow_flag() {
        let (host, _network) = active_host().await;
        host.db.open_partition("eus-static-v0").await.unwrap();

        let result = partitions_impl(&host, CachePartitionsParams::default()).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CachePartitionsOutput = serde_json::from_str(text).unwrap();

        assert_eq!(output.version, "v1");
        assert_eq!(output.registered_version.as_deref(), Some("v1"));
        assert_eq!(output.state, RouterState::Active);

        let static_v1 = output.partitions.iter().find(|p| p.name == "eus-static-v1").unwrap();
        assert!(static_v1.allowed);
        assert_eq!(static_v1.entry_count, 3);

        let stale = output.partitions.iter().find(|p| p.name == "eus-static-v0").unwrap();
        assert!(!stale.allowed);
    }
}
