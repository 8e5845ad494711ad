//! cache_get tool implementation.
//!
//! Reads one stored entry from a partition.

use eus_offline_client::fetch::resolve;
use eus_offline_core::{Error, Request};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::host::Host;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Partition name, e.g. `eus-api-v1`.
    pub partition: String,

    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub partition: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(host: &Host, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.partition.trim().is_empty() {
        return Err(Error::InvalidInput("partition must not be empty".into()).into());
    }
    let url = resolve(&host.router.config().origin, &params.url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key = Request::get(url);

    let entry = host
        .db
        .get_entry(&params.partition, key.cache_key())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {}", key.cache_key(), params.partition)))?;

    let output = CacheGetOutput {
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        partition: entry.partition,
        url: entry.url,
        status_code: entry.status_code,
        headers: entry.headers,
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::active_host;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (host, _network) = active_host().await;
        let params = CacheGetParams { partition: "eus-api-v1".into(), url: "/api/nothing".into() };

        let result = get_impl(&host, params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_precached_shell() {
        let (host, _network) = active_host().await;
        let params = CacheGetParams { partition: "eus-static-v1".into(), url: "/index.html#top".into() };

        let result = get_impl(&host, params).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CacheGetOutput = serde_json::from_str(text).unwrap();

        assert_eq!(output.url, "https://app.example/index.html");
        assert_eq!(output.status_code, 200);
        assert_eq!(output.body, "<html>/index.html</html>");
    }

    #[tokio::test]
    async fn test_get_impl_rejects_empty_partition() {
        let (host, _network) = active_host().await;
        let params = CacheGetParams { partition: " ".into(), url: "/".into() };
        assert!(get_impl(&host, params).await.is_err());
    }
}
