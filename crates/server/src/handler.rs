//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::host::Host;
use crate::tools::cache::{
    CacheGetParams, CachePartitionsParams, CachePurgeParams, get_impl, partitions_impl, purge_impl,
};
use crate::tools::{OfflineFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for eus-offline.
#[derive(Clone)]
pub struct OfflineServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OfflineServer {
    /// Create a new server handler over a running host.
    pub fn new(host: Arc<Host>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    /// Send a request through the offline router.
    #[tool(
        description = "Fetch a URL through the offline cache router. GET requests for static assets, API calls and pages are served from network or cache depending on connectivity; other methods go straight to the network."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Read one cached entry from a partition by URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.host, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts and whether the current version keeps them.")]
    async fn cache_partitions(&self, params: Parameters<CachePartitionsParams>) -> Result<CallToolResult, McpError> {
        partitions_impl(&self.host, params.0).await
    }

    /// Delete one entry, or all entries, from a partition.
    #[tool(description = "Delete a cached entry by URL, or every entry in a partition when no URL is given.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.host, params.0).await
    }
}

impl ServerHandler for OfflineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "eus-offline".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
