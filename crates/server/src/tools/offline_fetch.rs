//! offline_fetch tool implementation.
//!
//! Sends a request through the offline router. Intercepted requests are
//! answered by the router's strategy; everything else goes straight to the
//! network.

use eus_offline_client::fetch::resolve;
use eus_offline_client::{ResponseSource, RouteClass, RouteOutcome};
use eus_offline_core::{Error, Request};
use http::Method;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::host::Host;

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    pub method: String,
    pub status: u16,
    /// Whether the router handled the request.
    pub intercepted: bool,
    /// Route class when intercepted.
    pub class: Option<RouteClass>,
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(host: &Host, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url must not be empty".into()).into());
    }

    let url = resolve(&host.router.config().origin, &params.url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let request = Request::new(method, url);

    let (class, source, response) = match host.router.on_request(&request).await {
        RouteOutcome::Respond { class, source, response } => (Some(class), source, response),
        RouteOutcome::PassThrough => {
            let response = host.router.network().fetch(&request).await?;
            (None, ResponseSource::Network, response)
        }
    };

    let output = OfflineFetchOutput {
        url: request.url.to_string(),
        method: request.method.to_string(),
        status: response.status.as_u16(),
        intercepted: class.is_some(),
        class,
        source,
        content_type: response.content_type().map(str::to_string),
        headers: response.header_pairs(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
