//! Request classification.
//!
//! First match wins: method, then static asset, then API, then document.

use eus_offline_core::Request;
use serde::{Deserialize, Serialize};

use super::RouterConfig;

/// Which strategy a request is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Not a GET; never intercepted.
    Bypass,
    /// Cache-first against the static partition.
    StaticAsset,
    /// Network-first with API partition fallback.
    Api,
    /// Network-first with shell document fallback.
    Document,
}

impl RouterConfig {
    pub fn classify(&self, request: &Request) -> RouteClass {
        if !request.is_get() {
            return RouteClass::Bypass;
        }

        let path = request.url.path();

        if self.static_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || extension(path).is_some_and(|ext| self.static_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        {
            return RouteClass::StaticAsset;
        }

        if self.api_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || request.url.host_str().is_some_and(|host| host.contains("api"))
        {
            return RouteClass::Api;
        }

        RouteClass::Document
    }
}

/// Extension of the last path segment, if it has one.
fn extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
