//! Request and response values exchanged between the router, the network
//! and the cache.
//!
//! Responses are cheap to clone: the body is a shared [`Bytes`] buffer, so a
//! response can be handed to the caller and to a background cache write at
//! the same time.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use url::Url;

/// Body returned for API requests that miss the cache while offline.
pub const OFFLINE_API_BODY: &str = r#"{"error":"Offline - No cached data available"}"#;

/// Body returned for documents that miss both the cache and the shell.
pub const OFFLINE_DOCUMENT_BODY: &str = "<!doctype html><html><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>Offline</h1><p>This page is not available offline.</p></body></html>";

/// An outgoing request as seen by the router.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    /// Build a request. The fragment is dropped since it never reaches the
    /// server and must not split cache keys.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, headers: HeaderMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Partition key for this request: the full URL.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }
}

/// A captured response: status, headers and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Synthetic 503 for API requests with no network and no cached entry.
    pub fn offline_api() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(StatusCode::SERVICE_UNAVAILABLE, headers, OFFLINE_API_BODY)
    }

    /// Synthetic 503 for documents with no network, no cached entry and no
    /// cached shell.
    pub fn offline_document() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        Self::new(StatusCode::SERVICE_UNAVAILABLE, headers, OFFLINE_DOCUMENT_BODY)
    }

    /// Bare 503 for static assets that are neither cached nor reachable.
    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, HeaderMap::new(), Bytes::new())
    }

    /// Only an exact 200 is ever written to a partition.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Header pairs in insertion order, skipping values that are not
    /// visible ASCII.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect()
    }

    /// Rebuild a header map from stored pairs. Invalid names or values are
    /// dropped.
    pub fn headers_from_pairs(pairs: &[(String, String)]) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_drops_fragment() {
        let url = Url::parse("https://app.example/dashboard#charts").unwrap();
        let request = Request::get(url);
        assert_eq!(request.cache_key(), "https://app.example/dashboard");
        assert!(request.is_get());
    }

    #[test]
    fn test_offline_api_response() {
        let response = Response::offline_api();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Offline - No cached data available"}));
    }

    #[test]
    fn test_offline_document_response() {
        let response = Response::offline_document();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.content_type().unwrap().starts_with("text/html"));
        assert!(!response.is_cacheable());
    }

    #[test]
    fn test_only_exact_ok_is_cacheable() {
        for (status, cacheable) in [
            (StatusCode::OK, true),
            (StatusCode::CREATED, false),
            (StatusCode::NO_CONTENT, false),
            (StatusCode::NOT_MODIFIED, false),
            (StatusCode::NOT_FOUND, false),
        ] {
            let response = Response::new(status, HeaderMap::new(), "x");
            assert_eq!(response.is_cacheable(), cacheable, "{status}");
        }
    }

    #[test]
    fn test_header_pairs_keep_multi_values() {
        let pairs = vec![
            ("content-type".to_string(), "text/css".to_string()),
            ("set-cookie".to_string(), "a=1".to_string()),
            ("set-cookie".to_string(), "b=2".to_string()),
            ("bad header".to_string(), "dropped".to_string()),
        ];
        let headers = Response::headers_from_pairs(&pairs);
        assert_eq!(headers.get_all("set-cookie").iter().count(), 2);
        assert!(!headers.contains_key("bad header"));

        let response = Response::new(StatusCode::OK, headers, "");
        assert_eq!(response.header_pairs().len(), 3);
    }
}
