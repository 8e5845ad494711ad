//! HTTP fetch pipeline behind the router's network seam.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Network contract
//! - Any HTTP status is a delivered response; the router decides what to
//!   cache. Only transport failures are errors.
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)

pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

use eus_offline_core::{AppConfig, Error, Request, Response};

/// Outbound network seam used by the router.
///
/// `fetch` resolves with whatever the origin returned and fails only when
/// no response could be obtained.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "eus-offline/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "eus-offline/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation, with timing.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The final URL after redirects
    pub final_url: reqwest::Url,
    /// Status, headers and body as delivered by the origin
    pub response: Response,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Send a request once, returning the origin's response and metadata.
    ///
    /// Respects redirect and byte limits. No retries.
    pub async fn execute(&self, request: &Request) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| classify_error(&e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { final_url, response: Response::new(status, headers, bytes), fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn classify_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.execute(request).await.map(|fetched| fetched.response)
    }
}
