//! Caching strategies.
//!
//! One network attempt per request, no retries. Responses with status
//! exactly 200 are cloned into a partition on a background task; the
//! original goes straight back to the caller.

use std::sync::Arc;

use eus_offline_core::{Error, Request, Response};

use super::{OfflineRouter, ResponseSource, RouteClass, RouteOutcome};

impl OfflineRouter {
    /// Serve from the static partition; on a miss fetch and store.
    pub(super) async fn cache_first(&self, request: &Request) -> RouteOutcome {
        let partition = &self.config.partitions.static_assets;
        let class = RouteClass::StaticAsset;

        if let Some(response) = self.lookup(partition, request.cache_key()).await {
            return RouteOutcome::Respond { class, source: ResponseSource::Cache, response };
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_in_background(partition, request.cache_key(), &response);
                RouteOutcome::Respond { class, source: ResponseSource::Network, response }
            }
            Err(e) => {
                log_fetch_failure(request, &e);
                RouteOutcome::Respond {
                    class,
                    source: ResponseSource::Synthetic,
                    response: Response::service_unavailable(),
                }
            }
        }
    }

    /// Fetch; on failure serve the cached API response or the offline JSON.
    pub(super) async fn network_first_api(&self, request: &Request) -> RouteOutcome {
        let partition = &self.config.partitions.api;
        let class = RouteClass::Api;

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_in_background(partition, request.cache_key(), &response);
                RouteOutcome::Respond { class, source: ResponseSource::Network, response }
            }
            Err(e) => {
                log_fetch_failure(request, &e);
                match self.lookup(partition, request.cache_key()).await {
                    Some(response) => RouteOutcome::Respond { class, source: ResponseSource::Cache, response },
                    None => RouteOutcome::Respond {
                        class,
                        source: ResponseSource::Synthetic,
                        response: Response::offline_api(),
                    },
                }
            }
        }
    }

    /// Fetch; on failure serve the exact cached document, then the shell,
    /// then the offline page.
    pub(super) async fn network_first_document(&self, request: &Request) -> RouteOutcome {
        let partition = &self.config.partitions.static_assets;
        let class = RouteClass::Document;

        let err = match self.network.fetch(request).await {
            Ok(response) => {
                self.store_in_background(partition, request.cache_key(), &response);
                return RouteOutcome::Respond { class, source: ResponseSource::Network, response };
            }
            Err(e) => e,
        };

        log_fetch_failure(request, &err);
        if let Some(response) = self.lookup(partition, request.cache_key()).await {
            return RouteOutcome::Respond { class, source: ResponseSource::Cache, response };
        }
        if let Some(response) = self.lookup(partition, self.config.shell.as_str()).await {
            return RouteOutcome::Respond { class, source: ResponseSource::Shell, response };
        }

        tracing::warn!(url = %request.url, shell = %self.config.shell, "no cached shell for offline navigation");
        RouteOutcome::Respond { class, source: ResponseSource::Synthetic, response: Response::offline_document() }
    }

    /// Cache read where a storage failure counts as a miss.
    async fn lookup(&self, partition: &str, key: &str) -> Option<Response> {
        match self.storage.match_url(partition, key).await {
            Ok(hit) => {
                tracing::debug!(partition, key, hit = hit.is_some(), "cache lookup");
                hit
            }
            Err(e) => {
                tracing::warn!(partition, key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Store a clone of `response` unless its status is other than 200.
    fn store_in_background(&self, partition: &str, key: &str, response: &Response) {
        if !response.is_cacheable() {
            return;
        }

        let storage = Arc::clone(&self.storage);
        let partition = partition.to_string();
        let key = key.to_string();
        let response = response.clone();
        self.writes.spawn(async move {
            if let Err(e) = storage.put(&partition, &key, &response).await {
                tracing::warn!(partition = %partition, key = %key, error = %e, "cache write failed");
            }
        });
    }
}

/// Offline is the expected failure and stays at debug; anything else the
/// network reports is unexpected and surfaces as a warning.
fn log_fetch_failure(request: &Request, err: &Error) {
    if err.is_network() {
        tracing::debug!(url = %request.url, error = %err, "network unavailable, falling back to cache");
    } else {
        tracing::warn!(url = %request.url, error = %err, "fetch failed, falling back to cache");
    }
}
