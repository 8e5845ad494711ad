//! Offline cache router.
//!
//! Intercepts outgoing GET requests, classifies them, and serves them
//! through one of three strategies:
//!
//! | class        | strategy                         | partition |
//! |--------------|----------------------------------|-----------|
//! | static asset | cache-first                      | static    |
//! | API call     | network-first, cached fallback   | api       |
//! | document     | network-first, shell fallback    | static    |
//!
//! ### Lifecycle
//! `Installing → Active → Superseded`. Install precaches the app shell,
//! activation purges partitions of other versions, claims client sessions
//! and starts the API sweep. Requests are only intercepted while active.
//!
//! ### Failure handling
//! `on_request` never fails. Network and storage errors are logged and
//! turned into a cached or synthetic response.

pub mod classify;
pub mod eviction;
pub mod schedule;
pub mod sessions;
mod strategy;
mod writes;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use eus_offline_core::{AppConfig, CacheStorage, Error, PartitionNames, Request, Response};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::{Network, resolve};
pub use classify::RouteClass;
use schedule::{ScheduledTask, Scheduler};
use sessions::ClientSessions;
use writes::BackgroundWrites;

/// Everything the router needs to know about its deployment.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Version tag; also encoded in the partition names.
    pub version: String,
    pub origin: Url,
    pub partitions: PartitionNames,
    /// Absolute URLs fetched into the static partition on install.
    pub precache: Vec<Url>,
    /// Cached document served for offline navigations that miss.
    pub shell: Url,
    pub static_prefixes: Vec<String>,
    pub static_extensions: Vec<String>,
    pub api_prefixes: Vec<String>,
    pub api_sweep_period: Duration,
}

impl RouterConfig {
    /// Derive router settings from application config, resolving manifest
    /// paths against the origin.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let join = |path: &str| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        let precache = config
            .precache_manifest
            .iter()
            .map(|path| join(path))
            .collect::<Result<Vec<_>, _>>()?;
        let shell = join(&config.shell_path)?;

        Ok(Self {
            version: config.cache_version.clone(),
            partitions: config.partition_names(),
            precache,
            shell,
            static_prefixes: config.static_prefixes.clone(),
            static_extensions: config.static_extensions.clone(),
            api_prefixes: config.api_prefixes.clone(),
            api_sweep_period: config.api_sweep_period(),
            origin,
        })
    }
}

/// Lifecycle state of a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouterState {
    Installing,
    Active,
    Superseded,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    /// Exact-URL hit in a partition.
    Cache,
    /// Shell document served in place of an uncached navigation.
    Shell,
    /// Built by the router because nothing else was available.
    Synthetic,
}

/// Result of routing one request.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// Not intercepted; the host sends the request itself.
    PassThrough,
    Respond { class: RouteClass, source: ResponseSource, response: Response },
}

impl RouteOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            RouteOutcome::PassThrough => None,
            RouteOutcome::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            RouteOutcome::PassThrough => None,
            RouteOutcome::Respond { source, .. } => Some(*source),
        }
    }
}

/// What activation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Partitions removed because their name is not in the allow-list.
    pub deleted: Vec<String>,
    pub claimed_sessions: usize,
}

#[derive(Debug)]
struct Lifecycle {
    state: RouterState,
    /// Install finished (or was found already done); activation may proceed
    /// without waiting for older sessions.
    installed: bool,
}

/// The offline cache router.
///
/// Shared across concurrent requests through `Arc`. Lifecycle state sits
/// behind a lock that is never held across an await point.
pub struct OfflineRouter {
    config: RouterConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    sessions: Arc<dyn ClientSessions>,
    scheduler: Arc<dyn Scheduler>,
    lifecycle: RwLock<Lifecycle>,
    sweep: Mutex<Option<ScheduledTask>>,
    writes: BackgroundWrites,
}

impl OfflineRouter {
    pub fn new(
        config: RouterConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
        sessions: Arc<dyn ClientSessions>, scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            config,
            storage,
            network,
            sessions,
            scheduler,
            lifecycle: RwLock::new(Lifecycle { state: RouterState::Installing, installed: false }),
            sweep: Mutex::new(None),
            writes: BackgroundWrites::default(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Network used for intercepted requests; hosts reuse it for
    /// pass-through traffic.
    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn state(&self) -> RouterState {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner).state
    }

    /// Precache the manifest into the static partition.
    ///
    /// All manifest URLs are fetched concurrently. If any of them fails or
    /// returns anything but 200 nothing is stored and the install fails.
    pub async fn on_install(&self) -> Result<(), Error> {
        self.expect_state(RouterState::Installing, "install")?;

        let partition = &self.config.partitions.static_assets;
        self.storage.open(partition).await?;

        let fetches = self.config.precache.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed(format!("{url}: {e}")))?;
            if !response.is_cacheable() {
                return Err(Error::PrecacheFailed(format!("{url}: status {}", response.status.as_u16())));
            }
            Ok((request.cache_key().to_string(), response))
        });
        let entries = try_join_all(fetches).await?;
        let precached = entries.len();

        self.storage.add_all(partition, entries).await?;
        self.storage.record_registration(&self.config.version).await?;
        self.lifecycle_mut().installed = true;

        tracing::info!(version = %self.config.version, precached, "router installed");
        Ok(())
    }

    /// Purge partitions of other versions, claim sessions, start the API
    /// sweep and begin intercepting requests.
    pub async fn on_activate(&self) -> Result<ActivationReport, Error> {
        self.expect_state(RouterState::Installing, "activate")?;
        if !self.lifecycle.read().unwrap_or_else(PoisonError::into_inner).installed {
            return Err(Error::InvalidState("activate before install completed".into()));
        }

        let mut deleted = Vec::new();
        for name in self.storage.partition_names().await? {
            if !self.config.partitions.is_allowed(&name) && self.storage.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }

        let claimed_sessions = self.sessions.claim(&self.config.version).await?;

        let sweep = eviction::schedule_sweep(
            self.scheduler.as_ref(),
            Arc::clone(&self.storage),
            self.config.partitions.api.clone(),
            self.config.api_sweep_period,
        );
        *self.sweep.lock().unwrap_or_else(PoisonError::into_inner) = Some(sweep);
        self.lifecycle_mut().state = RouterState::Active;

        tracing::info!(
            version = %self.config.version,
            deleted = deleted.len(),
            claimed_sessions,
            "router activated"
        );
        Ok(ActivationReport { deleted, claimed_sessions })
    }

    /// Install unless this version is already recorded as installed, then
    /// activate.
    pub async fn register(&self) -> Result<ActivationReport, Error> {
        let registered = self.storage.registered_version().await?;
        if registered.as_deref() == Some(self.config.version.as_str()) {
            tracing::info!(version = %self.config.version, "router already installed, skipping precache");
            self.lifecycle_mut().installed = true;
        } else {
            self.on_install().await?;
        }
        self.on_activate().await
    }

    /// Retire this router: stop the sweep and stop intercepting.
    pub fn supersede(&self) {
        if let Some(sweep) = self.sweep.lock().unwrap_or_else(PoisonError::into_inner).take() {
            sweep.cancel();
        }
        self.lifecycle_mut().state = RouterState::Superseded;
        tracing::info!(version = %self.config.version, "router superseded");
    }

    /// Route one request. Never fails.
    pub async fn on_request(&self, request: &Request) -> RouteOutcome {
        if self.state() != RouterState::Active {
            return RouteOutcome::PassThrough;
        }

        let class = self.config.classify(request);
        let outcome = match class {
            RouteClass::Bypass => RouteOutcome::PassThrough,
            RouteClass::StaticAsset => self.cache_first(request).await,
            RouteClass::Api => self.network_first_api(request).await,
            RouteClass::Document => self.network_first_document(request).await,
        };

        if let RouteOutcome::Respond { source, response, .. } = &outcome {
            tracing::debug!(
                url = %request.url,
                class = ?class,
                source = ?source,
                status = response.status.as_u16(),
                "routed request"
            );
        }
        outcome
    }

    /// Wait until every background cache write spawned so far has landed.
    pub async fn flush_writes(&self) {
        self.writes.flush().await;
    }

    /// Number of background cache writes not yet reaped.
    pub fn pending_writes(&self) -> usize {
        self.writes.pending()
    }

    fn expect_state(&self, expected: RouterState, event: &str) -> Result<(), Error> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("{event} in state {state:?}")))
        }
    }

    fn lifecycle_mut(&self) -> std::sync::RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }
}
