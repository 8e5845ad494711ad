//! Test doubles for the router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eus_offline_core::{AppConfig, CacheDb, CacheStorage, Error, Request, Response};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};
use tokio::sync::Notify;
use url::Url;

use super::schedule::ManualScheduler;
use super::sessions::SessionRegistry;
use super::{OfflineRouter, RouterConfig};
use crate::fetch::{Network, resolve};

pub(crate) fn ok(content_type: &'static str, body: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    Response::new(StatusCode::OK, headers, body)
}

pub(crate) fn ok_json(body: &'static str) -> Response {
    ok("application/json", body)
}

pub(crate) fn ok_html(body: &'static str) -> Response {
    ok("text/html", body)
}

pub(crate) fn status(status: StatusCode) -> Response {
    Response::new(status, HeaderMap::new(), "")
}

/// Network double: canned responses per URL, offline and broken switches,
/// and call counters. Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    broken: AtomicBool,
    calls: AtomicUsize,
    calls_by_url: Mutex<HashMap<String, usize>>,
}

impl MockNetwork {
    pub(crate) fn serve(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Fail every fetch with an error that is not a connectivity failure.
    pub(crate) fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls_by_url.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_url
            .lock()
            .unwrap()
            .entry(request.cache_key().to_string())
            .or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput(format!("malformed request: {}", request.url)));
        }

        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.cache_key())
            .cloned()
            .unwrap_or_else(|| status(StatusCode::NOT_FOUND)))
    }
}

/// Storage whose `put` parks until [`GatedStorage::release`] is called.
/// Everything else goes straight to the wrapped database.
pub(crate) struct GatedStorage {
    inner: CacheDb,
    gate: Notify,
}

impl GatedStorage {
    pub(crate) fn new(inner: CacheDb) -> Self {
        Self { inner, gate: Notify::new() }
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl CacheStorage for GatedStorage {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        CacheStorage::open(&self.inner, partition).await
    }

    async fn add_all(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        self.inner.add_all(partition, entries).await
    }

    async fn match_url(&self, partition: &str, url: &str) -> Result<Option<Response>, Error> {
        self.inner.match_url(partition, url).await
    }

    async fn put(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.gate.notified().await;
        self.inner.put(partition, url, response).await
    }

    async fn delete(&self, partition: &str, url: &str) -> Result<bool, Error> {
        self.inner.delete(partition, url).await
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        self.inner.keys(partition).await
    }

    async fn clear(&self, partition: &str) -> Result<u64, Error> {
        self.inner.clear(partition).await
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.inner.partition_names().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        self.inner.delete_partition(partition).await
    }

    async fn registered_version(&self) -> Result<Option<String>, Error> {
        self.inner.registered_version().await
    }

    async fn record_registration(&self, version: &str) -> Result<(), Error> {
        self.inner.record_registration(version).await
    }
}

/// A router over an in-memory database, a mock network serving the default
/// manifest, and a manual scheduler.
pub(crate) struct Harness {
    pub(crate) router: Arc<OfflineRouter>,
    pub(crate) network: Arc<MockNetwork>,
    pub(crate) db: CacheDb,
    pub(crate) scheduler: Arc<ManualScheduler>,
    pub(crate) sessions: SessionRegistry,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        Self::with_storage(db.clone(), Arc::new(db))
    }

    /// Like [`Harness::new`], but the router writes through `storage`.
    /// `db` is kept for assertions.
    pub(crate) fn with_storage(db: CacheDb, storage: Arc<dyn CacheStorage>) -> Self {
        let network = Arc::new(MockNetwork::default());
        network.serve("http://localhost:3000/", ok_html("<html>root</html>"));
        network.serve("http://localhost:3000/index.html", ok_html("<html>shell</html>"));
        network.serve("http://localhost:3000/manifest.json", ok_json(r#"{"name":"EUS Platform"}"#));

        let scheduler = Arc::new(ManualScheduler::new());
        let sessions = SessionRegistry::new();
        let config = RouterConfig::from_app(&AppConfig::default()).unwrap();
        let router = Arc::new(OfflineRouter::new(
            config,
            storage,
            network.clone(),
            Arc::new(sessions.clone()),
            scheduler.clone(),
        ));

        Self { router, network, db, scheduler, sessions }
    }

    /// A harness whose router is installed and active.
    pub(crate) async fn active() -> Self {
        let harness = Self::new().await;
        harness.router.register().await.unwrap();
        harness
    }

    pub(crate) fn url(&self, target: &str) -> Url {
        resolve(&self.router.config().origin, target).unwrap()
    }

    pub(crate) fn get(&self, target: &str) -> Request {
        Request::get(self.url(target))
    }
}
