//! Host wiring: builds the router and its collaborators from config.

use std::sync::Arc;

use eus_offline_client::{
    ActivationReport, FetchClient, FetchConfig, Network, OfflineRouter, RouterConfig, Scheduler, SessionRegistry,
    TokioScheduler,
};
use eus_offline_core::{AppConfig, CacheDb, Error};

/// Session id used for the single stdio client.
pub const STDIO_SESSION: &str = "stdio";

/// A running offline router with the cache it owns.
pub struct Host {
    pub db: CacheDb,
    pub router: Arc<OfflineRouter>,
    pub sessions: SessionRegistry,
}

impl Host {
    /// Open the cache, build the router on a real network and tokio timers,
    /// register the stdio session and bring the router to active.
    pub async fn start(config: &AppConfig) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let network = Arc::new(FetchClient::new(FetchConfig::from(config))?);
        let host = Self::assemble(config, db, network, Arc::new(TokioScheduler))?;

        host.sessions.register(STDIO_SESSION).await;
        let report = host.register().await?;
        tracing::info!(
            db = %config.db_path.display(),
            origin = %config.origin,
            deleted = ?report.deleted,
            claimed_sessions = report.claimed_sessions,
            "offline host ready"
        );
        Ok(host)
    }

    /// Wire the router without touching the network.
    pub fn assemble(
        config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, Error> {
        let sessions = SessionRegistry::new();
        let router = OfflineRouter::new(
            RouterConfig::from_app(config)?,
            Arc::new(db.clone()),
            network,
            Arc::new(sessions.clone()),
            scheduler,
        );
        Ok(Self { db, router: Arc::new(router), sessions })
    }

    /// Bring an assembled host to active.
    pub async fn register(&self) -> Result<ActivationReport, Error> {
        self.router.register().await
    }

    /// Let pending cache writes land, then retire the router.
    pub async fn shutdown(&self) {
        self.router.flush_writes().await;
        self.router.supersede();
        tracing::info!("offline host stopped");
    }
}
