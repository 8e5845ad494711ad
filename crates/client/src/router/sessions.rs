//! Client sessions controlled by the router.
//!
//! Activation claims every open session for the new router version so that
//! routing applies without a reload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eus_offline_core::Error;
use tokio::sync::RwLock;

/// Session control consumed by activation.
#[async_trait]
pub trait ClientSessions: Send + Sync {
    /// Put every open session under `version`. Returns how many sessions
    /// were claimed.
    async fn claim(&self, version: &str) -> Result<usize, Error>;
}

/// In-memory session registry.
///
/// Maps a session id to the router version controlling it, or `None` for a
/// session opened before any router was active.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session. Re-registering an id keeps its controller.
    pub async fn register(&self, id: impl Into<String>) {
        self.sessions.write().await.entry(id.into()).or_insert(None);
    }

    /// Close a session. Returns false if it was not open.
    pub async fn unregister(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Ids of all open sessions, sorted.
    pub async fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Router version controlling `id`, if any.
    pub async fn controller(&self, id: &str) -> Option<String> {
        self.sessions.read().await.get(id).cloned().flatten()
    }
}

#[async_trait]
impl ClientSessions for SessionRegistry {
    async fn claim(&self, version: &str) -> Result<usize, Error> {
        let mut sessions = self.sessions.write().await;
        for controller in sessions.values_mut() {
            *controller = Some(version.to_string());
        }
        tracing::debug!(version, claimed = sessions.len(), "claimed client sessions");
        Ok(sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_claim() {
        let registry = SessionRegistry::new();
        registry.register("dashboard-tab").await;
        registry.register("records-tab").await;
        assert_eq!(registry.controller("dashboard-tab").await, None);

        let claimed = registry.claim("v2").await.unwrap();
        assert_eq!(claimed, 2);
        assert_eq!(registry.controller("dashboard-tab").await, Some("v2".to_string()));
        assert_eq!(registry.controller("records-tab").await, Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_reregister_keeps_controller() {
        let registry = SessionRegistry::new();
        registry.register("tab").await;
        registry.claim("v1").await.unwrap();
        registry.register("tab").await;
        assert_eq!(registry.controller("tab").await, Some("v1".to_string()));
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = SessionRegistry::new();
        registry.register("tab").await;
        assert!(registry.unregister("tab").await);
        assert!(!registry.unregister("tab").await);
        assert!(registry.sessions().await.is_empty());
        assert_eq!(registry.claim("v1").await.unwrap(), 0);
    }
}
