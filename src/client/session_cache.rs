//! Per-cluster session cache
//!
//! Guarantees at most one live driver client per cluster id. The per-key
//! connect guard makes the single-session invariant explicit: concurrent
//! callers for the same cluster coalesce onto one in-flight authentication
//! instead of racing.

use crate::client::ClusterClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

fn cache_key(cluster_id: &str) -> String {
    cluster_id.to_ascii_lowercase()
}

/// Keyed store of connected driver clients
#[derive(Default)]
pub struct ClientSessionCache {
    sessions: RwLock<HashMap<String, Arc<dyn ClusterClient>>>,
    connect_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ClientSessionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the connect guard for a cluster.
    ///
    /// Hold the returned guard across the lookup-then-connect sequence; a
    /// second caller for the same cluster waits here and then finds the
    /// session the first caller cached.
    pub async fn begin_connect(&self, cluster_id: &str) -> OwnedMutexGuard<()> {
        let guard = {
            let mut guards = self.connect_guards.lock().await;
            guards
                .entry(cache_key(cluster_id))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        guard.lock_owned().await
    }

    /// Cached session for a cluster, if any
    pub async fn get(&self, cluster_id: &str) -> Option<Arc<dyn ClusterClient>> {
        self.sessions
            .read()
            .await
            .get(&cache_key(cluster_id))
            .cloned()
    }

    /// Whether a session exists for the cluster
    pub async fn exists(&self, cluster_id: &str) -> bool {
        self.sessions
            .read()
            .await
            .contains_key(&cache_key(cluster_id))
    }

    /// Store the session for a cluster, replacing any prior entry
    pub async fn insert(&self, cluster_id: &str, client: Arc<dyn ClusterClient>) {
        debug!("Caching session for cluster {cluster_id}");
        self.sessions
            .write()
            .await
            .insert(cache_key(cluster_id), client);
    }

    /// Tear down and remove the session for a cluster; no-op when absent
    pub async fn delete(&self, cluster_id: &str) {
        let removed = self.sessions.write().await.remove(&cache_key(cluster_id));
        if let Some(client) = removed {
            debug!("Tearing down session for cluster {cluster_id}");
            if let Err(e) = client.disconnect().await {
                warn!("Session teardown for cluster {cluster_id} reported: {e}");
            }
        }
    }
}
