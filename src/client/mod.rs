//! Driver client seam and the per-cluster session cache
//!
//! The MongoDB wire protocol stays behind the [`ClusterClient`] trait; this
//! crate only manages which client exists for which cluster and when it is
//! torn down.

pub mod session_cache;

pub use session_cache::ClientSessionCache;

use crate::auth::ResolvedAuth;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A live, authenticated driver connection for one cluster
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Whether the underlying connection is still usable
    async fn is_connected(&self) -> Result<bool>;

    /// Tear down the underlying connection
    async fn disconnect(&self) -> Result<()>;

    /// List database names on the cluster
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// List collection names in one database
    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;
}

/// Creates connected driver clients from resolved auth material.
///
/// Implementations perform the actual driver handshake; failures surface as
/// authentication or connection errors and flow through the orchestrator's
/// cleanup path.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create_client(&self, auth: &ResolvedAuth) -> Result<Arc<dyn ClusterClient>>;
}
