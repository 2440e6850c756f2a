//! Mock collaborators for unit and integration tests
//!
//! Available to integration tests through the `test-utils` feature.

use crate::auth::{BrokerSession, ResolvedAuth, TokenBroker};
use crate::client::{ClientFactory, ClusterClient};
use crate::error::{DocDbError, Result};
use crate::prompt::{CredentialPrompter, PromptedCredentials};
use crate::store::{ConnectionStore, StoredConnectionRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory cluster client that records lifecycle calls
pub struct MockClusterClient {
    connected: AtomicBool,
    disconnect_calls: AtomicUsize,
    databases: Vec<String>,
}

impl MockClusterClient {
    pub fn new(databases: Vec<String>) -> Self {
        Self {
            connected: AtomicBool::new(true),
            disconnect_calls: AtomicUsize::new(0),
            databases,
        }
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn is_connected(&self) -> Result<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.databases.clone())
    }

    async fn list_collections(&self, _database: &str) -> Result<Vec<String>> {
        Ok(vec!["collection1".to_string()])
    }
}

/// Factory that counts authentications and can be told to fail
#[derive(Default)]
pub struct MockClientFactory {
    create_calls: AtomicUsize,
    fail_with: RwLock<Option<String>>,
    last_auth: RwLock<Option<ResolvedAuth>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent create attempt fail with an authentication error
    pub async fn fail_authentication(&self, message: &str) {
        *self.fail_with.write().await = Some(message.to_string());
    }

    /// Number of create attempts so far
    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Auth material from the most recent create attempt
    pub async fn last_resolved_auth(&self) -> Option<ResolvedAuth> {
        self.last_auth.read().await.clone()
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn create_client(&self, auth: &ResolvedAuth) -> Result<Arc<dyn ClusterClient>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_auth.write().await = Some(auth.clone());

        if let Some(message) = self.fail_with.read().await.clone() {
            return Err(DocDbError::authentication(message));
        }
        Ok(Arc::new(MockClusterClient::new(vec![
            "admin".to_string(),
            "app".to_string(),
        ])))
    }
}

/// In-memory connection-record store that logs saves
#[derive(Default)]
pub struct MockConnectionStore {
    records: RwLock<HashMap<String, StoredConnectionRecord>>,
    saved: RwLock<Vec<StoredConnectionRecord>>,
}

impl MockConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_record(&self, record: StoredConnectionRecord) {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    /// Records written back through `save_record`, in order
    pub async fn saved_records(&self) -> Vec<StoredConnectionRecord> {
        self.saved.read().await.clone()
    }
}

#[async_trait]
impl ConnectionStore for MockConnectionStore {
    async fn get_record(&self, cluster_id: &str) -> Result<Option<StoredConnectionRecord>> {
        Ok(self.records.read().await.get(cluster_id).cloned())
    }

    async fn save_record(&self, record: &StoredConnectionRecord) -> Result<()> {
        self.saved.write().await.push(record.clone());
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}

/// Prompter returning a fixed response; `None` simulates user cancellation
#[derive(Default)]
pub struct MockPrompter {
    response: RwLock<Option<PromptedCredentials>>,
    calls: AtomicUsize,
}

impl MockPrompter {
    /// Prompter whose every prompt is dismissed
    pub fn cancelled() -> Self {
        Self::default()
    }

    pub fn with_response(response: PromptedCredentials) -> Self {
        Self {
            response: RwLock::new(Some(response)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompter for MockPrompter {
    async fn prompt_credentials(
        &self,
        _cluster_id: &str,
        _connection_string: &str,
    ) -> Result<Option<PromptedCredentials>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.read().await.clone())
    }
}

/// Broker returning a fixed token; `None` simulates a failed sign-in
#[derive(Default)]
pub struct MockTokenBroker {
    token: Option<String>,
    calls: AtomicUsize,
}

impl MockTokenBroker {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Broker that never produces a session
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn acquire_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenBroker for MockTokenBroker {
    async fn acquire_session(
        &self,
        _scopes: &[String],
        _tenant_id: Option<&str>,
    ) -> Result<Option<BrokerSession>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.as_ref().map(|token| BrokerSession {
            access_token: token.clone(),
            expires_at: None,
        }))
    }
}
