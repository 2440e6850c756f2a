//! Authentication orchestrator
//!
//! Drives the per-cluster connect flow:
//! Idle → Resolving → Prompting (optional) → Authenticating → Connected | Failed.
//!
//! The orchestrator is the single place that catches resolver and driver
//! errors, tears down cached state, and hands the caller a retryable failure.
//! On any failure the session entry is removed before the credential entry,
//! so no reader can observe a connected session without credentials.

use crate::auth::{self, TokenBroker};
use crate::client::{ClientFactory, ClientSessionCache, ClusterClient};
use crate::config::ConnectSettings;
use crate::connection_string::{has_supported_scheme, ConnectionString};
use crate::credentials::{
    AuthMethod, CredentialCache, EntraIdConfig, NativeAuthConfig,
};
use crate::error::{DocDbError, Result};
use crate::prompt::{CredentialPrompter, PromptedCredentials};
use crate::store::{ConnectionStore, StoredConnectionRecord};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a connect attempt that did not error
pub enum ConnectOutcome {
    /// Terminal success: the cached or freshly created session
    Connected(Arc<dyn ClusterClient>),

    /// The user dismissed a prompt; no side effects were performed
    Cancelled,
}

impl fmt::Debug for ConnectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectOutcome::Connected(_) => f.write_str("Connected"),
            ConnectOutcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}

enum Resolution {
    Ready,
    Cancelled,
}

/// Coordinates the credential cache, session cache, and host collaborators
pub struct ConnectionOrchestrator {
    credentials: Arc<CredentialCache>,
    sessions: Arc<ClientSessionCache>,
    store: Arc<dyn ConnectionStore>,
    prompter: Arc<dyn CredentialPrompter>,
    broker: Arc<dyn TokenBroker>,
    factory: Arc<dyn ClientFactory>,
    settings: ConnectSettings,
}

impl ConnectionOrchestrator {
    /// Create an orchestrator over explicitly injected caches and collaborators
    pub fn new(
        credentials: Arc<CredentialCache>,
        sessions: Arc<ClientSessionCache>,
        store: Arc<dyn ConnectionStore>,
        prompter: Arc<dyn CredentialPrompter>,
        broker: Arc<dyn TokenBroker>,
        factory: Arc<dyn ClientFactory>,
        settings: ConnectSettings,
    ) -> Self {
        Self {
            credentials,
            sessions,
            store,
            prompter,
            broker,
            factory,
            settings,
        }
    }

    /// Credential cache shared with this orchestrator
    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Session cache shared with this orchestrator
    pub fn sessions(&self) -> &Arc<ClientSessionCache> {
        &self.sessions
    }

    /// Resolve credentials and return a connected session for the cluster.
    ///
    /// Returns the cached session without reauthenticating when one exists.
    /// On failure, both the session and credential entries for the cluster
    /// are purged before the error propagates, leaving a clean retry.
    pub async fn authenticate_and_connect(&self, cluster_id: &str) -> Result<ConnectOutcome> {
        let attempt = Uuid::new_v4();

        // Per-key guard: concurrent callers coalesce onto one in-flight
        // authentication for the same cluster
        let _guard = self.sessions.begin_connect(cluster_id).await;

        if let Some(client) = self.sessions.get(cluster_id).await {
            debug!("[{attempt}] Reusing cached session for cluster {cluster_id}");
            return Ok(ConnectOutcome::Connected(client));
        }

        match self.connect_locked(cluster_id, attempt).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    "[{attempt}] Connect failed for cluster {cluster_id}, purging cached state: {e}"
                );
                // Session first, then credentials
                self.sessions.delete(cluster_id).await;
                self.credentials.delete_credentials(cluster_id).await;
                Err(e)
            }
        }
    }

    /// Tear down the session for a cluster, keeping its credentials
    pub async fn disconnect(&self, cluster_id: &str) {
        self.sessions.delete(cluster_id).await;
    }

    /// Tear down the session and forget the credentials for a cluster.
    ///
    /// Used by remove-connection and update-credentials commands; the next
    /// connect attempt resolves from scratch.
    pub async fn invalidate(&self, cluster_id: &str) {
        self.sessions.delete(cluster_id).await;
        self.credentials.delete_credentials(cluster_id).await;
    }

    async fn connect_locked(&self, cluster_id: &str, attempt: Uuid) -> Result<ConnectOutcome> {
        debug!("[{attempt}] Resolving credentials for cluster {cluster_id}");

        if !self.credentials.has_credentials(cluster_id).await {
            match self.resolve_credentials(cluster_id, attempt).await? {
                Resolution::Ready => {}
                Resolution::Cancelled => {
                    debug!("[{attempt}] Prompt dismissed for cluster {cluster_id}");
                    return Ok(ConnectOutcome::Cancelled);
                }
            }
        }

        debug!("[{attempt}] Authenticating cluster {cluster_id}");
        let record = self
            .credentials
            .get_credentials(cluster_id)
            .await
            .ok_or_else(|| {
                DocDbError::credentials(format!(
                    "No credentials cached for cluster {cluster_id}"
                ))
            })?;

        let resolved =
            auth::configure_auth(&record, self.broker.as_ref(), &self.settings).await?;
        let client = self.factory.create_client(&resolved).await?;
        self.sessions.insert(cluster_id, client.clone()).await;

        info!("[{attempt}] Connected to cluster {cluster_id}");
        Ok(ConnectOutcome::Connected(client))
    }

    /// Populate the credential cache from the stored record, prompting when
    /// the record alone cannot resolve.
    async fn resolve_credentials(&self, cluster_id: &str, attempt: Uuid) -> Result<Resolution> {
        let record = self
            .store
            .get_record(cluster_id)
            .await?
            .ok_or_else(|| {
                DocDbError::not_found(format!("No connection record for cluster {cluster_id}"))
            })?;

        // Configuration errors here happen before any cache mutation
        if !has_supported_scheme(&record.connection_string) {
            return Err(DocDbError::invalid_input(format!(
                "Connection string for cluster {cluster_id} must start with mongodb:// or mongodb+srv://"
            )));
        }
        let parsed = ConnectionString::parse(&record.connection_string)?;

        match record.auth_method {
            // A string that already resolves (username + password embedded)
            // skips the prompt even when no method was saved
            Some(AuthMethod::NativeAuth) | None
                if !parsed.username().is_empty() && parsed.password().is_some() =>
            {
                self.cache_native_credentials(
                    cluster_id,
                    &parsed,
                    parsed.username().to_string(),
                    parsed.password().map(str::to_string),
                    &record,
                )
                .await?;
                return Ok(Resolution::Ready);
            }
            Some(AuthMethod::MicrosoftEntraId) => {
                self.credentials
                    .set_auth_credentials(
                        cluster_id,
                        AuthMethod::MicrosoftEntraId,
                        &secret_free_base(&parsed),
                        None,
                        record.emulator.clone(),
                        Some(EntraIdConfig::default()),
                    )
                    .await?;
                return Ok(Resolution::Ready);
            }
            Some(method @ (AuthMethod::AtlasOAuth | AuthMethod::AtlasDigest)) => {
                // Atlas secrets come in through the dedicated credential
                // commands, never through the connect prompt
                return Err(DocDbError::config(format!(
                    "Cluster {cluster_id} is tagged {method} but has no Atlas credentials configured"
                )));
            }
            _ => {}
        }

        debug!("[{attempt}] Prompting for credentials for cluster {cluster_id}");
        let Some(prompted) = self
            .prompter
            .prompt_credentials(cluster_id, &record.connection_string)
            .await?
        else {
            return Ok(Resolution::Cancelled);
        };

        match prompted.auth_method {
            AuthMethod::NativeAuth => {
                let username = prompted
                    .username
                    .clone()
                    .filter(|u| !u.is_empty())
                    .or_else(|| {
                        Some(parsed.username().to_string()).filter(|u| !u.is_empty())
                    })
                    .ok_or_else(|| {
                        DocDbError::invalid_input("A username is required for native authentication")
                    })?;
                self.cache_native_credentials(
                    cluster_id,
                    &parsed,
                    username,
                    prompted.password.clone(),
                    &record,
                )
                .await?;
            }
            AuthMethod::MicrosoftEntraId => {
                self.credentials
                    .set_auth_credentials(
                        cluster_id,
                        AuthMethod::MicrosoftEntraId,
                        &secret_free_base(&parsed),
                        None,
                        record.emulator.clone(),
                        Some(EntraIdConfig {
                            tenant_id: prompted.tenant_id.clone(),
                            subscription_id: None,
                        }),
                    )
                    .await?;
            }
            method @ (AuthMethod::AtlasOAuth | AuthMethod::AtlasDigest) => {
                return Err(DocDbError::config(format!(
                    "The credential prompt cannot configure {method}"
                )));
            }
        }

        if prompted.save_to_store {
            self.save_prompted_record(&record, &prompted, &parsed).await?;
        }

        Ok(Resolution::Ready)
    }

    async fn cache_native_credentials(
        &self,
        cluster_id: &str,
        parsed: &ConnectionString,
        username: String,
        password: Option<String>,
        record: &StoredConnectionRecord,
    ) -> Result<()> {
        self.credentials
            .set_auth_credentials(
                cluster_id,
                AuthMethod::NativeAuth,
                &secret_free_base(parsed),
                Some(NativeAuthConfig {
                    connection_user: username,
                    connection_password: password,
                }),
                record.emulator.clone(),
                None,
            )
            .await
    }

    /// Write the selected method (and username, for native auth) back to the
    /// store. Passwords stay out of the record; secret persistence is the
    /// host's concern.
    async fn save_prompted_record(
        &self,
        record: &StoredConnectionRecord,
        prompted: &PromptedCredentials,
        parsed: &ConnectionString,
    ) -> Result<()> {
        let mut updated = record.clone();
        updated.auth_method = Some(prompted.auth_method);

        if prompted.auth_method == AuthMethod::NativeAuth {
            if let Some(username) = prompted.username.as_deref().filter(|u| !u.is_empty()) {
                let mut with_user = parsed.clone();
                with_user.set_username(username);
                with_user.remove_password();
                updated.connection_string = with_user.to_connection_string();
            }
        }

        self.store.save_record(&updated).await
    }
}

/// Cached base strings carry no secrets; stale embedded userinfo from the
/// stored record is dropped before anything enters the credential cache.
fn secret_free_base(parsed: &ConnectionString) -> String {
    let mut base = parsed.clone();
    base.set_username("");
    base.remove_password();
    base.to_connection_string()
}
