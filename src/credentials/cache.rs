//! Process-wide credential cache
//!
//! Case-insensitive keyed store from `clusterId` to [`CachedClusterCredentials`].
//! Cloud resource ids can differ only in case across SDK surfaces, so keys are
//! lowercased on every operation. Writes replace the whole entry; lookups for
//! absent entries yield `None`/`false` rather than errors.

use crate::connection_string::ConnectionString;
use crate::credentials::{
    AtlasAuthType, AtlasCredentials, AtlasDigestCredentials, AtlasOAuthCredentials, AuthMethod,
    CachedClusterCredentials, EmulatorConfig, EntraIdConfig, NativeAuthConfig,
};
use crate::error::Result;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Keyed store for cached cluster credentials.
///
/// Constructed explicitly and passed by reference (`Arc`) through the
/// orchestrator; there is no ambient global instance.
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: RwLock<HashMap<String, CachedClusterCredentials>>,
}

fn cache_key(cluster_id: &str) -> String {
    cluster_id.to_ascii_lowercase()
}

impl CredentialCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the full credential record for a cluster.
    ///
    /// Builds the embedded-password variant through the connection-string
    /// codec. Any prior entry under the same key is fully replaced.
    pub async fn set_auth_credentials(
        &self,
        cluster_id: &str,
        auth_method: AuthMethod,
        connection_string: &str,
        native_auth: Option<NativeAuthConfig>,
        emulator: Option<EmulatorConfig>,
        entra_id: Option<EntraIdConfig>,
    ) -> Result<()> {
        let connection_string_with_password = match &native_auth {
            Some(native) if !native.connection_user.is_empty() => {
                let mut parsed = ConnectionString::parse(connection_string)?;
                parsed.add_authentication_data(
                    &native.connection_user,
                    native.connection_password.as_deref().unwrap_or(""),
                );
                parsed.to_connection_string()
            }
            _ => connection_string.to_string(),
        };

        let record = CachedClusterCredentials {
            cluster_id: cluster_id.to_string(),
            connection_string: connection_string.to_string(),
            connection_string_with_password,
            auth_method,
            native_auth,
            entra_id,
            atlas: None,
            emulator,
        };

        debug!("Caching {auth_method} credentials for cluster {cluster_id}");
        self.entries
            .write()
            .await
            .insert(cache_key(cluster_id), record);
        Ok(())
    }

    /// Store Atlas OAuth2 service-account secrets for a cluster
    pub async fn set_atlas_oauth_credentials(
        &self,
        cluster_id: &str,
        client_id: &str,
        client_secret: &str,
    ) {
        let atlas = AtlasCredentials {
            auth_type: AtlasAuthType::OAuth,
            oauth: Some(AtlasOAuthCredentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                access_token: None,
                token_expires_at: None,
            }),
            digest: None,
        };
        self.replace_atlas_entry(cluster_id, AuthMethod::AtlasOAuth, atlas)
            .await;
    }

    /// Store Atlas HTTP Digest API keys for a cluster
    pub async fn set_atlas_digest_credentials(
        &self,
        cluster_id: &str,
        public_key: &str,
        private_key: &str,
    ) {
        let atlas = AtlasCredentials {
            auth_type: AtlasAuthType::Digest,
            oauth: None,
            digest: Some(AtlasDigestCredentials {
                public_key: public_key.to_string(),
                private_key: private_key.to_string(),
            }),
        };
        self.replace_atlas_entry(cluster_id, AuthMethod::AtlasDigest, atlas)
            .await;
    }

    async fn replace_atlas_entry(
        &self,
        cluster_id: &str,
        auth_method: AuthMethod,
        atlas: AtlasCredentials,
    ) {
        let mut entries = self.entries.write().await;
        let key = cache_key(cluster_id);
        // Keep any stored connection string when retagging an existing entry
        let (connection_string, connection_string_with_password) = entries
            .get(&key)
            .map(|existing| {
                (
                    existing.connection_string.clone(),
                    existing.connection_string_with_password.clone(),
                )
            })
            .unwrap_or_default();

        debug!("Caching {auth_method} credentials for cluster {cluster_id}");
        entries.insert(
            key,
            CachedClusterCredentials {
                cluster_id: cluster_id.to_string(),
                connection_string,
                connection_string_with_password,
                auth_method,
                native_auth: None,
                entra_id: None,
                atlas: Some(atlas),
                emulator: None,
            },
        );
    }

    /// Record a freshly exchanged OAuth token with its absolute expiry.
    ///
    /// Returns `false` when no OAuth record exists for the cluster.
    pub async fn update_atlas_oauth_token(
        &self,
        cluster_id: &str,
        access_token: &str,
        expires_in_secs: i64,
    ) -> bool {
        let mut entries = self.entries.write().await;
        let Some(oauth) = entries
            .get_mut(&cache_key(cluster_id))
            .and_then(|record| record.atlas.as_mut())
            .and_then(|atlas| atlas.oauth.as_mut())
        else {
            return false;
        };

        oauth.access_token = Some(access_token.to_string());
        oauth.token_expires_at = Some(Utc::now() + Duration::seconds(expires_in_secs));
        debug!("Updated Atlas OAuth token for cluster {cluster_id}");
        true
    }

    /// Whether a cached Atlas OAuth token exists and has not expired
    pub async fn is_atlas_oauth_token_valid(&self, cluster_id: &str) -> bool {
        let entries = self.entries.read().await;
        let Some(oauth) = entries
            .get(&cache_key(cluster_id))
            .and_then(|record| record.atlas.as_ref())
            .and_then(|atlas| atlas.oauth.as_ref())
        else {
            return false;
        };

        match (&oauth.access_token, &oauth.token_expires_at) {
            (Some(_), Some(expires_at)) => Utc::now() < *expires_at,
            _ => false,
        }
    }

    /// Look up the cached record for a cluster
    pub async fn get_credentials(&self, cluster_id: &str) -> Option<CachedClusterCredentials> {
        self.entries
            .read()
            .await
            .get(&cache_key(cluster_id))
            .cloned()
    }

    /// Whether a record exists for the cluster
    pub async fn has_credentials(&self, cluster_id: &str) -> bool {
        self.entries
            .read()
            .await
            .contains_key(&cache_key(cluster_id))
    }

    /// Remove the record for a cluster; no-op when absent
    pub async fn delete_credentials(&self, cluster_id: &str) {
        if self
            .entries
            .write()
            .await
            .remove(&cache_key(cluster_id))
            .is_some()
        {
            debug!("Deleted cached credentials for cluster {cluster_id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(user: &str, password: &str) -> Option<NativeAuthConfig> {
        Some(NativeAuthConfig {
            connection_user: user.to_string(),
            connection_password: Some(password.to_string()),
        })
    }

    #[tokio::test]
    async fn builds_embedded_password_variant() {
        let cache = CredentialCache::new();
        cache
            .set_auth_credentials(
                "cluster-a",
                AuthMethod::NativeAuth,
                "mongodb://host1:27017/?tls=true",
                native("u", "p"),
                None,
                None,
            )
            .await
            .unwrap();

        let record = cache.get_credentials("cluster-a").await.unwrap();
        assert_eq!(
            record.connection_string_with_password,
            "mongodb://u:p@host1:27017/?tls=true"
        );
        assert_eq!(record.connection_string, "mongodb://host1:27017/?tls=true");
    }

    #[tokio::test]
    async fn keys_are_case_insensitive() {
        let cache = CredentialCache::new();
        cache
            .set_auth_credentials(
                "/Subscriptions/ABC/Clusters/One",
                AuthMethod::NativeAuth,
                "mongodb://host1/",
                None,
                None,
                None,
            )
            .await
            .unwrap();

        assert!(cache.has_credentials("/subscriptions/abc/clusters/one").await);
        assert!(cache
            .get_credentials("/SUBSCRIPTIONS/ABC/CLUSTERS/ONE")
            .await
            .is_some());
    }

    #[tokio::test]
    async fn writes_replace_whole_entry() {
        let cache = CredentialCache::new();
        cache
            .set_auth_credentials(
                "c1",
                AuthMethod::NativeAuth,
                "mongodb://host1/",
                native("u", "p"),
                None,
                None,
            )
            .await
            .unwrap();
        cache
            .set_auth_credentials(
                "c1",
                AuthMethod::MicrosoftEntraId,
                "mongodb://host2/",
                None,
                None,
                Some(EntraIdConfig::default()),
            )
            .await
            .unwrap();

        let record = cache.get_credentials("c1").await.unwrap();
        assert_eq!(record.auth_method, AuthMethod::MicrosoftEntraId);
        assert!(record.native_auth.is_none(), "stale native config survived");
        assert_eq!(record.connection_string, "mongodb://host2/");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = CredentialCache::new();
        cache.delete_credentials("missing").await;
        cache
            .set_auth_credentials("c1", AuthMethod::NativeAuth, "mongodb://h/", None, None, None)
            .await
            .unwrap();
        cache.delete_credentials("c1").await;
        cache.delete_credentials("c1").await;
        assert!(!cache.has_credentials("c1").await);
    }

    #[tokio::test]
    async fn oauth_token_validity() {
        let cache = CredentialCache::new();
        assert!(!cache.is_atlas_oauth_token_valid("c1").await);

        cache.set_atlas_oauth_credentials("c1", "id", "secret").await;
        assert!(!cache.is_atlas_oauth_token_valid("c1").await);

        assert!(cache.update_atlas_oauth_token("c1", "tok", 3600).await);
        assert!(cache.is_atlas_oauth_token_valid("c1").await);

        assert!(cache.update_atlas_oauth_token("c1", "tok", -1).await);
        assert!(!cache.is_atlas_oauth_token_valid("c1").await);
    }

    #[tokio::test]
    async fn token_update_without_oauth_record_is_a_noop() {
        let cache = CredentialCache::new();
        assert!(!cache.update_atlas_oauth_token("c1", "tok", 3600).await);

        cache.set_atlas_digest_credentials("c1", "pk", "sk").await;
        assert!(!cache.update_atlas_oauth_token("c1", "tok", 3600).await);
    }
}
