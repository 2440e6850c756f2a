//! Credential records and the process-wide credential cache
//!
//! Every cluster is addressed by a durable `clusterId` (storage UUID for local
//! connections, sanitized resource id for cloud-discovered ones). Transient
//! tree-node ids change when items move between views and must never be used
//! as cache keys.

pub mod cache;

pub use cache::CredentialCache;

use crate::error::{DocDbError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authentication method selected for a cluster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthMethod {
    /// Username/password embedded in the connection string
    NativeAuth,
    /// Microsoft Entra ID token-based auth (MONGODB-OIDC)
    #[serde(rename = "MicrosoftEntraID")]
    MicrosoftEntraId,
    /// Atlas management API via OAuth2 client credentials
    AtlasOAuth,
    /// Atlas management API via HTTP Digest
    AtlasDigest,
}

impl Default for AuthMethod {
    fn default() -> Self {
        Self::NativeAuth
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthMethod::NativeAuth => "NativeAuth",
            AuthMethod::MicrosoftEntraId => "MicrosoftEntraID",
            AuthMethod::AtlasOAuth => "AtlasOAuth",
            AuthMethod::AtlasDigest => "AtlasDigest",
        };
        f.write_str(name)
    }
}

impl FromStr for AuthMethod {
    type Err = DocDbError;

    /// Parse a stored method tag. Unknown tags are a configuration error,
    /// never a silent fallback to native auth.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NativeAuth" => Ok(AuthMethod::NativeAuth),
            "MicrosoftEntraID" => Ok(AuthMethod::MicrosoftEntraId),
            "AtlasOAuth" => Ok(AuthMethod::AtlasOAuth),
            "AtlasDigest" => Ok(AuthMethod::AtlasDigest),
            other => Err(DocDbError::config(format!(
                "Unsupported authentication method: {other}"
            ))),
        }
    }
}

/// Native username/password configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeAuthConfig {
    /// Username for the cluster
    pub connection_user: String,

    /// Password, absent when it still needs to be prompted for
    pub connection_password: Option<String>,
}

/// Entra ID tenant/subscription selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntraIdConfig {
    /// Tenant to authenticate against (host default when absent)
    pub tenant_id: Option<String>,

    /// Azure subscription owning the cluster resource
    pub subscription_id: Option<String>,
}

/// Which Atlas management-plane scheme the stored secrets belong to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AtlasAuthType {
    OAuth,
    Digest,
}

/// Atlas OAuth2 service-account secrets plus cached token state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasOAuthCredentials {
    pub client_id: String,
    pub client_secret: String,

    /// Cached access token from the last client-credentials exchange
    pub access_token: Option<String>,

    /// Absolute expiry of the cached token
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Atlas programmatic API key pair for HTTP Digest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasDigestCredentials {
    pub public_key: String,
    pub private_key: String,
}

/// Atlas management-plane secrets, tagged by scheme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtlasCredentials {
    pub auth_type: AtlasAuthType,
    pub oauth: Option<AtlasOAuthCredentials>,
    pub digest: Option<AtlasDigestCredentials>,
}

/// Local-emulator connection flags
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Target is a local emulator
    pub is_emulator: bool,

    /// Emulator security explicitly disabled; permits insecure TLS for this
    /// target only
    pub security_disabled: bool,
}

/// Cached authentication material for one cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedClusterCredentials {
    /// Durable cluster identifier, the sole cache key
    pub cluster_id: String,

    /// Base connection string without embedded secrets
    pub connection_string: String,

    /// Derived variant with the resolved secret embedded
    pub connection_string_with_password: String,

    /// Selected authentication method
    pub auth_method: AuthMethod,

    /// Native username/password, when applicable
    pub native_auth: Option<NativeAuthConfig>,

    /// Entra ID selection, when applicable
    pub entra_id: Option<EntraIdConfig>,

    /// Atlas management-plane secrets, when applicable
    pub atlas: Option<AtlasCredentials>,

    /// Emulator flags for local targets
    pub emulator: Option<EmulatorConfig>,
}
