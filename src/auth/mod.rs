//! Authentication method resolvers
//!
//! A resolver turns the cached credential record for one cluster into what the
//! driver needs to open a session: a final connection string plus driver
//! options. Resolver selection is driven strictly by the `AuthMethod` tag on
//! the cached record.

pub mod atlas;
pub mod entra;
pub mod native;

pub use atlas::AtlasAuthManager;
pub use entra::{BrokerSession, TokenBroker, ENTRA_TOKEN_AUDIENCE};

use crate::config::ConnectSettings;
use crate::credentials::{AuthMethod, CachedClusterCredentials};
use crate::error::{DocDbError, Result};
use std::fmt;
use std::time::Duration;

/// Driver-level authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAuthMechanism {
    /// OIDC with a callback resolving to an already-fetched token
    MongodbOidc,
}

impl fmt::Display for DriverAuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverAuthMechanism::MongodbOidc => f.write_str("MONGODB-OIDC"),
        }
    }
}

/// Options handed to the driver alongside the connection string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// Explicit auth mechanism override
    pub auth_mechanism: Option<DriverAuthMechanism>,

    /// Token the OIDC callback resolves with, already obtained from the
    /// broker. Token lifetime is the broker's responsibility; the callback
    /// never refreshes.
    pub oidc_access_token: Option<String>,

    /// ALLOWED_HOSTS restriction for the OIDC mechanism
    pub allowed_hosts: Vec<String>,

    /// Shortened server selection timeout (emulator targets)
    pub server_selection_timeout: Option<Duration>,

    /// Accept invalid TLS certificates. Only ever set for a local emulator
    /// with security explicitly disabled; never for remote targets.
    pub accept_invalid_certs: bool,
}

/// Resolver output: everything the driver needs to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuth {
    /// Final connection string
    pub connection_string: String,

    /// Driver options to apply
    pub options: DriverOptions,
}

/// Produce driver-ready auth material for the cached record.
///
/// Atlas-tagged records authenticate the management REST API, not the
/// data-plane driver; routing one here is a configuration error, never a
/// silent fallback to native auth.
pub async fn configure_auth(
    record: &CachedClusterCredentials,
    broker: &dyn TokenBroker,
    settings: &ConnectSettings,
) -> Result<ResolvedAuth> {
    match record.auth_method {
        AuthMethod::NativeAuth => native::configure_native_auth(record, settings),
        AuthMethod::MicrosoftEntraId => entra::configure_entra_id_auth(record, broker).await,
        AuthMethod::AtlasOAuth | AuthMethod::AtlasDigest => Err(DocDbError::config(format!(
            "Auth method {} applies to the Atlas management API and cannot open a driver session",
            record.auth_method
        ))),
    }
}
