//! # docdb-connect
//!
//! Credential and connection lifecycle core for DocumentDB/MongoDB hosts.
//!
//! ## Features
//!
//! - **Credential cache**: in-memory, per-cluster credential records keyed by
//!   durable cluster id, with secrets never persisted
//! - **Auth resolvers**: native SCRAM, Microsoft Entra ID (OIDC), and Atlas
//!   management-plane OAuth2 / HTTP Digest
//! - **Session cache**: at most one live driver client per cluster, with
//!   single-flight connect attempts
//! - **Orchestrator**: resolve → prompt → authenticate → connect, with full
//!   cache cleanup on any failure
//! - **Connection-string codec**: parse, edit, and re-serialize multi-host
//!   `mongodb://` / `mongodb+srv://` strings
//!
//! The driver itself, the prompt UI, and record persistence stay behind
//! traits ([`client::ClientFactory`], [`prompt::CredentialPrompter`],
//! [`store::ConnectionStore`]); the host wires them into a
//! [`orchestrator::ConnectionOrchestrator`].

pub mod auth;
pub mod client;
pub mod config;
pub mod connection_string;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use auth::{AtlasAuthManager, ResolvedAuth, TokenBroker};
pub use client::{ClientFactory, ClientSessionCache, ClusterClient};
pub use config::ConnectSettings;
pub use connection_string::ConnectionString;
pub use credentials::{AuthMethod, CredentialCache};
pub use error::{DocDbError, Result};
pub use orchestrator::{ConnectOutcome, ConnectionOrchestrator};
