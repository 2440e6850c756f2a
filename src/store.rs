//! Connection-record store seam
//!
//! Persistence of connection records (and any secret storage behind it) is an
//! external collaborator; this crate only reads and writes records through
//! this narrow interface, addressed by durable cluster id.

use crate::credentials::{AuthMethod, EmulatorConfig};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A persisted connection record for one cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredConnectionRecord {
    /// Durable cluster id (storage UUID or sanitized cloud resource id)
    pub id: String,

    /// Display name
    pub name: String,

    /// Stored connection string; may or may not carry a username
    pub connection_string: String,

    /// Previously selected auth method, when the user saved one
    pub auth_method: Option<AuthMethod>,

    /// Emulator flags for local targets
    pub emulator: Option<EmulatorConfig>,
}

/// Host-provided store of connection records
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Fetch the record for a cluster id, `None` when unknown
    async fn get_record(&self, cluster_id: &str) -> Result<Option<StoredConnectionRecord>>;

    /// Persist an updated record
    async fn save_record(&self, record: &StoredConnectionRecord) -> Result<()>;
}
