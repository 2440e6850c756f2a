//! Credential prompt seam
//!
//! The wizard UI lives in the host; the orchestrator only needs the collected
//! answers. Cancellation is not an error: a dismissed prompt yields
//! `Ok(None)` and the orchestrator aborts with no side effects.

use crate::credentials::AuthMethod;
use crate::error::Result;
use async_trait::async_trait;

/// Answers collected from the credential prompt flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptedCredentials {
    /// Selected authentication method
    pub auth_method: AuthMethod,

    /// Username, when the method needs one
    pub username: Option<String>,

    /// Password, when the method needs one
    pub password: Option<String>,

    /// Entra ID tenant selection
    pub tenant_id: Option<String>,

    /// User opted in to writing the credentials back to the store
    pub save_to_store: bool,
}

/// Host-provided prompt surface
#[async_trait]
pub trait CredentialPrompter: Send + Sync {
    /// Collect credentials for a cluster whose stored string lacks them.
    ///
    /// `Ok(None)` means the user dismissed the prompt.
    async fn prompt_credentials(
        &self,
        cluster_id: &str,
        connection_string: &str,
    ) -> Result<Option<PromptedCredentials>>;
}
