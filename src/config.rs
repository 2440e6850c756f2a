//! Settings for the connection lifecycle core

use crate::error::{DocDbError, Result};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use url::Url;

use crate::auth::atlas::{ATLAS_API_BASE_URL, ATLAS_OAUTH_TOKEN_URL};

/// Tunables for HTTP auth calls and emulator handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectSettings {
    /// Timeout for management-plane HTTP requests
    pub http_timeout: Duration,

    /// Server selection timeout applied to local emulator targets so a
    /// stopped emulator fails fast
    pub emulator_server_selection_timeout: Duration,

    /// Atlas OAuth token endpoint
    pub atlas_token_url: Url,

    /// Atlas Administration API base
    pub atlas_api_base: Url,

    /// User agent for management-plane requests
    pub user_agent: String,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            emulator_server_selection_timeout: Duration::from_secs(4),
            atlas_token_url: ATLAS_OAUTH_TOKEN_URL.parse().expect("valid default URL"),
            atlas_api_base: ATLAS_API_BASE_URL.parse().expect("valid default URL"),
            user_agent: format!("docdb-connect/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConnectSettings {
    /// Load settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(timeout) = env::var("DOCDB_HTTP_TIMEOUT_SECS") {
            settings.http_timeout = Duration::from_secs(timeout.parse().map_err(|e| {
                DocDbError::config(format!("Invalid DOCDB_HTTP_TIMEOUT_SECS: {e}"))
            })?);
        }

        if let Ok(timeout) = env::var("DOCDB_EMULATOR_SELECTION_TIMEOUT_MS") {
            settings.emulator_server_selection_timeout =
                Duration::from_millis(timeout.parse().map_err(|e| {
                    DocDbError::config(format!("Invalid DOCDB_EMULATOR_SELECTION_TIMEOUT_MS: {e}"))
                })?);
        }

        if let Ok(url) = env::var("DOCDB_ATLAS_TOKEN_URL") {
            settings.atlas_token_url = url
                .parse()
                .map_err(|e| DocDbError::config(format!("Invalid DOCDB_ATLAS_TOKEN_URL: {e}")))?;
        }

        if let Ok(url) = env::var("DOCDB_ATLAS_API_BASE") {
            settings.atlas_api_base = url
                .parse()
                .map_err(|e| DocDbError::config(format!("Invalid DOCDB_ATLAS_API_BASE: {e}")))?;
        }

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.http_timeout.is_zero() {
            return Err(DocDbError::config("HTTP timeout must be greater than zero"));
        }
        if self.emulator_server_selection_timeout.is_zero() {
            return Err(DocDbError::config(
                "Emulator server selection timeout must be greater than zero",
            ));
        }
        for url in [&self.atlas_token_url, &self.atlas_api_base] {
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(DocDbError::config(format!(
                    "Atlas endpoint {url} must use http or https"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = ConnectSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.atlas_token_url.as_str(), ATLAS_OAUTH_TOKEN_URL);
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut settings = ConnectSettings::default();
        settings.http_timeout = Duration::ZERO;
        assert!(settings.validate().is_err());
    }
}
