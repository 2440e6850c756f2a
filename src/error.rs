//! Error types for cluster connection and credential management

use thiserror::Error;

/// Result type alias for connection lifecycle operations
pub type Result<T> = std::result::Result<T, DocDbError>;

/// Error types for credential resolution and cluster connections
#[derive(Error, Debug)]
pub enum DocDbError {
    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage errors
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found errors (clusters, records, etc.)
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for DocDbError {
    /// Timed-out requests classify as `Timeout` so callers can retry them
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Http(e)
        }
    }
}

impl DocDbError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a credentials error
    pub fn credentials<S: Into<String>>(msg: S) -> Self {
        Self::Credentials(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocDbError::Connection(_) | DocDbError::Timeout(_) | DocDbError::Http(_)
        )
    }

    /// Check if error indicates authentication issue
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            DocDbError::Authentication(_) | DocDbError::Credentials(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_retryable_errors() {
        assert!(DocDbError::connection("refused").is_retryable());
        assert!(DocDbError::Timeout("deadline".to_string()).is_retryable());
        assert!(!DocDbError::config("bad url").is_retryable());
        assert!(!DocDbError::authentication("denied").is_retryable());
    }

    #[test]
    fn classifies_auth_errors() {
        assert!(DocDbError::authentication("denied").is_auth_error());
        assert!(DocDbError::credentials("missing").is_auth_error());
        assert!(!DocDbError::connection("refused").is_auth_error());
    }
}
