//! Logging setup for hosts embedding the connection core

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{DocDbError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level when RUST_LOG is unset
    pub level: Level,

    /// Emit structured JSON instead of human-readable lines
    pub json_format: bool,

    /// Log to stderr (stdout otherwise)
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            stderr: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            if rust_log.contains("trace") {
                config.level = Level::TRACE;
            } else if rust_log.contains("debug") {
                config.level = Level::DEBUG;
            } else if rust_log.contains("warn") {
                config.level = Level::WARN;
            } else if rust_log.contains("error") {
                config.level = Level::ERROR;
            }
        }

        if let Ok(json) = std::env::var("DOCDB_LOG_JSON") {
            config.json_format = json.to_lowercase() == "true";
        }

        config
    }
}

/// Initialize the global subscriber with the given configuration.
///
/// Fails when a subscriber is already installed by the host.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(if config.stderr {
            fmt::writer::BoxMakeWriter::new(std::io::stderr)
        } else {
            fmt::writer::BoxMakeWriter::new(std::io::stdout)
        });

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| DocDbError::config(format!("Failed to initialize logging: {e}")))
}
