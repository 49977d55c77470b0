//! Logging setup for fling-sdk
//!
//! The SDK logs through `tracing` and never installs a subscriber on its own.
//! Applications either bring their own subscriber or call [`init_logging`]
//! once at startup. Hosts that render to the terminal themselves usually want
//! [`LoggingMode::Silent`].

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the logging mode
pub const LOG_MODE_ENV: &str = "FLING_LOG_MODE";

/// Environment variable overriding the log level filter
pub const LOG_LEVEL_ENV: &str = "FLING_LOG_LEVEL";

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingMode {
    /// No subscriber is installed
    #[default]
    Silent,
    /// Compact stderr output for development
    Development,
    /// Verbose output with thread ids and source locations
    Debug,
    /// One JSON object per line, for log collectors
    Json,
}

impl LoggingMode {
    /// Parse a mode name as used in [`LOG_MODE_ENV`]
    ///
    /// Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(LoggingMode::Silent),
            "development" | "dev" => Some(LoggingMode::Development),
            "debug" => Some(LoggingMode::Debug),
            "json" => Some(LoggingMode::Json),
            _ => None,
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// Call this before connecting to any device so that discovery and
/// subscription lifecycle messages are captured.
///
/// # Examples
///
/// ```rust,ignore
/// fling_state::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `FLING_LOG_LEVEL`: filter directive (e.g. `debug`, `fling_event_manager=trace`)
/// - `RUST_LOG`: used when `FLING_LOG_LEVEL` is not set
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            // Thread names matter here: callbacks hop between vendor and context threads
            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(fmt::layer().json().with_thread_names(true))
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from environment variables
///
/// Reads [`LOG_MODE_ENV`] (`silent`, `development`, `debug`, `json`).
/// Defaults to silent when unset; an unrecognized value is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    init_logging(mode_from_env()?)
}

/// The logging mode selected by [`LOG_MODE_ENV`]
pub fn mode_from_env() -> Result<LoggingMode, LoggingError> {
    match std::env::var(LOG_MODE_ENV) {
        Ok(value) => LoggingMode::from_name(&value)
            .ok_or_else(|| LoggingError::InvalidEnv(format!("{LOG_MODE_ENV}={value}"))),
        Err(_) => Ok(LoggingMode::Silent),
    }
}

fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(LOG_LEVEL_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directive)
        .map_err(|e| LoggingError::InvalidEnv(format!("{directive}: {e}")))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

/// Equivalent to `init_logging(LoggingMode::Silent)`
pub fn init_silent() -> Result<(), LoggingError> {
    init_logging(LoggingMode::Silent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
        assert!(init_silent().is_ok());
    }

    #[test]
    fn test_mode_from_name() {
        assert_eq!(LoggingMode::from_name("debug"), Some(LoggingMode::Debug));
        assert_eq!(LoggingMode::from_name(" Development "), Some(LoggingMode::Development));
        assert_eq!(LoggingMode::from_name("JSON"), Some(LoggingMode::Json));
        assert_eq!(LoggingMode::from_name("loud"), None);
    }

    #[test]
    fn test_default_filter() {
        assert!(create_env_filter("info").is_ok());
    }
}
