//! Error types for discovery sessions.

use std::fmt;

/// Error type for discovery operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// A search is already running; close it before starting another
    AlreadyStarted,
    /// The search target is not usable, e.g. an empty service id
    InvalidTarget(String),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::AlreadyStarted => write!(f, "Discovery is already running"),
            DiscoveryError::InvalidTarget(msg) => write!(f, "Invalid search target: {}", msg),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
