use thiserror::Error;

/// Errors surfaced by a remote media player or discovery controller
///
/// The vendor SDK reports failures as opaque error objects with a description.
/// This enum is the typed form those errors take once they cross into Rust.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Network communication error
    ///
    /// The device could not be reached, the connection dropped, or the
    /// transport failed before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// Error reported by the remote player itself
    #[error("Remote player error: {0}")]
    Remote(String),

    /// The operation did not complete in time
    #[error("Operation timed out")]
    Timeout,

    /// Invalid parameter value rejected by the player
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The player or controller has been closed
    #[error("Player closed")]
    Closed,
}

impl ApiError {
    /// Create a remote error from any displayable description
    pub fn remote(description: impl Into<String>) -> Self {
        Self::Remote(description.into())
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::Network("connection refused".to_string()).to_string(),
            "Network error: connection refused"
        );
        assert_eq!(ApiError::remote("offline").to_string(), "Remote player error: offline");
        assert_eq!(ApiError::Timeout.to_string(), "Operation timed out");
    }
}
