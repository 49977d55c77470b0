use fling_api::ApiError;
use thiserror::Error;

/// Errors delivered to capability failure handlers
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// The capability cannot do this on this device
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The player reported an error
    #[error("Vendor error: {0}")]
    Vendor(#[from] ApiError),

    /// The discovery session ended
    #[error("Discovery failed")]
    DiscoveryFailure,

    /// An argument was rejected before reaching the player
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The player returned metadata that is not a valid metadata document
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),
}

impl ServiceError {
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation(operation.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether the error came from the player rather than this crate
    pub fn is_vendor(&self) -> bool {
        matches!(self, ServiceError::Vendor(_))
    }
}

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Logging error: {0}")]
    Logging(#[from] fling_state::LoggingError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] fling_runtime::RuntimeError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] fling_discovery::DiscoveryError),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_error_keeps_description() {
        let error = ServiceError::from(ApiError::remote("offline"));
        assert!(error.to_string().contains("offline"));
        assert!(error.is_vendor());
    }

    #[test]
    fn test_unsupported_display() {
        assert_eq!(
            ServiceError::unsupported("rewind").to_string(),
            "Unsupported operation: rewind"
        );
    }
}
