use thiserror::Error;

/// Errors raised by the runtime layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The process-wide default callback context was already set
    #[error("Default callback context has already been installed")]
    DefaultContextInstalled,
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
