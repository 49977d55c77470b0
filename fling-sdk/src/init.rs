//! Process-wide initialization

use fling_runtime::{install_default_callback_context, SharedContext};
use fling_state::logging::{init_logging, is_initialized};

use crate::config::SdkConfig;
use crate::error::SdkError;

/// Initialize logging and the default callback context
///
/// Call once at startup, before any service is created. Logging is left
/// alone if the host already installed a subscriber. `callback_context`,
/// when given, becomes the process-wide default callback context; this fails
/// with [`SdkError::Runtime`] if a default was already installed or created.
pub fn init(config: &SdkConfig, callback_context: Option<SharedContext>) -> Result<(), SdkError> {
    config.validate()?;

    if !is_initialized() {
        init_logging(config.log_mode)?;
    }

    if let Some(context) = callback_context {
        install_default_callback_context(context)?;
    }

    tracing::debug!("fling-sdk initialized with {:?}", config);
    Ok(())
}
