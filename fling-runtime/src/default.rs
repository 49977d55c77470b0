//! Process-wide default callback context
//!
//! The default context plays the role of a UI "main queue": callbacks that were
//! not given an explicit context land here. It is installed once at startup via
//! [`install_default_callback_context`]. If nothing was installed by the time it
//! is first needed, a serial context named `fling-main` is created lazily.
//!
//! Components never read the global directly when they hold a context of their
//! own; they keep a [`ContextSlot`] that can be overridden per instance.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::context::{ImmediateContext, SerialContext, SharedContext};
use crate::error::{Result, RuntimeError};

/// Name of the lazily created default serial context
pub const DEFAULT_CONTEXT_NAME: &str = "fling-main";

static DEFAULT_CALLBACK_CONTEXT: OnceLock<SharedContext> = OnceLock::new();

/// Install the process-wide default callback context
///
/// Can only succeed once. Returns [`RuntimeError::DefaultContextInstalled`] if a
/// context was already installed, including one created lazily by an earlier
/// call to [`default_callback_context`].
pub fn install_default_callback_context(context: SharedContext) -> Result<()> {
    let name = context.name().to_string();

    DEFAULT_CALLBACK_CONTEXT
        .set(context)
        .map_err(|_| RuntimeError::DefaultContextInstalled)?;

    tracing::debug!("Installed default callback context '{}'", name);
    Ok(())
}

/// Get the process-wide default callback context
pub fn default_callback_context() -> SharedContext {
    Arc::clone(DEFAULT_CALLBACK_CONTEXT.get_or_init(|| {
        match SerialContext::new(DEFAULT_CONTEXT_NAME) {
            Ok(ctx) => {
                tracing::debug!("Created default callback context '{}'", DEFAULT_CONTEXT_NAME);
                Arc::new(ctx)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to spawn default callback context, running callbacks inline: {}",
                    e
                );
                Arc::new(ImmediateContext)
            }
        }
    }))
}

/// Whether a default callback context has been installed or created
pub fn is_default_installed() -> bool {
    DEFAULT_CALLBACK_CONTEXT.get().is_some()
}

/// A per-component context that can never be empty
///
/// Setting `None` resets the slot to the process-wide default.
pub struct ContextSlot {
    current: RwLock<SharedContext>,
}

impl ContextSlot {
    /// Create a slot holding `context`, or the default when `None`
    pub fn new(context: Option<SharedContext>) -> Self {
        Self {
            current: RwLock::new(context.unwrap_or_else(default_callback_context)),
        }
    }

    /// Current context
    pub fn get(&self) -> SharedContext {
        Arc::clone(&self.current.read())
    }

    /// Replace the context; `None` resets to the default
    pub fn set(&self, context: Option<SharedContext>) {
        *self.current.write() = context.unwrap_or_else(default_callback_context);
    }
}

impl Default for ContextSlot {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for ContextSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextSlot")
            .field("context", &self.current.read().name())
            .finish()
    }
}
