//! Shared per-device plumbing for capability facades

use std::fmt;
use std::sync::Arc;

use fling_api::{ApiTask, DeviceHandle};
use fling_runtime::{default_callback_context, SharedContext};

use crate::bridge::{AsyncResultBridge, FailureHandler, SuccessHandler};

/// Device handle plus the contexts every capability of that device uses
///
/// One mixin is shared by all facades of a device. It owns no subscriptions
/// and performs no I/O itself; facades issue vendor calls through
/// [`device`](Self::device) and deliver results through [`bridge`](Self::bridge).
pub struct CapabilityMixin {
    device: DeviceHandle,
    default_executor: SharedContext,
    callback_context: SharedContext,
    bridge: AsyncResultBridge,
}

impl CapabilityMixin {
    /// Deliver callbacks on `callback_context`
    pub fn new(device: DeviceHandle, callback_context: SharedContext) -> Self {
        Self::with_executor(device, callback_context.clone(), callback_context)
    }

    /// Deliver callbacks on the default callback context
    pub fn with_default_context(device: DeviceHandle) -> Self {
        Self::new(device, default_callback_context())
    }

    /// Run vendor continuations on `default_executor` and callbacks on `callback_context`
    pub fn with_executor(
        device: DeviceHandle,
        default_executor: SharedContext,
        callback_context: SharedContext,
    ) -> Self {
        let bridge =
            AsyncResultBridge::with_executor(default_executor.clone(), callback_context.clone());
        Self {
            device,
            default_executor,
            callback_context,
            bridge,
        }
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn device_id(&self) -> &str {
        self.device.unique_identifier()
    }

    pub fn default_executor(&self) -> &SharedContext {
        &self.default_executor
    }

    pub fn callback_context(&self) -> &SharedContext {
        &self.callback_context
    }

    pub fn bridge(&self) -> &AsyncResultBridge {
        &self.bridge
    }

    pub fn continue_task<T: Send + 'static>(
        &self,
        task: ApiTask<T>,
        success: Option<SuccessHandler<T>>,
        failure: Option<FailureHandler>,
    ) {
        self.bridge.continue_task(Some(task), success, failure);
    }

    pub fn fail_unsupported(&self, failure: Option<FailureHandler>, operation: &str) {
        self.bridge.fail_unsupported(failure, operation);
    }
}

impl fmt::Debug for CapabilityMixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityMixin")
            .field("device", &self.device)
            .field("default_executor", &self.default_executor.name())
            .field("callback_context", &self.callback_context.name())
            .finish()
    }
}

/// Implemented by every facade built on a [`CapabilityMixin`]
pub trait Capability {
    fn mixin(&self) -> &Arc<CapabilityMixin>;

    fn device(&self) -> &DeviceHandle {
        self.mixin().device()
    }

    fn bridge(&self) -> &AsyncResultBridge {
        self.mixin().bridge()
    }
}
