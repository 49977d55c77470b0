//! # Fling Runtime
//!
//! Scheduling primitives shared by every fling-sdk crate.
//!
//! No component in the SDK owns a thread of its own. Concurrency comes from the
//! vendor SDK (which completes operations and fires listeners on threads of its
//! choosing) and from the [`ExecutionContext`] the integrator picks for
//! delivering results. This crate provides:
//!
//! - **[`ExecutionContext`]**: "run this job here", with inline, serial-worker and
//!   tokio-backed implementations
//! - **Default callback context**: a process-wide "main queue" installed once at
//!   startup, plus [`ContextSlot`] for per-component overrides
//! - **[`Task`]**: a single-shot result with exactly one continuation, scheduled
//!   through a context rather than run on the completing thread
//!
//! ## Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use fling_runtime::{SerialContext, Task};
//!
//! let ctx = SerialContext::shared("callbacks")?;
//! let (source, task) = Task::<f64, String>::pending();
//! let (tx, rx) = mpsc::channel();
//!
//! task.continue_with(ctx, move |result| {
//!     tx.send(result).unwrap();
//! });
//!
//! // Typically called from the vendor's own thread
//! source.set_result(0.5);
//!
//! assert_eq!(rx.recv().unwrap(), Ok(0.5));
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod context;
pub mod default;
pub mod error;
pub mod task;

pub use context::{
    same_context, ExecutionContext, ImmediateContext, Job, SerialContext, SharedContext,
    TokioContext,
};
pub use default::{
    default_callback_context, install_default_callback_context, is_default_installed,
    ContextSlot, DEFAULT_CONTEXT_NAME,
};
pub use error::{Result, RuntimeError};
pub use task::{Task, TaskCompletionSource};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        default_callback_context, ContextSlot, ExecutionContext, ImmediateContext, SerialContext,
        SharedContext, Task, TaskCompletionSource,
    };
}
