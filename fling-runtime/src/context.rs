//! Execution contexts
//!
//! An [`ExecutionContext`] decides *where* a unit of work runs. The bridge never
//! runs user-facing callbacks on whatever thread the vendor SDK happened to
//! complete an operation on; it always hands the work to a context instead.
//!
//! Three implementations are provided:
//!
//! - [`ImmediateContext`]: runs the job inline on the calling thread (tests)
//! - [`SerialContext`]: a dedicated worker thread draining a FIFO queue; this is
//!   the "main queue" equivalent used as the default callback context
//! - [`TokioContext`]: spawns the job onto a tokio runtime

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crossbeam::channel::{self, Sender};

/// A unit of work handed to an [`ExecutionContext`]
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared, type-erased execution context
pub type SharedContext = Arc<dyn ExecutionContext>;

/// Abstraction for "run this unit of work here"
pub trait ExecutionContext: Send + Sync {
    /// Schedule `job` to run on this context
    fn execute(&self, job: Job);

    /// Human readable name used in log output
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl fmt::Debug for dyn ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.name())
            .finish()
    }
}

/// Returns `true` when both handles point at the same context instance
pub fn same_context(a: &SharedContext, b: &SharedContext) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

// ============================================================================
// ImmediateContext
// ============================================================================

/// Runs every job inline on the thread that schedules it
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateContext;

impl ImmediateContext {
    /// Create a shared immediate context
    pub fn shared() -> SharedContext {
        Arc::new(ImmediateContext)
    }
}

impl ExecutionContext for ImmediateContext {
    fn execute(&self, job: Job) {
        job();
    }

    fn name(&self) -> &str {
        "immediate"
    }
}

// ============================================================================
// SerialContext
// ============================================================================

/// A single worker thread running jobs one at a time, in submission order
///
/// Jobs that panic are caught and logged so one misbehaving callback does not
/// take the queue down with it. The worker exits once every handle to the
/// context has been dropped and the queue is drained.
pub struct SerialContext {
    name: String,
    job_tx: Sender<Job>,
    thread_id: ThreadId,
}

impl SerialContext {
    /// Spawn the worker thread for a new serial context
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (job_tx, job_rx) = channel::unbounded::<Job>();

        let worker_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            tracing::debug!("Serial context '{}' started", worker_name);

            for job in job_rx {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("Job panicked on serial context '{}'", worker_name);
                }
            }

            tracing::debug!("Serial context '{}' stopped", worker_name);
        })?;

        Ok(Self {
            name,
            job_tx,
            thread_id: handle.thread().id(),
        })
    }

    /// Spawn a serial context and wrap it for sharing
    pub fn shared(name: impl Into<String>) -> io::Result<Arc<Self>> {
        Self::new(name).map(Arc::new)
    }

    /// Whether the calling thread is this context's worker
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Id of the worker thread
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl ExecutionContext for SerialContext {
    fn execute(&self, job: Job) {
        if self.job_tx.send(job).is_err() {
            tracing::warn!("Serial context '{}' is gone, dropping job", self.name);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SerialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialContext")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

// ============================================================================
// TokioContext
// ============================================================================

/// Spawns jobs onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioContext {
    handle: tokio::runtime::Handle,
}

impl TokioContext {
    /// Create a context backed by the given runtime handle
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Create a context on the runtime the caller is running inside
    ///
    /// Returns `None` when called outside a tokio runtime.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl ExecutionContext for TokioContext {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }

    fn name(&self) -> &str {
        "tokio"
    }
}
