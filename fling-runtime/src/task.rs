//! Single-shot asynchronous results
//!
//! A [`Task`] is the consumer half of an operation that completes exactly once,
//! with either a value or an error. The producer half is a
//! [`TaskCompletionSource`], handed to whatever performs the work (in practice,
//! the vendor SDK binding).
//!
//! A task accepts one continuation. The continuation is never run inline on the
//! thread that completes the task: completion hands it to the
//! [`ExecutionContext`](crate::ExecutionContext) supplied with the continuation.
//! Dropping a completion source without completing it abandons the task and the
//! continuation is dropped without running.
//!
//! ```rust
//! use fling_runtime::{ImmediateContext, Task};
//!
//! let (source, task) = Task::<u32, String>::pending();
//! task.continue_with(ImmediateContext::shared(), |result| {
//!     assert_eq!(result, Ok(7));
//! });
//! source.set_result(7);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

use crate::context::{ImmediateContext, SharedContext};

type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

enum TaskState<T, E> {
    /// Not completed yet, possibly with a continuation waiting
    Pending(Option<(SharedContext, Continuation<T, E>)>),
    /// Completed before a continuation was attached
    Completed(Result<T, E>),
    /// Result handed off, or the source was dropped
    Finished,
}

impl<T, E> TaskState<T, E> {
    fn label(&self) -> &'static str {
        match self {
            TaskState::Pending(_) => "pending",
            TaskState::Completed(Ok(_)) => "succeeded",
            TaskState::Completed(Err(_)) => "failed",
            TaskState::Finished => "finished",
        }
    }
}

/// Consumer half of a single-shot asynchronous operation
pub struct Task<T, E> {
    shared: Arc<Mutex<TaskState<T, E>>>,
}

/// Producer half of a single-shot asynchronous operation
pub struct TaskCompletionSource<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    shared: Arc<Mutex<TaskState<T, E>>>,
    done: bool,
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a pending task and the source that completes it
    pub fn pending() -> (TaskCompletionSource<T, E>, Self) {
        let shared = Arc::new(Mutex::new(TaskState::Pending(None)));
        (
            TaskCompletionSource {
                shared: Arc::clone(&shared),
                done: false,
            },
            Self { shared },
        )
    }

    /// Create a task that is already complete
    pub fn from_result(result: Result<T, E>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(TaskState::Completed(result))),
        }
    }

    /// Create a task that already succeeded with `value`
    pub fn completed(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// Create a task that already failed with `error`
    pub fn failed(error: E) -> Self {
        Self::from_result(Err(error))
    }

    /// Whether a result is available and waiting for a continuation
    pub fn is_completed(&self) -> bool {
        matches!(*self.shared.lock(), TaskState::Completed(_))
    }

    /// Whether the task is known to have failed
    pub fn is_faulted(&self) -> bool {
        matches!(*self.shared.lock(), TaskState::Completed(Err(_)))
    }

    /// Whether the completion source was dropped without completing
    pub fn is_abandoned(&self) -> bool {
        matches!(*self.shared.lock(), TaskState::Finished)
    }

    /// Attach the continuation, run on `context` once the task completes
    ///
    /// If the task already completed, the continuation is scheduled right away.
    /// If the task was abandoned, the continuation is dropped.
    pub fn continue_with<F>(self, context: SharedContext, continuation: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let mut state = self.shared.lock();

        match std::mem::replace(&mut *state, TaskState::Finished) {
            TaskState::Pending(_) => {
                *state = TaskState::Pending(Some((context, Box::new(continuation))));
            }
            TaskState::Completed(result) => {
                drop(state);
                context.execute(Box::new(move || continuation(result)));
            }
            TaskState::Finished => {
                tracing::trace!("Continuation attached to an abandoned task, dropping it");
            }
        }
    }

    /// Await the task's result
    ///
    /// Resolves to `None` if the task is abandoned.
    pub fn result(self) -> impl Future<Output = Option<Result<T, E>>> + Send + 'static {
        let (tx, rx) = oneshot::channel();

        self.continue_with(ImmediateContext::shared(), move |result| {
            let _ = tx.send(result);
        });

        async move { rx.await.ok() }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.shared.lock().label())
            .finish()
    }
}

impl<T, E> TaskCompletionSource<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Complete the task with a value
    pub fn set_result(self, value: T) {
        self.complete(Ok(value));
    }

    /// Complete the task with an error
    pub fn set_error(self, error: E) {
        self.complete(Err(error));
    }

    /// Complete the task
    pub fn complete(mut self, result: Result<T, E>) {
        self.finish(Some(result));
    }
}

impl<T, E> TaskCompletionSource<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn finish(&mut self, result: Option<Result<T, E>>) {
        if self.done {
            return;
        }
        self.done = true;

        let mut state = self.shared.lock();

        match (std::mem::replace(&mut *state, TaskState::Finished), result) {
            (TaskState::Pending(Some((context, continuation))), Some(result)) => {
                drop(state);
                context.execute(Box::new(move || continuation(result)));
            }
            (TaskState::Pending(None), Some(result)) => {
                *state = TaskState::Completed(result);
            }
            (TaskState::Pending(waiting), None) => {
                drop(state);
                drop(waiting);
                tracing::trace!("Task abandoned before completion");
            }
            (previous, _) => {
                *state = previous;
            }
        }
    }
}

impl<T, E> Drop for TaskCompletionSource<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn drop(&mut self) {
        self.finish(None);
    }
}

impl<T, E> fmt::Debug for TaskCompletionSource<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCompletionSource")
            .field("done", &self.done)
            .finish()
    }
}
