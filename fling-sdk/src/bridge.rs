//! Task-to-callback bridge
//!
//! Every capability call hands the vendor's [`ApiTask`] to an
//! [`AsyncResultBridge`], which turns it into exactly one invocation of either
//! the success handler or the failure handler. Handlers always run on the
//! bridge's callback context, never on the thread that completed the task.
//!
//! # Call shapes
//!
//! - [`continue_task`](AsyncResultBridge::continue_task): plain success/failure pair
//! - [`continue_task_with_completer`](AsyncResultBridge::continue_task_with_completer):
//!   a completer that always receives the raw value, plus failure
//! - [`continue_task_mapped`](AsyncResultBridge::continue_task_mapped): a
//!   transform that always runs, then an optional success handler
//!
//! A missing task (`None`) fails with [`ServiceError::UnsupportedOperation`]
//! through the same failure path, so callers need a single error branch.

use std::fmt;
use std::sync::Arc;

use fling_api::ApiTask;
use fling_runtime::{same_context, SharedContext};

use crate::error::ServiceError;

/// Handler for a successful result
pub type SuccessHandler<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Handler for a failed operation
pub type FailureHandler = Box<dyn FnOnce(ServiceError) + Send + 'static>;

/// Handler for repeated updates of a subscription
pub type UpdateHandler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Converts single-shot tasks into callback invocations
#[derive(Clone)]
pub struct AsyncResultBridge {
    executor: SharedContext,
    callback_context: SharedContext,
}

impl AsyncResultBridge {
    /// Run everything on `callback_context`
    pub fn new(callback_context: SharedContext) -> Self {
        Self {
            executor: callback_context.clone(),
            callback_context,
        }
    }

    /// Run transforms and completers on `executor` and handlers on `callback_context`
    pub fn with_executor(executor: SharedContext, callback_context: SharedContext) -> Self {
        Self {
            executor,
            callback_context,
        }
    }

    pub fn executor(&self) -> &SharedContext {
        &self.executor
    }

    pub fn callback_context(&self) -> &SharedContext {
        &self.callback_context
    }

    /// Deliver the task's value to `success` or its error to `failure`
    ///
    /// Either handler may be omitted; an omitted handler is simply skipped.
    pub fn continue_task<T>(
        &self,
        task: Option<ApiTask<T>>,
        success: Option<SuccessHandler<T>>,
        failure: Option<FailureHandler>,
    ) where
        T: Send + 'static,
    {
        let Some(task) = task else {
            return self.fail_unsupported(failure, "operation");
        };

        task.continue_with(self.callback_context.clone(), move |result| match result {
            Ok(value) => {
                if let Some(success) = success {
                    success(value);
                }
            }
            Err(error) => call_failure(failure, ServiceError::Vendor(error)),
        });
    }

    /// Feed the task's value to `completer`, or its error to `failure`
    ///
    /// The completer runs on the executor and is responsible for reporting
    /// success itself, usually through [`succeed`](Self::succeed).
    pub fn continue_task_with_completer<T, C>(
        &self,
        task: Option<ApiTask<T>>,
        completer: C,
        failure: Option<FailureHandler>,
    ) where
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let Some(task) = task else {
            return self.fail_unsupported(failure, "operation");
        };

        let callback_context = self.callback_context.clone();
        task.continue_with(self.executor.clone(), move |result| match result {
            Ok(value) => completer(value),
            Err(error) => {
                dispatch_failure(&callback_context, failure, ServiceError::Vendor(error))
            }
        });
    }

    /// Transform the task's value, then hand it to `success` if one was given
    ///
    /// The transform runs even without a success handler, for side effects.
    pub fn continue_task_mapped<T, U, M>(
        &self,
        task: Option<ApiTask<T>>,
        transform: M,
        success: Option<SuccessHandler<U>>,
        failure: Option<FailureHandler>,
    ) where
        T: Send + 'static,
        U: Send + 'static,
        M: FnOnce(T) -> U + Send + 'static,
    {
        self.continue_task_try_mapped(task, move |value| Ok(transform(value)), success, failure);
    }

    /// Like [`continue_task_mapped`](Self::continue_task_mapped) with a fallible transform
    ///
    /// A transform error goes to `failure`.
    pub fn continue_task_try_mapped<T, U, M>(
        &self,
        task: Option<ApiTask<T>>,
        transform: M,
        success: Option<SuccessHandler<U>>,
        failure: Option<FailureHandler>,
    ) where
        T: Send + 'static,
        U: Send + 'static,
        M: FnOnce(T) -> Result<U, ServiceError> + Send + 'static,
    {
        let Some(task) = task else {
            return self.fail_unsupported(failure, "operation");
        };

        let bridge = self.clone();
        task.continue_with(self.executor.clone(), move |result| {
            match result.map_err(ServiceError::Vendor).and_then(transform) {
                Ok(value) => {
                    if let Some(success) = success {
                        bridge.run_on_callback_context(move || success(value));
                    }
                }
                Err(error) => dispatch_failure(&bridge.callback_context, failure, error),
            }
        });
    }

    /// Report success with `value` on the callback context
    pub fn succeed<T>(&self, success: Option<SuccessHandler<T>>, value: T)
    where
        T: Send + 'static,
    {
        if let Some(success) = success {
            self.callback_context.execute(Box::new(move || success(value)));
        }
    }

    /// Report `error` on the callback context
    pub fn fail(&self, failure: Option<FailureHandler>, error: ServiceError) {
        dispatch_failure(&self.callback_context, failure, error);
    }

    /// Fail with [`ServiceError::UnsupportedOperation`] for `operation`
    pub fn fail_unsupported(&self, failure: Option<FailureHandler>, operation: &str) {
        tracing::debug!("Unsupported operation: {}", operation);
        self.fail(failure, ServiceError::unsupported(operation));
    }

    /// Run `job` on the callback context, inline if the executor already is that context
    fn run_on_callback_context(&self, job: impl FnOnce() + Send + 'static) {
        if same_context(&self.executor, &self.callback_context) {
            job();
        } else {
            self.callback_context.execute(Box::new(job));
        }
    }
}

impl fmt::Debug for AsyncResultBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResultBridge")
            .field("executor", &self.executor.name())
            .field("callback_context", &self.callback_context.name())
            .finish()
    }
}

fn call_failure(failure: Option<FailureHandler>, error: ServiceError) {
    match failure {
        Some(failure) => failure(error),
        None => tracing::debug!("Operation failed without a failure handler: {}", error),
    }
}

fn dispatch_failure(context: &SharedContext, failure: Option<FailureHandler>, error: ServiceError) {
    match failure {
        Some(failure) => context.execute(Box::new(move || failure(error))),
        None => tracing::debug!("Operation failed without a failure handler: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fling_api::ApiError;
    use fling_runtime::{ImmediateContext, SerialContext, Task};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn immediate() -> AsyncResultBridge {
        AsyncResultBridge::new(ImmediateContext::shared())
    }

    #[test]
    fn test_success_fires_once() {
        let (tx, rx) = mpsc::channel();
        let fail_tx = tx.clone();

        immediate().continue_task(
            Some(Task::<f64, ApiError>::completed(0.5)),
            Some(Box::new(move |v: f64| tx.send(format!("ok {v}")).unwrap())),
            Some(Box::new(move |e: ServiceError| {
                fail_tx.send(format!("err {e}")).unwrap()
            })),
        );

        assert_eq!(rx.try_recv().unwrap(), "ok 0.5");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failure_is_normalized() {
        let (tx, rx) = mpsc::channel();

        immediate().continue_task::<()>(
            Some(Task::failed(ApiError::remote("offline"))),
            Some(Box::new(|_| panic!("success must not fire"))),
            Some(Box::new(move |e: ServiceError| tx.send(e).unwrap())),
        );

        let error = rx.try_recv().unwrap();
        assert!(matches!(error, ServiceError::Vendor(_)));
        assert!(error.to_string().contains("offline"));
    }

    #[test]
    fn test_missing_task_is_unsupported() {
        let (tx, rx) = mpsc::channel();

        immediate().continue_task::<()>(None, None, Some(Box::new(move |e: ServiceError| tx.send(e).unwrap())));

        assert!(matches!(
            rx.try_recv().unwrap(),
            ServiceError::UnsupportedOperation(_)
        ));
    }

    #[test]
    fn test_missing_handlers_are_skipped() {
        immediate().continue_task::<()>(Some(Task::completed(())), None, None);
        immediate().continue_task::<()>(Some(Task::failed(ApiError::Timeout)), None, None);
        immediate().continue_task::<()>(None, None, None);
    }

    #[test]
    fn test_transform_runs_without_success_handler() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        immediate().continue_task_mapped::<i64, i64, _>(
            Some(Task::completed(1500)),
            move |ms| {
                counter.fetch_add(1, Ordering::SeqCst);
                ms / 1000
            },
            None,
            None,
        );

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_mapped_error_goes_to_failure() {
        let (tx, rx) = mpsc::channel();

        immediate().continue_task_try_mapped::<String, u32, _>(
            Some(Task::completed("not a number".to_string())),
            |s| s.parse().map_err(|_| ServiceError::invalid_argument(s)),
            Some(Box::new(|_| panic!("success must not fire"))),
            Some(Box::new(move |e: ServiceError| tx.send(e).unwrap())),
        );

        assert!(matches!(
            rx.try_recv().unwrap(),
            ServiceError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_completer_receives_raw_value() {
        let (tx, rx) = mpsc::channel();

        immediate().continue_task_with_completer(
            Some(Task::<bool, ApiError>::completed(true)),
            move |muted| tx.send(muted).unwrap(),
            None,
        );

        assert!(rx.try_recv().unwrap());
    }

    #[test]
    fn test_handlers_run_on_callback_context() {
        let context = SerialContext::shared("bridge-callbacks").unwrap();
        let bridge = AsyncResultBridge::new(context.clone());
        let (source, task) = Task::<(), ApiError>::pending();
        let (tx, rx) = mpsc::channel();

        let on_context = Arc::clone(&context);
        bridge.continue_task(
            Some(task),
            Some(Box::new(move |()| tx.send(on_context.is_current()).unwrap())),
            None,
        );

        std::thread::spawn(move || source.set_result(()))
            .join()
            .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn test_mapped_hops_from_executor_to_callback_context() {
        let executor = SerialContext::shared("bridge-executor").unwrap();
        let callbacks = SerialContext::shared("bridge-ui").unwrap();
        let bridge = AsyncResultBridge::with_executor(executor.clone(), callbacks.clone());
        let (tx, rx) = mpsc::channel();

        let on_executor = Arc::clone(&executor);
        let on_callbacks = Arc::clone(&callbacks);
        let transform_tx = tx.clone();
        bridge.continue_task_mapped(
            Some(Task::<i64, ApiError>::completed(2000)),
            move |ms| {
                transform_tx.send(("transform", on_executor.is_current())).unwrap();
                ms / 1000
            },
            Some(Box::new(move |_secs: i64| {
                tx.send(("success", on_callbacks.is_current())).unwrap();
            })),
            None,
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), ("transform", true));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), ("success", true));
    }
}
