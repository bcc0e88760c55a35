use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::channel::{Promise, TaskFailure, TaskFuture, channel};

/// A type-erased, move-only unit of work bound to its result promise.
///
/// Running a unit consumes it, so it can execute at most once. Whatever the
/// closure does (return a value, return an error, panic) ends up in the
/// channel; the calling worker thread never unwinds.
pub struct TaskUnit {
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl TaskUnit {
    /// Wrap an infallible closure. A panic becomes a [`TaskFailure`].
    pub fn new<F, T>(f: F) -> (Self, TaskFuture<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (promise, future) = channel();
        let unit = Self::bind(promise, move || Ok(f()));
        (unit, future)
    }

    /// Wrap a fallible closure. `Err` and panics both become a [`TaskFailure`].
    pub fn fallible<F, T, E>(f: F) -> (Self, TaskFuture<T>)
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display,
    {
        let (promise, future) = channel();
        let unit = Self::bind(promise, move || f().map_err(|e| TaskFailure::new(e.to_string())));
        (unit, future)
    }

    /// Bind a closure to an existing promise.
    pub fn bind<F, T>(promise: Promise<T>, f: F) -> Self
    where
        F: FnOnce() -> Result<T, TaskFailure> + Send + 'static,
        T: Send + 'static,
    {
        let job = move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(outcome) => outcome,
                Err(payload) => Err(TaskFailure::from_panic(payload)),
            };
            match outcome {
                Ok(value) => {
                    promise.set(value);
                }
                Err(failure) => {
                    tracing::debug!(error = %failure, "task failed");
                    promise.set_failure(failure);
                }
            }
        };
        Self { job: Box::new(job) }
    }

    /// Execute the closure and publish its outcome.
    pub fn run(self) {
        (self.job)();
    }
}

impl fmt::Debug for TaskUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskUnit").finish_non_exhaustive()
    }
}
