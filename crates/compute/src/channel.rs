//! One-shot result channel between a task producer and a single reader.
//!
//! A [`Promise`] and its [`TaskFuture`] share a slot that moves from
//! *pending* to *completed* exactly once. The first `set`/`set_failure`
//! wins; later writes are ignored. The reader is woken through thread
//! park/unpark, so the channel needs no mutex: the slot is guarded by the
//! state atomic and is written by the winning producer and read by the
//! single future, each at most once.

use std::any::Any;
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, Ordering, fence};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use thiserror::Error;

const PENDING: u8 = 0;
const WRITING: u8 = 1;
const COMPLETE: u8 = 2;

/// Opaque failure token carried through the channel instead of a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a failure from a panic payload caught with `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked with a non-string payload".to_string()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by the result channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("result already consumed")]
    ResultAlreadyConsumed,

    #[error("future already retrieved")]
    FutureAlreadyRetrieved,

    #[error("task failed: {0}")]
    TaskFailed(#[from] TaskFailure),

    #[error("no result after {0:?}")]
    Timeout(Duration),
}

// ── Shared state ──────────────────────────────────────────────

struct Shared<T> {
    state: AtomicU8,
    outcome: UnsafeCell<Option<Result<T, TaskFailure>>>,
    /// Boxed handle of the thread blocked in `wait`, or null.
    waiter: AtomicPtr<Thread>,
    future_retrieved: AtomicBool,
}

// SAFETY: `outcome` is written only by the producer that wins the
// PENDING -> WRITING transition and read only by the future after it
// observes COMPLETE with acquire ordering. `TaskFuture` takes `&mut self`
// for every operation that touches `outcome` or `waiter` registration.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            outcome: UnsafeCell::new(None),
            waiter: AtomicPtr::new(ptr::null_mut()),
            future_retrieved: AtomicBool::new(false),
        }
    }

    fn is_complete(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETE
    }

    fn complete(&self, outcome: Result<T, TaskFailure>) -> bool {
        if self
            .state
            .compare_exchange(PENDING, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        // SAFETY: the CAS above makes this thread the only writer, and the
        // reader does not touch `outcome` until it sees COMPLETE.
        unsafe {
            *self.outcome.get() = Some(outcome);
        }
        self.state.store(COMPLETE, Ordering::Release);

        // Pairs with the fence in `wait`: either the reader sees COMPLETE
        // or we see its registered thread.
        fence(Ordering::SeqCst);
        let waiter = self.waiter.swap(ptr::null_mut(), Ordering::AcqRel);
        if !waiter.is_null() {
            // SAFETY: produced by `Box::into_raw` in `wait`; the swap gave us
            // sole ownership.
            let thread = unsafe { Box::from_raw(waiter) };
            thread.unpark();
        }
        true
    }

    /// Block until complete or until `deadline`. Returns whether complete.
    fn wait(&self, deadline: Option<Instant>) -> bool {
        if self.is_complete() {
            return true;
        }

        let me = Box::into_raw(Box::new(thread::current()));
        let previous = self.waiter.swap(me, Ordering::AcqRel);
        if !previous.is_null() {
            // SAFETY: a stale registration from an earlier timed-out wait.
            drop(unsafe { Box::from_raw(previous) });
        }
        fence(Ordering::SeqCst);

        loop {
            if self.is_complete() {
                return true;
            }
            match deadline {
                None => thread::park(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    thread::park_timeout(deadline - now);
                }
            }
        }
    }

    /// Move the outcome out of the slot. Only the single reader calls this,
    /// after `wait` returned true.
    fn take(&self) -> Option<Result<T, TaskFailure>> {
        debug_assert!(self.is_complete());
        // SAFETY: COMPLETE was observed with acquire ordering, so the
        // producer's write is visible and no other thread touches the slot.
        unsafe { (*self.outcome.get()).take() }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let waiter = *self.waiter.get_mut();
        if !waiter.is_null() {
            // SAFETY: no other handle exists once the last Arc is dropped.
            drop(unsafe { Box::from_raw(waiter) });
        }
    }
}

// ── Producer ──────────────────────────────────────────────────

/// Producer side of the channel.
///
/// Dropping a promise without completing it leaves its future pending
/// forever; the result is then considered abandoned.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    /// Hand out the single reader handle.
    pub fn get_future(&self) -> Result<TaskFuture<T>, ChannelError> {
        if self.shared.future_retrieved.swap(true, Ordering::AcqRel) {
            return Err(ChannelError::FutureAlreadyRetrieved);
        }
        Ok(TaskFuture {
            shared: Arc::clone(&self.shared),
            consumed: false,
        })
    }

    /// Complete with a value. Returns `false` if already completed.
    pub fn set(&self, value: T) -> bool {
        self.shared.complete(Ok(value))
    }

    /// Complete with a failure. Returns `false` if already completed.
    pub fn set_failure(&self, failure: TaskFailure) -> bool {
        self.shared.complete(Err(failure))
    }

    pub fn is_complete(&self) -> bool {
        self.shared.is_complete()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("complete", &self.is_complete())
            .finish()
    }
}

// ── Reader ────────────────────────────────────────────────────

/// Reader side of the channel. The result can be consumed once.
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
    consumed: bool,
}

impl<T> TaskFuture<T> {
    /// Whether a value or failure has been published. Never blocks or consumes.
    pub fn ready(&self) -> bool {
        self.shared.is_complete()
    }

    /// Block until the result is published, without consuming it.
    pub fn wait(&mut self) {
        self.shared.wait(None);
    }

    /// Wait up to `timeout` without consuming. Returns whether it is ready.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        self.shared.wait(Some(Instant::now() + timeout))
    }

    /// Block until the result is published, then take it.
    ///
    /// A stored failure comes back as [`ChannelError::TaskFailed`]. Calling
    /// `get` again yields [`ChannelError::ResultAlreadyConsumed`].
    pub fn get(&mut self) -> Result<T, ChannelError> {
        if self.consumed {
            return Err(ChannelError::ResultAlreadyConsumed);
        }
        self.shared.wait(None);
        self.consume()
    }

    /// Like [`TaskFuture::get`] but gives up after `timeout`.
    ///
    /// A timeout does not consume the future; `get` may be retried.
    pub fn get_timeout(&mut self, timeout: Duration) -> Result<T, ChannelError> {
        if self.consumed {
            return Err(ChannelError::ResultAlreadyConsumed);
        }
        if !self.shared.wait(Some(Instant::now() + timeout)) {
            return Err(ChannelError::Timeout(timeout));
        }
        self.consume()
    }

    fn consume(&mut self) -> Result<T, ChannelError> {
        self.consumed = true;
        match self.shared.take() {
            Some(Ok(value)) => Ok(value),
            Some(Err(failure)) => Err(ChannelError::TaskFailed(failure)),
            None => Err(ChannelError::ResultAlreadyConsumed),
        }
    }
}

impl<T> std::fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFuture")
            .field("ready", &self.ready())
            .field("consumed", &self.consumed)
            .finish()
    }
}

/// Create a promise together with its future.
pub fn channel<T>() -> (Promise<T>, TaskFuture<T>) {
    let shared = Arc::new(Shared::new());
    shared.future_retrieved.store(true, Ordering::Relaxed);
    let future = TaskFuture {
        shared: Arc::clone(&shared),
        consumed: false,
    };
    (Promise { shared }, future)
}
