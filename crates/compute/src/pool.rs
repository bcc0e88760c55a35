//! Fixed-size worker pool draining a shared FIFO queue of [`TaskUnit`]s.
//!
//! Each worker thread cycles `Idle -> Executing -> Idle` until stop is
//! requested, then moves to `Terminated`. Stop is cooperative: a unit that
//! is already executing runs to completion, queued units are dropped and
//! their futures stay pending.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::channel::TaskFuture;
use crate::error::PoolError;
use crate::task_unit::TaskUnit;

/// Lifecycle of a single pool thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Executing,
    Terminated,
}

struct PoolQueue {
    tasks: VecDeque<TaskUnit>,
    stop: bool,
    states: Vec<WorkerState>,
}

struct PoolShared {
    queue: Mutex<PoolQueue>,
    /// Signalled when a unit is queued or stop is requested.
    available: Condvar,
    /// Signalled when the queue runs empty or stop is requested.
    drained: Condvar,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fixed set of background threads executing queued work in FIFO order.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` named worker threads.
    pub fn new(worker_count: usize) -> Result<Self, PoolError> {
        if worker_count == 0 {
            return Err(PoolError::NoWorkers);
        }

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(PoolQueue {
                tasks: VecDeque::new(),
                stop: false,
                states: vec![WorkerState::Idle; worker_count],
            }),
            available: Condvar::new(),
            drained: Condvar::new(),
        });

        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(worker_count),
        };
        for index in 0..worker_count {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("pool-worker-{index}"))
                .spawn(move || worker_loop(&shared, index));
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    // Threads spawned so far are stopped and joined by shutdown.
                    pool.shutdown();
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        info!(workers = worker_count, "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.shared.lock().states.len()
    }

    /// Queue `f` and return the future that will carry its result.
    ///
    /// Returns immediately. If stop has already been requested the work is
    /// dropped and the future never completes.
    pub fn run<F, T>(&self, f: F) -> TaskFuture<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (unit, future) = TaskUnit::new(f);
        self.run_unit(unit);
        future
    }

    /// Queue an already bound unit. Returns `false` if the pool is stopping.
    pub fn run_unit(&self, unit: TaskUnit) -> bool {
        let mut queue = self.shared.lock();
        if queue.stop {
            drop(queue);
            warn!("worker pool is stopping; task dropped and its future abandoned");
            return false;
        }
        queue.tasks.push_back(unit);
        trace!(queued = queue.tasks.len(), "task queued");
        drop(queue);
        self.shared.available.notify_one();
        true
    }

    /// Block until the queue is empty or stop has been requested.
    ///
    /// Units that were already dequeued may still be executing when this
    /// returns; use their futures to wait for results.
    pub fn wait_for_all_done(&self) {
        let queue = self.shared.lock();
        let _queue = self
            .shared
            .drained
            .wait_while(queue, |q| !q.tasks.is_empty() && !q.stop)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Ask every worker to stop after its current unit. Does not wait.
    pub fn request_stop(&self) {
        let mut queue = self.shared.lock();
        if !queue.stop {
            queue.stop = true;
            debug!(abandoned = queue.tasks.len(), "stop requested");
        }
        drop(queue);
        self.shared.available.notify_all();
        self.shared.drained.notify_all();
    }

    /// Request stop, join every worker and drop whatever is still queued.
    pub fn shutdown(&mut self) {
        self.request_stop();
        let joined = self.handles.len();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
        let abandoned = {
            let mut queue = self.shared.lock();
            let abandoned = queue.tasks.len();
            queue.tasks.clear();
            abandoned
        };
        if joined > 0 {
            if abandoned > 0 {
                warn!(abandoned, "worker pool shut down with queued tasks");
            }
            info!(workers = joined, "worker pool stopped");
        }
    }

    /// Snapshot of every worker's lifecycle state.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.shared.lock().states.clone()
    }

    /// Number of units waiting to be picked up.
    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.handles.len())
            .field("queued", &self.queued())
            .finish()
    }
}

fn worker_loop(shared: &PoolShared, index: usize) {
    trace!(worker = index, "worker started");
    loop {
        let unit = {
            let mut queue = shared.lock();
            queue.states[index] = WorkerState::Idle;
            queue = shared
                .available
                .wait_while(queue, |q| q.tasks.is_empty() && !q.stop)
                .unwrap_or_else(PoisonError::into_inner);
            if queue.stop {
                queue.states[index] = WorkerState::Terminated;
                break;
            }
            let Some(unit) = queue.tasks.pop_front() else {
                continue;
            };
            queue.states[index] = WorkerState::Executing;
            if queue.tasks.is_empty() {
                shared.drained.notify_all();
            }
            unit
        };
        unit.run();
    }
    trace!(worker = index, "worker terminated");
}
