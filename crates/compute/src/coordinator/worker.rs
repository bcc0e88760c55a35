use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chunkbench_core::{Chunk, Task, WorkProfile};
use tracing::{error, trace, warn};

use super::Shared;
use crate::channel::TaskFailure;
use crate::measurement::WorkerTiming;

/// Work handed to a worker for one chunk.
pub(crate) enum Job {
    /// Process `chunk[range]` sequentially.
    Static { chunk: Chunk, range: Range<usize> },
    /// Pull tasks from the shared cursor until it is exhausted.
    Dynamic,
}

/// Running totals of one worker.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WorkerStats {
    /// Sum of every result this worker produced since the last reset.
    pub(crate) accumulated: u64,
    /// Timing of the most recent job.
    pub(crate) last: WorkerTiming,
}

#[derive(Default)]
struct Slot {
    job: Option<Job>,
    dying: bool,
    stats: WorkerStats,
}

#[derive(Default)]
struct WorkerSlot {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl WorkerSlot {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct Tally {
    sum: u64,
    heavy: usize,
    processed: usize,
}

impl Tally {
    fn add(&mut self, task: &Task, profile: &WorkProfile) {
        self.sum += u64::from(task.process(profile));
        self.heavy += usize::from(task.is_heavy);
        self.processed += 1;
    }
}

/// Handle to one long-lived distribution worker thread.
pub(crate) struct Worker {
    index: usize,
    slot: Arc<WorkerSlot>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(
        index: usize,
        shared: Arc<Shared>,
        profile: WorkProfile,
    ) -> std::io::Result<Self> {
        let slot = Arc::new(WorkerSlot::default());
        let thread_slot = Arc::clone(&slot);
        let handle = thread::Builder::new()
            .name(format!("chunk-worker-{index}"))
            .spawn(move || worker_loop(index, &thread_slot, &shared, &profile))?;
        Ok(Self {
            index,
            slot,
            handle: Some(handle),
        })
    }

    /// Hand a job to the worker and wake it.
    pub(crate) fn assign(&self, job: Job) {
        let mut slot = self.slot.lock();
        if slot.job.is_some() {
            warn!(worker = self.index, "replacing a job that was never started");
        }
        slot.job = Some(job);
        drop(slot);
        self.slot.wake.notify_one();
    }

    pub(crate) fn stats(&self) -> WorkerStats {
        self.slot.lock().stats
    }

    pub(crate) fn reset_stats(&self) {
        self.slot.lock().stats = WorkerStats::default();
    }

    /// Ask the worker to exit once its current job is finished.
    pub(crate) fn kill(&self) {
        self.slot.lock().dying = true;
        self.slot.wake.notify_one();
    }

    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = self.index, "worker thread exited with a panic");
            }
        }
    }
}

fn worker_loop(index: usize, slot: &WorkerSlot, shared: &Shared, profile: &WorkProfile) {
    trace!(worker = index, "worker started");
    loop {
        let job = {
            let guard = slot.lock();
            let mut guard = slot
                .wake
                .wait_while(guard, |s| s.job.is_none() && !s.dying)
                .unwrap_or_else(PoisonError::into_inner);
            if guard.dying {
                break;
            }
            match guard.job.take() {
                Some(job) => job,
                None => continue,
            }
        };

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&job, shared, profile)));
        let busy = started.elapsed();

        {
            let mut guard = slot.lock();
            match outcome {
                Ok(tally) => {
                    guard.stats.accumulated += tally.sum;
                    guard.stats.last = WorkerTiming {
                        busy,
                        heavy: tally.heavy,
                        processed: tally.processed,
                    };
                    trace!(
                        worker = index,
                        processed = tally.processed,
                        heavy = tally.heavy,
                        busy_us = busy.as_micros() as u64,
                        "job finished"
                    );
                }
                Err(payload) => {
                    let failure = TaskFailure::from_panic(payload);
                    error!(worker = index, error = %failure, "job panicked");
                    guard.stats.last = WorkerTiming {
                        busy,
                        heavy: 0,
                        processed: 0,
                    };
                }
            }
        }
        shared.barrier.signal_done();
    }
    trace!(worker = index, "worker terminated");
}

fn execute(job: &Job, shared: &Shared, profile: &WorkProfile) -> Tally {
    let mut tally = Tally::default();
    match job {
        Job::Static { chunk, range } => {
            for task in &chunk[range.clone()] {
                tally.add(task, profile);
            }
        }
        Job::Dynamic => {
            while let Some((_, task)) = shared.cursor.claim_next() {
                tally.add(&task, profile);
            }
        }
    }
    tally
}
