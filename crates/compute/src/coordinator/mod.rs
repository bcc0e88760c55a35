//! Chunk-by-chunk distribution of a [`Dataset`] over a fixed set of workers.
//!
//! Two policies are supported:
//!
//! - [`Policy::Static`]: each chunk is cut into `worker_count` equal,
//!   contiguous sub-ranges and worker `i` gets `[i * subset, (i + 1) * subset)`.
//! - [`Policy::Dynamic`]: the chunk is published behind a shared cursor and
//!   every worker pulls the next unclaimed task until none are left.
//!
//! In both cases the controller waits on a [`CompletionBarrier`] before
//! moving to the next chunk, and records a [`ChunkTiming`] per chunk.

mod cursor;
mod worker;


use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chunkbench_core::{CoreError, Dataset, ExperimentConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::barrier::CompletionBarrier;
use crate::error::CoordinatorError;
use crate::measurement::{ChunkTiming, ExperimentReport};

use cursor::ChunkCursor;
use worker::{Job, Worker};

/// How a chunk's tasks are divided between workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Static,
    Dynamic,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Static => f.write_str("static"),
            Policy::Dynamic => f.write_str("dynamic"),
        }
    }
}

impl FromStr for Policy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Policy::Static),
            "dynamic" | "queued" => Ok(Policy::Dynamic),
            other => Err(CoreError::Config(format!(
                "unknown policy '{other}', expected static or dynamic"
            ))),
        }
    }
}

/// State every worker shares with the controller.
pub(crate) struct Shared {
    pub(crate) barrier: CompletionBarrier,
    pub(crate) cursor: ChunkCursor,
}

/// Owns the distribution workers and drives datasets through them.
pub struct Coordinator {
    policy: Policy,
    chunk_size: usize,
    subset_size: usize,
    shared: Arc<Shared>,
    workers: Vec<Worker>,
}

impl Coordinator {
    /// Validate `config` and spawn `config.worker_count` workers.
    pub fn new(config: &ExperimentConfig, policy: Policy) -> Result<Self, CoordinatorError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            barrier: CompletionBarrier::new(config.worker_count),
            cursor: ChunkCursor::default(),
        });
        let profile = config.work_profile();

        let mut coordinator = Self {
            policy,
            chunk_size: config.chunk_size,
            subset_size: config.subset_size(),
            shared,
            workers: Vec::with_capacity(config.worker_count),
        };
        for index in 0..config.worker_count {
            match Worker::spawn(index, Arc::clone(&coordinator.shared), profile) {
                Ok(worker) => coordinator.workers.push(worker),
                Err(e) => {
                    coordinator.shutdown();
                    return Err(CoordinatorError::Spawn(e));
                }
            }
        }

        info!(
            %policy,
            workers = config.worker_count,
            chunk_size = config.chunk_size,
            "coordinator started"
        );
        Ok(coordinator)
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Run every chunk of `dataset` and report per-chunk timings.
    ///
    /// Worker accumulations start from zero on each call, so the report's
    /// `final_result` covers exactly this dataset.
    pub fn process(&mut self, dataset: &Dataset) -> Result<ExperimentReport, CoordinatorError> {
        if self.workers.is_empty() {
            return Err(CoordinatorError::Stopped);
        }
        if !dataset.is_empty() && dataset.chunk_size() != self.chunk_size {
            return Err(CoordinatorError::DatasetShape {
                expected: self.chunk_size,
                actual: dataset.chunk_size(),
            });
        }

        for worker in &self.workers {
            worker.reset_stats();
        }

        let run_started = Instant::now();
        let mut chunks = Vec::with_capacity(dataset.len());
        for (index, chunk) in dataset.chunks().iter().enumerate() {
            let started = Instant::now();
            match self.policy {
                Policy::Static => {
                    for (i, worker) in self.workers.iter().enumerate() {
                        worker.assign(Job::Static {
                            chunk: Arc::clone(chunk),
                            range: static_range(i, self.subset_size),
                        });
                    }
                }
                Policy::Dynamic => {
                    self.shared.cursor.publish(Arc::clone(chunk));
                    for worker in &self.workers {
                        worker.assign(Job::Dynamic);
                    }
                }
            }
            self.shared.barrier.wait_for_all_done();
            let wall = started.elapsed();

            let timing = ChunkTiming {
                index,
                wall,
                workers: self.workers.iter().map(|w| w.stats().last).collect(),
            };
            debug!(
                chunk = index,
                wall_us = wall.as_micros() as u64,
                heavy = timing.total_heavy(),
                processed = timing.total_processed(),
                "chunk done"
            );
            chunks.push(timing);
        }
        self.shared.cursor.clear();

        let final_result = self.workers.iter().map(|w| w.stats().accumulated).sum();
        Ok(ExperimentReport {
            policy: self.policy,
            worker_count: self.workers.len(),
            chunks,
            final_result,
            total_time: run_started.elapsed(),
        })
    }

    /// Stop and join every worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for worker in &self.workers {
            worker.kill();
        }
        for worker in &mut self.workers {
            worker.join();
        }
        let workers = self.workers.len();
        self.workers.clear();
        info!(workers, "coordinator stopped");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("policy", &self.policy)
            .field("workers", &self.workers.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// Contiguous slice of a chunk assigned to `worker` under the static policy.
pub(crate) fn static_range(worker: usize, subset_size: usize) -> std::ops::Range<usize> {
    worker * subset_size..(worker + 1) * subset_size
}

/// Build a coordinator, run `dataset` through it and shut it down.
pub fn run_experiment(
    config: &ExperimentConfig,
    policy: Policy,
    dataset: &Dataset,
) -> Result<ExperimentReport, CoordinatorError> {
    let mut coordinator = Coordinator::new(config, policy)?;
    let report = coordinator.process(dataset);
    coordinator.shutdown();
    report
}
