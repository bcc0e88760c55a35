//! Per-chunk timing records and the experiment report built from them.
//!
//! Busy time is measured inside each worker; wall time by the controller.
//! Idle time is always derived as `wall - busy` in signed seconds and never
//! stored, so a worker whose busy time exceeds the chunk wall time (clock
//! skew) shows up as a [`MeasurementAnomaly`] instead of being clamped.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::coordinator::Policy;

/// What one worker did during one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerTiming {
    #[serde(serialize_with = "as_secs")]
    pub busy: Duration,
    pub heavy: usize,
    pub processed: usize,
}

/// Timing record for one chunk, produced after its barrier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkTiming {
    pub index: usize,
    #[serde(serialize_with = "as_secs")]
    pub wall: Duration,
    pub workers: Vec<WorkerTiming>,
}

impl ChunkTiming {
    /// `wall - busy` for one worker, in signed seconds.
    pub fn idle_secs(&self, worker: usize) -> f64 {
        self.workers
            .get(worker)
            .map(|w| self.wall.as_secs_f64() - w.busy.as_secs_f64())
            .unwrap_or(0.0)
    }

    pub fn total_idle_secs(&self) -> f64 {
        (0..self.workers.len()).map(|w| self.idle_secs(w)).sum()
    }

    pub fn total_heavy(&self) -> usize {
        self.workers.iter().map(|w| w.heavy).sum()
    }

    pub fn total_processed(&self) -> usize {
        self.workers.iter().map(|w| w.processed).sum()
    }

    /// Workers whose derived idle time is negative.
    pub fn anomalies(&self) -> impl Iterator<Item = MeasurementAnomaly> + '_ {
        (0..self.workers.len()).filter_map(move |worker| {
            let idle_secs = self.idle_secs(worker);
            (idle_secs < 0.0).then_some(MeasurementAnomaly {
                chunk: self.index,
                worker,
                idle_secs,
            })
        })
    }
}

/// A worker reported more busy time than the chunk took overall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementAnomaly {
    pub chunk: usize,
    pub worker: usize,
    pub idle_secs: f64,
}

/// Outcome of running a whole dataset through a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub policy: Policy,
    pub worker_count: usize,
    pub chunks: Vec<ChunkTiming>,
    /// Sum of every processed task's result.
    pub final_result: u64,
    #[serde(serialize_with = "as_secs")]
    pub total_time: Duration,
}

impl ExperimentReport {
    pub fn anomalies(&self) -> Vec<MeasurementAnomaly> {
        self.chunks.iter().flat_map(ChunkTiming::anomalies).collect()
    }

    pub fn total_idle_secs(&self) -> f64 {
        self.chunks.iter().map(ChunkTiming::total_idle_secs).sum()
    }

    pub fn total_heavy(&self) -> usize {
        self.chunks.iter().map(ChunkTiming::total_heavy).sum()
    }

    pub fn total_processed(&self) -> usize {
        self.chunks.iter().map(ChunkTiming::total_processed).sum()
    }

    /// Log a one-line outcome of the run.
    pub fn log_summary(&self) {
        tracing::info!(
            policy = %self.policy,
            workers = self.worker_count,
            chunks = self.chunks.len(),
            processed = self.total_processed(),
            heavy = self.total_heavy(),
            idle_secs = format_args!("{:.4}", self.total_idle_secs()),
            total_secs = format_args!("{:.4}", self.total_time.as_secs_f64()),
            final_result = self.final_result,
            "experiment finished"
        );
    }
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
