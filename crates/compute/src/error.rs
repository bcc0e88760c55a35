use chunkbench_core::CoreError;
use thiserror::Error;

/// Errors raised while building a [`WorkerPool`](crate::pool::WorkerPool).
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors raised by the distribution coordinator.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] CoreError),

    #[error("dataset chunk size {actual} does not match configured chunk size {expected}")]
    DatasetShape { expected: usize, actual: usize },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("coordinator has been shut down")]
    Stopped,
}
