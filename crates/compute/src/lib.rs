//! Thread-based execution engine and chunk distribution harness.
//!
//! The general-purpose half is [`WorkerPool`] plus the one-shot
//! [`Promise`]/[`TaskFuture`] channel and [`TaskUnit`]. The experiment half
//! is [`Coordinator`], which runs a dataset chunk by chunk under a static or
//! dynamic [`Policy`] and reports an [`ExperimentReport`].

pub mod barrier;
pub mod channel;
pub mod coordinator;
pub mod error;
pub mod measurement;
pub mod pool;
pub mod task_unit;

pub use barrier::CompletionBarrier;
pub use channel::{ChannelError, Promise, TaskFailure, TaskFuture, channel};
pub use coordinator::{Coordinator, Policy, run_experiment};
pub use error::{CoordinatorError, PoolError};
pub use measurement::{ChunkTiming, ExperimentReport, MeasurementAnomaly, WorkerTiming};
pub use pool::{WorkerPool, WorkerState};
pub use task_unit::TaskUnit;
