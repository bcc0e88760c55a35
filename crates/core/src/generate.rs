//! Synthetic dataset generators.
//!
//! Each generator produces `chunk_count` chunks of `chunk_size` tasks with
//! values drawn uniformly from `[0, π)`. They differ only in where heavy
//! tasks land inside a chunk:
//!
//! - [`DatasetKind::Random`]: every task is heavy with `heavy_probability`.
//! - [`DatasetKind::Evenly`]: every `floor(1 / heavy_probability)`-th task is heavy.
//! - [`DatasetKind::Stacked`]: the evenly layout, partitioned so all heavy
//!   tasks sit at the front of the chunk. This is the worst case for the
//!   static policy.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;
use crate::dataset::Dataset;
use crate::error::CoreError;
use crate::task::Task;

/// Heavy-task placement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    #[default]
    Random,
    Evenly,
    Stacked,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Random => "random",
            DatasetKind::Evenly => "evenly",
            DatasetKind::Stacked => "stacked",
        };
        f.write_str(name)
    }
}

impl FromStr for DatasetKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(DatasetKind::Random),
            "evenly" | "even" => Ok(DatasetKind::Evenly),
            "stacked" => Ok(DatasetKind::Stacked),
            other => Err(CoreError::Config(format!(
                "unknown dataset kind '{other}', expected random, evenly or stacked"
            ))),
        }
    }
}

/// Generate a dataset shaped by `config` using the given placement strategy.
pub fn generate(kind: DatasetKind, config: &ExperimentConfig) -> Result<Dataset, CoreError> {
    if !(0.0..=1.0).contains(&config.heavy_probability) {
        return Err(CoreError::Config(format!(
            "heavy_probability ({}) must be within [0, 1]",
            config.heavy_probability
        )));
    }
    let chunks = match kind {
        DatasetKind::Random => random_chunks(config),
        DatasetKind::Evenly => evenly_chunks(config),
        DatasetKind::Stacked => {
            let mut chunks = evenly_chunks(config);
            for chunk in &mut chunks {
                stack_heavy_first(chunk);
            }
            chunks
        }
    };
    tracing::debug!(
        %kind,
        chunks = chunks.len(),
        chunk_size = config.chunk_size,
        "generated dataset"
    );
    Dataset::from_chunks(chunks)
}

fn random_chunks(config: &ExperimentConfig) -> Vec<Vec<Task>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    (0..config.chunk_count)
        .map(|_| {
            (0..config.chunk_size)
                .map(|_| Task {
                    value: rng.gen_range(0.0..PI),
                    is_heavy: rng.gen_bool(config.heavy_probability),
                })
                .collect()
        })
        .collect()
}

fn evenly_chunks(config: &ExperimentConfig) -> Vec<Vec<Task>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let every_nth = heavy_period(config.heavy_probability);
    (0..config.chunk_count)
        .map(|_| {
            (0..config.chunk_size)
                .map(|i| Task {
                    value: rng.gen_range(0.0..PI),
                    is_heavy: every_nth.is_some_and(|n| i % n == 0),
                })
                .collect()
        })
        .collect()
}

/// Distance between heavy tasks for the evenly layout; `None` means no heavy tasks.
fn heavy_period(probability: f64) -> Option<usize> {
    if probability <= 0.0 {
        return None;
    }
    Some(((1.0 / probability) as usize).max(1))
}

/// Stable partition: heavy tasks first, relative order otherwise preserved.
fn stack_heavy_first(chunk: &mut Vec<Task>) {
    let (heavy, light): (Vec<Task>, Vec<Task>) = chunk.drain(..).partition(|t| t.is_heavy);
    chunk.extend(heavy);
    chunk.extend(light);
}
