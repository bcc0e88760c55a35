use std::sync::Arc;

use anyhow::{Context, Result};
use chunkbench_compute::{TaskFuture, WorkerPool};
use chunkbench_core::{Dataset, ExperimentConfig, chunk_sum};
use tracing::{error, info};

/// Recompute the dataset aggregate through the worker pool, one future per
/// chunk, and compare it with the coordinator's result and the rayon
/// reference sum.
pub fn check(config: &ExperimentConfig, dataset: &Dataset, coordinator_result: u64) -> Result<bool> {
    let profile = config.work_profile();
    let pool = WorkerPool::new(config.worker_count).context("failed to start worker pool")?;

    let mut futures: Vec<TaskFuture<u64>> = dataset
        .chunks()
        .iter()
        .map(|chunk| {
            let chunk = Arc::clone(chunk);
            pool.run(move || chunk_sum(&chunk, &profile))
        })
        .collect();
    pool.wait_for_all_done();

    let mut pooled = 0_u64;
    for (index, future) in futures.iter_mut().enumerate() {
        pooled += future
            .get()
            .with_context(|| format!("chunk {index} failed in worker pool"))?;
    }
    let reference = dataset.reference_sum(&profile);

    let ok = pooled == reference && coordinator_result == reference;
    if ok {
        info!(result = reference, "verification passed");
    } else {
        error!(
            coordinator = coordinator_result,
            pool = pooled,
            reference,
            "verification failed: results differ"
        );
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use chunkbench_core::{DatasetKind, generate};

    use super::*;

    fn small() -> ExperimentConfig {
        ExperimentConfig {
            worker_count: 2,
            chunk_size: 32,
            chunk_count: 4,
            light_iterations: 5,
            heavy_iterations: 40,
            ..Default::default()
        }
    }

    #[test]
    fn matching_result_passes() {
        let cfg = small();
        let dataset = generate(DatasetKind::Random, &cfg).unwrap();
        let expected = dataset.reference_sum(&cfg.work_profile());
        assert!(check(&cfg, &dataset, expected).unwrap());
    }

    #[test]
    fn wrong_result_fails() {
        let cfg = small();
        let dataset = generate(DatasetKind::Evenly, &cfg).unwrap();
        let expected = dataset.reference_sum(&cfg.work_profile());
        assert!(!check(&cfg, &dataset, expected + 1).unwrap());
    }
}
