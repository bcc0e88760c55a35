use anyhow::{Context, Result};
use chunkbench_core::ExperimentConfig;
use tracing::debug;

use crate::cli::CliArgs;

/// Resolve the experiment config: defaults, then the TOML file, then
/// `CHUNKBENCH_*` env vars, then CLI flags. Validated last.
pub fn resolve(args: &CliArgs) -> Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            ExperimentConfig::load(Some(path.as_path()))
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => ExperimentConfig::load(None).context("failed to load config")?,
    };
    apply_cli_overrides(&mut config, args);
    config.validate().context("invalid experiment configuration")?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut ExperimentConfig, args: &CliArgs) {
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(chunk_count) = args.chunk_count {
        config.chunk_count = chunk_count;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
}
