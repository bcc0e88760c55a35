use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::task::WorkProfile;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Experiment config ─────────────────────────────────────────

/// Parameters of a distribution experiment.
///
/// Parsed from TOML, then overridden by `CHUNKBENCH_*` environment
/// variables. Must pass [`ExperimentConfig::validate`] before it is handed
/// to a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of worker threads.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Tasks per chunk. Must be a multiple of `worker_count`.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of chunks in a generated dataset.
    #[serde(default = "default_chunk_count")]
    pub chunk_count: usize,

    /// Refinement steps for a light task.
    #[serde(default = "default_light_iterations")]
    pub light_iterations: usize,

    /// Refinement steps for a heavy task.
    #[serde(default = "default_heavy_iterations")]
    pub heavy_iterations: usize,

    /// Probability that a generated task is heavy, in `[0, 1]`.
    #[serde(default = "default_heavy_probability")]
    pub heavy_probability: f64,

    /// Seed for dataset generation.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_worker_count() -> usize {
    4
}

fn default_chunk_size() -> usize {
    8_000
}

fn default_chunk_count() -> usize {
    100
}

fn default_light_iterations() -> usize {
    100
}

fn default_heavy_iterations() -> usize {
    1_000
}

fn default_heavy_probability() -> f64 {
    0.15
}

fn default_seed() -> u64 {
    1
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            chunk_size: default_chunk_size(),
            chunk_count: default_chunk_count(),
            light_iterations: default_light_iterations(),
            heavy_iterations: default_heavy_iterations(),
            heavy_probability: default_heavy_probability(),
            seed: default_seed(),
        }
    }
}

impl ExperimentConfig {
    /// Parse config from a TOML string, apply env overrides and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, CoreError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults, or the TOML file at `path`, with env overrides applied.
    ///
    /// The result is not validated yet so that callers can layer further
    /// overrides (CLI flags) before calling [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus env overrides, validated.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Tasks handed to each worker per chunk under the static policy.
    pub fn subset_size(&self) -> usize {
        if self.worker_count == 0 {
            0
        } else {
            self.chunk_size / self.worker_count
        }
    }

    pub fn work_profile(&self) -> WorkProfile {
        WorkProfile::new(self.light_iterations, self.heavy_iterations)
    }

    // ── Environment variable overrides ────────────────────────

    /// Apply `CHUNKBENCH_*` environment variable overrides.
    ///
    /// - `CHUNKBENCH_WORKER_COUNT` -> `worker_count`
    /// - `CHUNKBENCH_CHUNK_SIZE` -> `chunk_size`
    /// - `CHUNKBENCH_CHUNK_COUNT` -> `chunk_count`
    /// - `CHUNKBENCH_LIGHT_ITERATIONS` -> `light_iterations`
    /// - `CHUNKBENCH_HEAVY_ITERATIONS` -> `heavy_iterations`
    /// - `CHUNKBENCH_HEAVY_PROBABILITY` -> `heavy_probability`
    /// - `CHUNKBENCH_SEED` -> `seed`
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_parsed(&lookup, "CHUNKBENCH_WORKER_COUNT", &mut self.worker_count);
        override_parsed(&lookup, "CHUNKBENCH_CHUNK_SIZE", &mut self.chunk_size);
        override_parsed(&lookup, "CHUNKBENCH_CHUNK_COUNT", &mut self.chunk_count);
        override_parsed(&lookup, "CHUNKBENCH_LIGHT_ITERATIONS", &mut self.light_iterations);
        override_parsed(&lookup, "CHUNKBENCH_HEAVY_ITERATIONS", &mut self.heavy_iterations);
        override_parsed(&lookup, "CHUNKBENCH_HEAVY_PROBABILITY", &mut self.heavy_probability);
        override_parsed(&lookup, "CHUNKBENCH_SEED", &mut self.seed);
    }

    // ── Validation ────────────────────────────────────────────

    /// Check the invariants every coordinator relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.worker_count == 0 {
            return Err(CoreError::Config("worker_count must be at least 1".into()));
        }
        if self.chunk_size < self.worker_count {
            return Err(CoreError::Config(format!(
                "chunk_size ({}) must be greater than or equal to worker_count ({})",
                self.chunk_size, self.worker_count
            )));
        }
        if self.chunk_size % self.worker_count != 0 {
            return Err(CoreError::Config(format!(
                "chunk_size ({}) must be a multiple of worker_count ({})",
                self.chunk_size, self.worker_count
            )));
        }
        if !(0.0..=1.0).contains(&self.heavy_probability) {
            return Err(CoreError::Config(format!(
                "heavy_probability ({}) must be within [0, 1]",
                self.heavy_probability
            )));
        }
        Ok(())
    }

    /// Print the resolved config for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Experiment config:");
        tracing::info!(
            "  workers:     {} (subset size {})",
            self.worker_count,
            self.subset_size()
        );
        tracing::info!(
            "  dataset:     {} chunks x {} tasks, seed={}",
            self.chunk_count,
            self.chunk_size,
            self.seed
        );
        tracing::info!(
            "  workload:    light={} heavy={} p(heavy)={}",
            self.light_iterations,
            self.heavy_iterations,
            self.heavy_probability
        );
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key).filter(|v| !v.is_empty()) else {
        return;
    };
    match raw.trim().parse() {
        Ok(v) => *target = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable override"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_reference_experiment() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.worker_count, 4);
        assert_eq!(cfg.chunk_size, 8_000);
        assert_eq!(cfg.chunk_count, 100);
        assert_eq!(cfg.subset_size(), 2_000);
        assert_eq!(cfg.work_profile(), WorkProfile::new(100, 1_000));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let cfg = ExperimentConfig::from_toml(
            r#"
worker_count = 8
chunk_size = 64
seed = 42
"#,
        )
        .unwrap();
        assert_eq!(cfg.worker_count, 8);
        assert_eq!(cfg.chunk_size, 64);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.chunk_count, 100);
        assert_eq!(cfg.heavy_probability, 0.15);
    }

    #[test]
    fn reject_chunk_size_not_multiple_of_workers() {
        let err = ExperimentConfig::from_toml("worker_count = 3\nchunk_size = 10\n").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains("multiple"), "got: {err}");
    }

    #[test]
    fn reject_chunk_smaller_than_worker_count() {
        let cfg = ExperimentConfig {
            worker_count: 8,
            chunk_size: 4,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("greater than"));
    }

    #[test]
    fn reject_zero_workers() {
        let cfg = ExperimentConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.subset_size(), 0);
    }

    #[test]
    fn reject_probability_out_of_range() {
        let err = ExperimentConfig::from_toml("heavy_probability = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("heavy_probability"));
    }

    #[test]
    fn reject_malformed_toml() {
        let err = ExperimentConfig::from_toml("worker_count = \"four\"\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }

    #[test]
    fn overrides_replace_parsed_values() {
        let vars: HashMap<&str, &str> = [
            ("CHUNKBENCH_WORKER_COUNT", "2"),
            ("CHUNKBENCH_CHUNK_SIZE", "16"),
            ("CHUNKBENCH_HEAVY_PROBABILITY", "0.5"),
            ("CHUNKBENCH_SEED", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut cfg = ExperimentConfig::default();
        cfg.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.worker_count, 2);
        assert_eq!(cfg.chunk_size, 16);
        assert_eq!(cfg.heavy_probability, 0.5);
        // unparsable values leave the previous setting in place
        assert_eq!(cfg.seed, 1);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_count = 3\nlight_iterations = 7").unwrap();

        let cfg = ExperimentConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.chunk_count, 3);
        assert_eq!(cfg.light_iterations, 7);
    }

    #[test]
    fn load_defers_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_count = 3").unwrap();

        // 8000 is not a multiple of 3, but load leaves that to the caller
        let mut cfg = ExperimentConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.worker_count, 3);
        assert!(cfg.validate().is_err());

        cfg.chunk_size = 9;
        assert!(cfg.validate().is_ok());
        assert_eq!(ExperimentConfig::load(None).unwrap().chunk_count, 100);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ExperimentConfig::from_file("/nonexistent/chunkbench.toml").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
