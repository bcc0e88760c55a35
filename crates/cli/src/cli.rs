use std::path::PathBuf;

use chunkbench_compute::Policy;
use chunkbench_core::DatasetKind;
use clap::Parser;

/// Compare static and dynamic chunk distribution over a skewed workload.
///
/// Generates a synthetic dataset of light and heavy tasks, runs it chunk by
/// chunk through a fixed set of worker threads and writes per-chunk busy,
/// idle and heavy-task figures as CSV.
#[derive(Parser, Debug)]
#[command(name = "chunkbench", about = "Static vs. dynamic work distribution benchmark")]
pub struct CliArgs {
    /// Stack heavy tasks at the front of every chunk
    #[arg(long, conflicts_with = "even")]
    pub stacked: bool,

    /// Spread heavy tasks evenly through every chunk
    #[arg(long)]
    pub even: bool,

    /// Use the shared work queue (dynamic policy) instead of static subsets
    #[arg(long)]
    pub queued: bool,

    /// Path to a TOML experiment config
    #[arg(long, env = "CHUNKBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Tasks per chunk (must be a multiple of the worker count)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Number of chunks to generate
    #[arg(long)]
    pub chunk_count: Option<usize>,

    /// Seed for dataset generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// CSV file for per-chunk timings
    #[arg(long, env = "CHUNKBENCH_OUTPUT", default_value = "timings.csv")]
    pub output: PathBuf,

    /// Skip writing the CSV file
    #[arg(long)]
    pub no_csv: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Recompute the aggregate through the worker pool and compare
    #[arg(long)]
    pub verify: bool,
}

impl CliArgs {
    pub fn dataset_kind(&self) -> DatasetKind {
        if self.stacked {
            DatasetKind::Stacked
        } else if self.even {
            DatasetKind::Evenly
        } else {
            DatasetKind::Random
        }
    }

    pub fn policy(&self) -> Policy {
        if self.queued {
            Policy::Dynamic
        } else {
            Policy::Static
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_random_static() {
        let args = CliArgs::try_parse_from(["chunkbench"]).unwrap();
        assert_eq!(args.dataset_kind(), DatasetKind::Random);
        assert_eq!(args.policy(), Policy::Static);
        assert!(!args.no_csv);
        assert!(args.workers.is_none());
    }

    #[test]
    fn flags_select_layout_and_policy() {
        let args = CliArgs::try_parse_from(["chunkbench", "--stacked", "--queued"]).unwrap();
        assert_eq!(args.dataset_kind(), DatasetKind::Stacked);
        assert_eq!(args.policy(), Policy::Dynamic);

        let args = CliArgs::try_parse_from(["chunkbench", "--even"]).unwrap();
        assert_eq!(args.dataset_kind(), DatasetKind::Evenly);
    }

    #[test]
    fn stacked_and_even_conflict() {
        assert!(CliArgs::try_parse_from(["chunkbench", "--stacked", "--even"]).is_err());
    }

    #[test]
    fn numeric_overrides_parse() {
        let args = CliArgs::try_parse_from([
            "chunkbench",
            "--workers",
            "8",
            "--chunk-size",
            "64",
            "--chunk-count",
            "3",
            "--seed",
            "99",
            "--no-csv",
        ])
        .unwrap();
        assert_eq!(args.workers, Some(8));
        assert_eq!(args.chunk_size, Some(64));
        assert_eq!(args.chunk_count, Some(3));
        assert_eq!(args.seed, Some(99));
        assert!(args.no_csv);
    }
}
